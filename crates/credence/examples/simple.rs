// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A single-tier cache fronting a slow analysis call.

use std::time::Duration;

use credence::{Cache, MemoryTier, TtlPolicy};

async fn analyze(url: &str) -> Result<String, std::io::Error> {
    // Stands in for the expensive AI analysis call.
    tokio::time::sleep(Duration::from_millis(200)).await;
    Ok(format!("analysis of {url}: mostly reliable"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let cache: Cache<String> = Cache::builder("analysis")
        .tier(MemoryTier::new())
        .ttl_policy(TtlPolicy::uniform(Duration::from_secs(24 * 60 * 60)))
        .build();

    let url = "https://news.example/article/42";

    let first = cache.get_or_compute(url, || analyze(url)).await?;
    println!("first lookup  (cached: {}): {}", first.is_cached(), first.value);

    let second = cache.get_or_compute(url, || analyze(url)).await?;
    println!("second lookup (cached: {}): {}", second.is_cached(), second.value);

    println!("{:#?}", cache.stats());
    Ok(())
}
