// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A memory + SQLite chain: the durable tier survives a process restart and
//! warms the memory tier back up on the first hit.

use std::time::Duration;

use credence::{Cache, MemoryTier, SqliteTier, TtlPolicy};

fn build_cache(path: &std::path::Path) -> Result<Cache<String>, Box<dyn std::error::Error>> {
    let cache = Cache::builder("analysis")
        .tier(MemoryTier::builder().max_capacity(10_000).weigher(String::len).build())
        .tier(SqliteTier::open(path)?)
        .ttl_policy(
            TtlPolicy::uniform(Duration::from_secs(24 * 60 * 60)).with_tier("memory", Duration::from_secs(60 * 60)),
        )
        .build();
    Ok(cache)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let dir = std::env::temp_dir().join("credence-multi-tier");
    std::fs::create_dir_all(&dir)?;
    let db = dir.join("analysis.db");

    let url = "https://news.example/article/42";

    {
        let cache = build_cache(&db)?;
        let first = cache
            .get_or_compute(url, || async { Ok::<_, std::io::Error>("mostly reliable".to_string()) })
            .await?;
        println!("first process:  source = {:?}", first.source);
    }

    // A "restarted" process has a cold memory tier but a warm durable one.
    {
        let cache = build_cache(&db)?;
        let looked_up = cache
            .get_or_compute(url, || async { Ok::<_, std::io::Error>("never computed".to_string()) })
            .await?;
        println!("second process: source = {:?}", looked_up.source);
        assert_eq!(looked_up.value, "mostly reliable");

        // Give the fire-and-forget back-fill a moment, then hit memory.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let warmed = cache.get(url).await.expect("warmed entry");
        println!("after back-fill: source = {:?}", warmed.source);
    }

    std::fs::remove_file(&db).ok();
    Ok(())
}
