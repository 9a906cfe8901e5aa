// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Ten concurrent requests for the same uncached article trigger exactly one
//! analysis; the other nine wait and share the result.

use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};
use std::time::Duration;

use credence::{Cache, MemoryTier};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cache: Arc<Cache<String>> = Arc::new(Cache::builder("analysis").tier(MemoryTier::new()).build());
    let analyses = Arc::new(AtomicU32::new(0));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let cache = Arc::clone(&cache);
        let analyses = Arc::clone(&analyses);
        handles.push(tokio::spawn(async move {
            cache
                .get_or_compute("https://news.example/contested", || async {
                    analyses.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Ok::<_, std::io::Error>("mostly reliable".to_string())
                })
                .await
        }));
    }

    for handle in handles {
        let looked_up = handle.await??;
        assert_eq!(looked_up.value, "mostly reliable");
    }

    println!("10 concurrent requests, {} analysis call(s)", analyses.load(Ordering::SeqCst));
    Ok(())
}
