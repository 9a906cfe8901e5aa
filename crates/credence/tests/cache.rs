// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for the multi-tier get-or-compute engine.

use std::fmt;
use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};
use std::time::Duration;

use credence::{Cache, ComputeError, LookupSource, TtlPolicy};
use credence_tier::{
    CacheEntry, CacheKey, KeyDeriver, TierStore,
    testing::{MockTier, TierOp},
};

#[derive(Debug, PartialEq)]
struct AnalyzerDown;

impl fmt::Display for AnalyzerDown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("analyzer down")
    }
}

impl std::error::Error for AnalyzerDown {}

const URL: &str = "https://a.example/1";

/// The key the "analysis" cache derives for [`URL`], for direct tier checks.
fn derived(url: &str) -> CacheKey {
    KeyDeriver::new("analysis").derive(url)
}

struct Chain {
    memory: MockTier<String>,
    redis: MockTier<String>,
    sqlite: MockTier<String>,
}

impl Chain {
    fn new() -> Self {
        Self {
            memory: MockTier::named("memory"),
            redis: MockTier::named("redis"),
            sqlite: MockTier::named("sqlite"),
        }
    }

    fn cache(&self) -> Cache<String> {
        self.cache_with_policy(TtlPolicy::uniform(Duration::from_secs(60)))
    }

    fn cache_with_policy(&self, policy: TtlPolicy) -> Cache<String> {
        Cache::builder("analysis")
            .tier(self.memory.clone())
            .tier(self.redis.clone())
            .tier(self.sqlite.clone())
            .ttl_policy(policy)
            .build()
    }

    fn set_count(&self) -> usize {
        [&self.memory, &self.redis, &self.sqlite]
            .iter()
            .flat_map(|tier| tier.operations())
            .filter(|op| matches!(op, TierOp::Set { .. }))
            .count()
    }
}

async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}

#[tokio::test]
async fn full_miss_computes_once_and_writes_every_tier() {
    let chain = Chain::new();
    let cache = chain.cache();
    let calls = AtomicU32::new(0);

    let looked_up = cache
        .get_or_compute(URL, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, AnalyzerDown>("verdict".to_string())
        })
        .await
        .expect("computation succeeds");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!looked_up.is_cached());
    assert_eq!(looked_up.source, LookupSource::Computed);
    assert_eq!(looked_up.value, "verdict");

    let key = derived(URL);
    assert!(chain.memory.contains_key(&key));
    assert!(chain.redis.contains_key(&key));
    assert!(chain.sqlite.contains_key(&key));
}

#[tokio::test]
async fn second_call_is_served_from_the_fastest_tier() {
    let chain = Chain::new();
    let cache = chain.cache();

    cache
        .get_or_compute(URL, || async { Ok::<_, AnalyzerDown>("verdict".to_string()) })
        .await
        .expect("computation succeeds");

    let looked_up = cache
        .get_or_compute(URL, || async {
            Ok::<String, AnalyzerDown>(unreachable!("a warm cache must not recompute"))
        })
        .await
        .expect("served from cache");

    assert!(looked_up.is_cached());
    assert_eq!(looked_up.source, LookupSource::Tier("memory"));
    assert_eq!(looked_up.value, "verdict");
}

#[tokio::test]
async fn slower_tier_hit_back_fills_the_faster_tiers() {
    let chain = Chain::new();
    let cache = chain.cache();

    cache
        .get_or_compute(URL, || async { Ok::<_, AnalyzerDown>("verdict".to_string()) })
        .await
        .expect("computation succeeds");

    // Simulate a fresh process: the fast tier is cold, the shared one warm.
    chain.memory.clear().await.expect("clear mock");
    let key = derived(URL);
    assert!(!chain.memory.contains_key(&key));

    let calls = AtomicU32::new(0);
    let looked_up = cache
        .get_or_compute(URL, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, AnalyzerDown>("never".to_string())
        })
        .await
        .expect("served from cache");

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(looked_up.source, LookupSource::Tier("redis"));
    assert_eq!(looked_up.value, "verdict");

    // Back-fill is fire-and-forget; the fast tier warms shortly after.
    wait_until("memory back-fill", || chain.memory.contains_key(&key)).await;
    let warmed = chain.memory.stored(&key).expect("back-filled entry");
    assert_eq!(*warmed.value(), "verdict");
}

#[tokio::test]
async fn faster_tier_wins_when_payloads_diverge() {
    let chain = Chain::new();
    let key = derived(URL);

    chain
        .memory
        .set(&key, CacheEntry::with_ttl("fast copy".to_string(), Duration::from_secs(60)))
        .await
        .expect("seed memory");
    chain
        .sqlite
        .set(&key, CacheEntry::with_ttl("durable copy".to_string(), Duration::from_secs(60)))
        .await
        .expect("seed sqlite");

    let cache = chain.cache();
    let looked_up = cache
        .get_or_compute(URL, || async { Ok::<_, AnalyzerDown>("never".to_string()) })
        .await
        .expect("served from cache");

    assert_eq!(looked_up.value, "fast copy");
    assert_eq!(looked_up.source, LookupSource::Tier("memory"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_misses_share_one_computation() {
    let chain = Chain::new();
    let cache = Arc::new(chain.cache());
    let calls = Arc::new(AtomicU32::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = Arc::clone(&cache);
        let calls = Arc::clone(&calls);
        handles.push(tokio::spawn(async move {
            cache
                .get_or_compute(URL, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok::<_, AnalyzerDown>("verdict".to_string())
                })
                .await
        }));
    }

    for handle in handles {
        let looked_up = handle.await.expect("task").expect("computation succeeds");
        assert_eq!(looked_up.value, "verdict");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn a_failing_tier_is_invisible_to_the_caller() {
    let chain = Chain::new();
    chain.redis.fail_when(|_| true);
    let cache = chain.cache();

    let looked_up = cache
        .get_or_compute(URL, || async { Ok::<_, AnalyzerDown>("verdict".to_string()) })
        .await
        .expect("the broken tier must not surface");
    assert_eq!(looked_up.value, "verdict");

    // The healthy tiers still took the write; the broken one did not.
    let key = derived(URL);
    assert!(chain.memory.contains_key(&key));
    assert!(!chain.redis.contains_key(&key));
    assert!(chain.sqlite.contains_key(&key));

    // And the value is served from cache afterwards.
    let again = cache
        .get_or_compute(URL, || async { Ok::<_, AnalyzerDown>("never".to_string()) })
        .await
        .expect("cached");
    assert_eq!(again.source, LookupSource::Tier("memory"));
}

#[tokio::test]
async fn computation_failure_propagates_and_writes_nothing() {
    let chain = Chain::new();
    let cache = chain.cache();
    let calls = AtomicU32::new(0);

    let error = cache
        .get_or_compute(URL, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<String, _>(AnalyzerDown)
        })
        .await
        .expect_err("the computation failure must surface");

    assert_eq!(error.downcast_ref::<AnalyzerDown>(), Some(&AnalyzerDown));
    assert_eq!(error.to_string(), "analyzer down");
    assert_eq!(chain.set_count(), 0, "a failed computation must not be cached");

    // Failures are not remembered: the next call retries.
    let looked_up = cache
        .get_or_compute(URL, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, AnalyzerDown>("recovered".to_string())
        })
        .await
        .expect("retry succeeds");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(looked_up.value, "recovered");
}

#[tokio::test]
async fn expired_entries_are_recomputed() {
    let chain = Chain::new();
    let cache = chain.cache_with_policy(TtlPolicy::uniform(Duration::from_millis(40)));
    let calls = AtomicU32::new(0);

    let compute = || {
        calls.fetch_add(1, Ordering::SeqCst);
        format!("verdict {}", calls.load(Ordering::SeqCst))
    };

    let first = cache
        .get_or_compute(URL, || async { Ok::<_, AnalyzerDown>(compute()) })
        .await
        .expect("computation succeeds");
    assert_eq!(first.value, "verdict 1");

    tokio::time::sleep(Duration::from_millis(100)).await;

    let second = cache
        .get_or_compute(URL, || async { Ok::<_, AnalyzerDown>(compute()) })
        .await
        .expect("computation succeeds");
    assert_eq!(second.value, "verdict 2", "an expired entry must not be served");
    assert_eq!(second.source, LookupSource::Computed);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unavailable_tiers_are_skipped_entirely() {
    let chain = Chain::new();
    chain.memory.set_available(false);
    chain.redis.set_available(false);
    chain.sqlite.set_available(false);
    let cache = chain.cache();

    let looked_up = cache
        .get_or_compute(URL, || async { Ok::<_, AnalyzerDown>("verdict".to_string()) })
        .await
        .expect("behaves as a full miss");

    assert_eq!(looked_up.source, LookupSource::Computed);
    // No probes, no writes: the chain never touched the dead tiers.
    assert!(chain.memory.operations().is_empty());
    assert!(chain.redis.operations().is_empty());
    assert!(chain.sqlite.operations().is_empty());
}

#[tokio::test]
async fn each_tier_is_written_with_its_own_ttl() {
    let chain = Chain::new();
    let policy = TtlPolicy::uniform(Duration::from_secs(24 * 60 * 60)).with_tier("memory", Duration::from_secs(60 * 60));
    let cache = chain.cache_with_policy(policy);

    cache
        .get_or_compute(URL, || async { Ok::<_, AnalyzerDown>("verdict".to_string()) })
        .await
        .expect("computation succeeds");

    let key = derived(URL);
    let memory_expiry = chain.memory.stored(&key).expect("entry").expires_at().expect("ttl");
    let sqlite_expiry = chain.sqlite.stored(&key).expect("entry").expires_at().expect("ttl");
    assert!(
        memory_expiry < sqlite_expiry,
        "the fast tier must expire before the durable one"
    );
}

#[tokio::test]
async fn get_never_computes() {
    let chain = Chain::new();
    let cache = chain.cache();

    assert!(cache.get(URL).await.is_none());

    cache
        .get_or_compute(URL, || async { Ok::<_, AnalyzerDown>("verdict".to_string()) })
        .await
        .expect("computation succeeds");

    let looked_up = cache.get(URL).await.expect("warm entry");
    assert_eq!(looked_up.source, LookupSource::Tier("memory"));
}

#[tokio::test]
async fn invalidate_removes_the_key_from_every_tier() {
    let chain = Chain::new();
    let cache = chain.cache();

    cache
        .get_or_compute(URL, || async { Ok::<_, AnalyzerDown>("verdict".to_string()) })
        .await
        .expect("computation succeeds");

    cache.invalidate(URL).await;

    let key = derived(URL);
    assert!(!chain.memory.contains_key(&key));
    assert!(!chain.redis.contains_key(&key));
    assert!(!chain.sqlite.contains_key(&key));

    let calls = AtomicU32::new(0);
    cache
        .get_or_compute(URL, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, AnalyzerDown>("fresh".to_string())
        })
        .await
        .expect("computation succeeds");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stats_track_hits_misses_and_sizes() {
    let chain = Chain::new();
    let cache = chain.cache();

    cache
        .get_or_compute(URL, || async { Ok::<_, AnalyzerDown>("verdict".to_string()) })
        .await
        .expect("computation succeeds");
    cache
        .get_or_compute(URL, || async { Ok::<_, AnalyzerDown>("never".to_string()) })
        .await
        .expect("cached");

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hit_rate, 50.0);
    // One entry, reported by all three mock tiers.
    assert_eq!(stats.total_keys, 3);
    assert_eq!(stats.memory_usage, "0 MB");

    let memory = stats.tiers.iter().find(|tier| tier.name == "memory").expect("memory stats");
    assert_eq!(memory.hits, 1);
    assert_eq!(memory.misses, 1);
    assert_eq!(memory.sets, 1);
}

#[tokio::test]
async fn distinct_logical_caches_do_not_collide() {
    let shared = MockTier::<String>::named("redis");

    let analysis = Cache::builder("analysis").tier(shared.clone()).build();
    let challenge = Cache::builder("challenge").tier(shared.clone()).build();

    analysis
        .get_or_compute(URL, || async { Ok::<_, AnalyzerDown>("analysis payload".to_string()) })
        .await
        .expect("computation succeeds");

    // Same natural key, same physical backend, different logical cache.
    let calls = AtomicU32::new(0);
    let looked_up = challenge
        .get_or_compute(URL, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, AnalyzerDown>("challenge payload".to_string())
        })
        .await
        .expect("computation succeeds");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(looked_up.value, "challenge payload");
    assert_eq!(shared.entry_count(), 2);
}

#[tokio::test]
async fn real_tiers_warm_each_other_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    use credence_memory::MemoryTier;
    use credence_sqlite::SqliteTier;

    let memory = MemoryTier::<String>::new();
    let sqlite = SqliteTier::<String>::open_in_memory()?;

    let cache = Cache::builder("analysis")
        .tier(memory.clone())
        .tier(sqlite.clone())
        .ttl_policy(TtlPolicy::uniform(Duration::from_secs(60)))
        .build();

    cache
        .get_or_compute(URL, || async { Ok::<_, AnalyzerDown>("verdict".to_string()) })
        .await?;

    // Cold memory, warm durable store, as after a restart.
    memory.clear().await?;

    let looked_up = cache
        .get_or_compute(URL, || async { Ok::<_, AnalyzerDown>("never".to_string()) })
        .await?;
    assert_eq!(looked_up.source, LookupSource::Tier("sqlite"));
    assert_eq!(looked_up.value, "verdict");

    let key = derived(URL);
    wait_until("memory back-fill", || {
        futures::executor::block_on(memory.get(&key)).ok().flatten().is_some()
    })
    .await;
    Ok(())
}

#[test]
fn compute_error_is_a_std_error() {
    fn assert_error<E: std::error::Error + Send + Sync + 'static>() {}
    assert_error::<ComputeError>();
}
