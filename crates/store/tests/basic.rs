use async_trait::async_trait;
use gateguard_store::prelude::*;
use std::sync::Arc;
use std::time::Duration;

struct StalledStore;

#[async_trait]
impl WindowStore for StalledStore {
    async fn admit(&self, _key: &str, _req: AdmitRequest) -> Result<AdmitOutcome, StoreError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(AdmitOutcome {
            admitted: true,
            count: 1,
            oldest_ms: None,
        })
    }

    async fn count(&self, _: &str, _: i64, _: i64) -> Result<u64, StoreError> {
        Ok(0)
    }

    async fn purge_expired(&self, _: &str, _: i64) -> Result<u64, StoreError> {
        Ok(0)
    }

    async fn set_ttl(&self, _: &str, _: &str, _: Duration) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get_ttl(&self, _: &str) -> Result<Option<TtlValue>, StoreError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(None)
    }

    async fn push_capped(&self, _: &str, _: &str, _: usize) -> Result<(), StoreError> {
        Ok(())
    }

    async fn list_recent(&self, _: &str, _: usize) -> Result<Vec<String>, StoreError> {
        Ok(Vec::new())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

fn admit_req(now_ms: i64, member: String, limit: u64) -> AdmitRequest {
    AdmitRequest {
        now_ms,
        window_ms: 10_000,
        limit,
        member,
        expire_ms: 11_000,
    }
}

#[tokio::test]
async fn bounded_store_times_out_slow_round_trips() {
    let store = BoundedStore::new(Arc::new(StalledStore), Duration::from_millis(20));
    let err = store
        .admit("rl:ip:1", admit_req(0, "a".into(), 5))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(err.op(), "admit");

    let err = store.get_ttl("block:ip:1").await.unwrap_err();
    assert_eq!(err.op(), "get_ttl");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_admits_never_exceed_limit() {
    let store: StoreHandle = Arc::new(MemoryStore::new());
    let limit = 10;
    let mut tasks = Vec::new();
    for i in 0..40 {
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move {
            store
                .admit("rl:global:all", admit_req(1_000, format!("m{i}"), limit))
                .await
                .unwrap()
                .admitted
        }));
    }
    let admitted = futures::future::join_all(tasks)
        .await
        .into_iter()
        .filter(|res| *res.as_ref().unwrap())
        .count();
    assert_eq!(admitted as u64, limit);
}

#[tokio::test]
async fn connect_builds_bounded_memory_store() {
    let store = gateguard_store::connect(&StoreConfig::memory()).await.unwrap();
    store.ping().await.unwrap();
    store
        .set_ttl("k", "v", Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(store.get_ttl("k").await.unwrap().unwrap().value, "v");
}
