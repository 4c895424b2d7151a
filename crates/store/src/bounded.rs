use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use crate::errors::StoreError;
use crate::r#trait::{AdmitOutcome, AdmitRequest, StoreHandle, TtlValue, WindowStore};

/// Puts a hard ceiling on every store round trip.
pub struct BoundedStore {
    inner: StoreHandle,
    limit: Duration,
}

impl BoundedStore {
    pub fn new(inner: StoreHandle, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<T, F>(&self, op: &str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>> + Send,
    {
        match timeout(self.limit, fut).await {
            Ok(res) => res,
            Err(_) => Err(StoreError::timeout(op, self.limit.as_millis())),
        }
    }
}

#[async_trait]
impl WindowStore for BoundedStore {
    async fn admit(&self, key: &str, req: AdmitRequest) -> Result<AdmitOutcome, StoreError> {
        self.bounded("admit", self.inner.admit(key, req)).await
    }

    async fn count(&self, key: &str, now_ms: i64, window_ms: i64) -> Result<u64, StoreError> {
        self.bounded("count", self.inner.count(key, now_ms, window_ms))
            .await
    }

    async fn purge_expired(&self, key: &str, cutoff_ms: i64) -> Result<u64, StoreError> {
        self.bounded("purge_expired", self.inner.purge_expired(key, cutoff_ms))
            .await
    }

    async fn set_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.bounded("set_ttl", self.inner.set_ttl(key, value, ttl))
            .await
    }

    async fn get_ttl(&self, key: &str) -> Result<Option<TtlValue>, StoreError> {
        self.bounded("get_ttl", self.inner.get_ttl(key)).await
    }

    async fn push_capped(&self, key: &str, value: &str, max_len: usize) -> Result<(), StoreError> {
        self.bounded("push_capped", self.inner.push_capped(key, value, max_len))
            .await
    }

    async fn list_recent(&self, key: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        self.bounded("list_recent", self.inner.list_recent(key, limit))
            .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.bounded("ping", self.inner.ping()).await
    }
}
