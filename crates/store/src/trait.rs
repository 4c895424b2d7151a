use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::StoreError;

/// One sliding-window admission attempt.
#[derive(Clone, Debug)]
pub struct AdmitRequest {
    pub now_ms: i64,
    pub window_ms: i64,
    pub limit: u64,
    /// Unique ordered-set member for the entry that would be inserted.
    pub member: String,
    /// Expiry applied to the whole set after an insert.
    pub expire_ms: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdmitOutcome {
    pub admitted: bool,
    /// Live entries after the operation.
    pub count: u64,
    pub oldest_ms: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TtlValue {
    pub value: String,
    pub ttl_ms: i64,
}

/// The store primitives the quota layer relies on. `admit` must run as a single
/// atomic unit: purge, count, conditional insert and expiry happen together or
/// not at all.
#[async_trait]
pub trait WindowStore: Send + Sync {
    async fn admit(&self, key: &str, req: AdmitRequest) -> Result<AdmitOutcome, StoreError>;

    async fn count(&self, key: &str, now_ms: i64, window_ms: i64) -> Result<u64, StoreError>;

    /// Removes entries with a timestamp at or below `cutoff_ms`.
    async fn purge_expired(&self, key: &str, cutoff_ms: i64) -> Result<u64, StoreError>;

    async fn set_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    async fn get_ttl(&self, key: &str) -> Result<Option<TtlValue>, StoreError>;

    /// Prepends to a list and trims it to `max_len` items.
    async fn push_capped(&self, key: &str, value: &str, max_len: usize) -> Result<(), StoreError>;

    async fn list_recent(&self, key: &str, limit: usize) -> Result<Vec<String>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

pub type StoreHandle = Arc<dyn WindowStore>;
