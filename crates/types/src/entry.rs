use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One admitted request inside a sliding window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowEntry {
    pub timestamp_ms: i64,
    pub nonce: String,
}

impl WindowEntry {
    pub fn at(timestamp_ms: i64) -> Self {
        Self {
            timestamp_ms,
            nonce: Uuid::new_v4().simple().to_string(),
        }
    }

    /// Member encoding used inside ordered sets; the nonce keeps same-millisecond
    /// entries distinct.
    pub fn member(&self) -> String {
        format!("{}-{}", self.timestamp_ms, self.nonce)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEntry {
    pub scope_key: String,
    pub reason: String,
    /// Unix seconds.
    pub expires_at: i64,
}

impl BlockEntry {
    pub fn retry_after(&self, now_ms: i64) -> u64 {
        let now_secs = now_ms.div_euclid(1000);
        (self.expires_at - now_secs).max(1) as u64
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at * 1000 <= now_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_millisecond_entries_have_distinct_members() {
        let a = WindowEntry::at(1_000);
        let b = WindowEntry::at(1_000);
        assert_ne!(a.member(), b.member());
    }

    #[test]
    fn retry_after_is_at_least_one_second() {
        let entry = BlockEntry {
            scope_key: "ip:1.2.3.4".into(),
            reason: "ip_rate_limit_exceeded".into(),
            expires_at: 100,
        };
        assert_eq!(entry.retry_after(90_000), 10);
        assert_eq!(entry.retry_after(99_900), 1);
        assert!(entry.is_expired(100_000));
        assert!(!entry.is_expired(99_999));
    }
}
