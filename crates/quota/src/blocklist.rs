use std::time::Duration;

use gateguard_store::{StoreHandle, StoreKeys};
use gateguard_types::{BlockEntry, ClockHandle};
use tracing::{info, warn};

use crate::errors::QuotaError;
use crate::policy::FailPolicy;

pub const STORE_UNAVAILABLE_REASON: &str = "store_unavailable";

/// Short-lived deny records keyed by scope. Entries disappear through store
/// TTL only; there is no explicit unblock.
#[derive(Clone)]
pub struct BlockList {
    store: StoreHandle,
    clock: ClockHandle,
    fail_policy: FailPolicy,
}

impl BlockList {
    pub fn new(store: StoreHandle, clock: ClockHandle) -> Self {
        Self {
            store,
            clock,
            fail_policy: FailPolicy::default(),
        }
    }

    pub fn with_fail_policy(mut self, policy: FailPolicy) -> Self {
        self.fail_policy = policy;
        self
    }

    pub async fn is_blocked(&self, scope_key: &str) -> Result<Option<BlockEntry>, QuotaError> {
        let now = self.clock.now_ms();
        let raw = match self.store.get_ttl(&StoreKeys::block(scope_key)).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(
                    target: "rate-limiter",
                    scope = scope_key,
                    op = err.op(),
                    policy = %self.fail_policy,
                    "block lookup failed; applying fail policy"
                );
                return Ok(match self.fail_policy {
                    FailPolicy::Open => None,
                    FailPolicy::Closed => Some(BlockEntry {
                        scope_key: scope_key.to_string(),
                        reason: STORE_UNAVAILABLE_REASON.to_string(),
                        expires_at: now.div_euclid(1000) + 1,
                    }),
                });
            }
        };

        let Some(raw) = raw else {
            return Ok(None);
        };
        let entry = match serde_json::from_str::<BlockEntry>(&raw.value) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(target: "rate-limiter", scope = scope_key, %err, "unreadable block record");
                BlockEntry {
                    scope_key: scope_key.to_string(),
                    reason: "blocked".to_string(),
                    expires_at: crate::ceil_secs(now + raw.ttl_ms.max(1000)),
                }
            }
        };
        if entry.is_expired(now) {
            return Ok(None);
        }
        Ok(Some(entry))
    }

    pub async fn block(
        &self,
        scope_key: &str,
        reason: &str,
        duration: Duration,
    ) -> Result<(), QuotaError> {
        if duration.is_zero() {
            return Ok(());
        }
        let now = self.clock.now_ms();
        let entry = BlockEntry {
            scope_key: scope_key.to_string(),
            reason: reason.to_string(),
            expires_at: crate::ceil_secs(now + duration.as_millis() as i64),
        };
        let payload = serde_json::to_string(&entry)
            .map_err(|err| QuotaError::config(format!("block entry encode: {err}")))?;
        self.store
            .set_ttl(&StoreKeys::block(scope_key), &payload, duration)
            .await?;
        info!(
            target: "rate-limiter",
            scope = scope_key,
            reason,
            duration_secs = duration.as_secs(),
            "scope blocked"
        );
        Ok(())
    }
}
