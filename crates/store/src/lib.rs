pub mod backend;
pub mod bounded;
pub mod config;
pub mod errors;
pub mod key;
pub mod prelude;
pub mod r#trait;

pub use backend::memory::MemoryStore;
#[cfg(feature = "redis")]
pub use backend::redis::RedisStore;
pub use bounded::BoundedStore;
pub use config::{StoreBackend, StoreConfig};
pub use errors::StoreError;
pub use key::StoreKeys;
pub use r#trait::{AdmitOutcome, AdmitRequest, StoreHandle, TtlValue, WindowStore};

/// Builds the configured backend and wraps it in the round-trip timeout. An
/// unreachable Redis is logged, not returned: only a malformed URL fails here.
pub async fn connect(config: &StoreConfig) -> Result<StoreHandle, StoreError> {
    let inner: StoreHandle = match config.backend {
        StoreBackend::Memory => {
            tracing::warn!(
                target: "rate-limiter",
                "using in-process memory store; limits are not shared across instances"
            );
            std::sync::Arc::new(MemoryStore::new())
        }
        #[cfg(feature = "redis")]
        StoreBackend::Redis => std::sync::Arc::new(RedisStore::open(config)?),
        #[cfg(not(feature = "redis"))]
        StoreBackend::Redis => {
            return Err(StoreError::unavailable(
                "connect",
                "redis support not compiled in",
            ))
        }
    };
    let store: StoreHandle = std::sync::Arc::new(BoundedStore::new(inner, config.timeout));
    if let Err(err) = store.ping().await {
        tracing::warn!(
            target: "rate-limiter",
            op = err.op(),
            %err,
            "store unreachable at startup; fail policy applies until it recovers"
        );
    }
    Ok(store)
}
