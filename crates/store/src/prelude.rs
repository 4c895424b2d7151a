pub use crate::bounded::BoundedStore;
pub use crate::config::{StoreBackend, StoreConfig};
pub use crate::errors::StoreError;
pub use crate::key::StoreKeys;
pub use crate::r#trait::{AdmitOutcome, AdmitRequest, StoreHandle, TtlValue, WindowStore};
pub use crate::MemoryStore;
#[cfg(feature = "redis")]
pub use crate::RedisStore;
