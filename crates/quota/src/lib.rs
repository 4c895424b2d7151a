pub mod blocklist;
pub mod errors;
pub mod limiter;
pub mod policy;

pub use blocklist::BlockList;
pub use errors::QuotaError;
pub use limiter::{LimitStatus, SlidingWindowLimiter};
pub use policy::FailPolicy;

pub(crate) fn ceil_secs(ms: i64) -> i64 {
    ms.div_euclid(1000) + i64::from(ms.rem_euclid(1000) != 0)
}
