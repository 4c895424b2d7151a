//! Shared primitives for the gateguard crates.

pub mod clock;
pub mod decision;
pub mod entry;
pub mod filter;
pub mod scope;

pub use clock::{Clock, ClockHandle, ManualClock, SystemClock};
pub use decision::{Action, InterceptionDecision};
pub use entry::{BlockEntry, WindowEntry};
pub use filter::{Finding, FilterCategory, Severity, Sensitivity};
pub use scope::{RateLimitScope, ScopeKind};
