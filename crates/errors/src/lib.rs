//! Stable error codes shared by every gateguard crate. Each crate wraps
//! [`ErrorObj`] in its own newtype error.

pub mod class;
pub mod code;
pub mod model;
pub mod prelude;
pub mod render;

pub use code::{codes, ErrorCode};
pub use model::{ErrorBuilder, ErrorObj};
