pub use crate::{
    class::{ErrorKind, ErrorSeverity, RetryClass},
    code::{all_specs, codes, spec_of, CodeSpec, ErrorCode},
    model::{ErrorBuilder, ErrorObj},
    render::PublicErrorView,
};
