pub mod audit;
pub mod chain;
pub mod context;
pub mod errors;
pub mod metrics;
pub mod prelude;
pub mod request;
pub mod settings;
pub mod stages;

pub use chain::{BeforeOutcome, ChainBuilder, ChainResponse, Downstream, InterceptorChain};
pub use stages::{ResponseStage, Stage, StageOutcome};
