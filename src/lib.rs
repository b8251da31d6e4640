//! Concurrent HTTP load generator.
//!
//! A run fires a fixed number of identical requests at one endpoint through a
//! pool of workers fed from a shared job queue, retries failed attempts and
//! reports the total and average time per request.

pub mod config;
pub mod error;
pub mod logging;
pub mod report;
pub mod retry;
pub mod runner;
pub mod worker;

pub use config::{FileConfig, RunConfig};
pub use error::{ConfigError, LoadError};
pub use report::{Reporter, RequestOutcome, RunSummary, TracingReporter};
pub use retry::RetryPolicy;
pub use runner::run_load;
