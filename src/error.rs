use std::path::PathBuf;
use thiserror::Error;

/// Problems with the configuration file. Always fatal for a run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config JSON: {0}")]
    Parse(#[from] sonic_rs::Error),

    #[error("invalid target url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported url scheme {0:?}, expected http or https")]
    UnsupportedScheme(String),

    #[error("invalid HTTP method {0:?}")]
    InvalidMethod(String),

    #[error("invalid header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("request timeout must be greater than zero")]
    ZeroTimeout,
}

/// Errors that stop a run before or while it executes.
///
/// Individual request failures never show up here; they are reported as
/// failed outcomes by the worker that handled the job.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("worker task failed: {0}")]
    WorkerTask(#[from] tokio::task::JoinError),

    #[error("run ended with {completed} of {expected} jobs completed")]
    Incomplete { completed: u64, expected: u64 },
}
