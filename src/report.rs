use reqwest::StatusCode;
use std::fmt;
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, error, info, warn};

// =============================================================================
// Outcomes
// =============================================================================

/// What happened to one job after all of its attempts.
#[derive(Debug, Clone)]
pub enum RequestOutcome {
    /// The last attempt got a response. The status may still be a failure
    /// when retries ran out.
    Response {
        status: StatusCode,
        elapsed: Duration,
        attempts: u32,
        body: String,
    },
    /// Every attempt ended in a transport error; this is the last one.
    Failed {
        error: String,
        elapsed: Duration,
        attempts: u32,
    },
}

impl RequestOutcome {
    /// Only a 200 counts as success, matching the retry predicate.
    pub fn is_success(&self) -> bool {
        matches!(self, RequestOutcome::Response { status, .. } if *status == StatusCode::OK)
    }

    pub fn attempts(&self) -> u32 {
        match self {
            RequestOutcome::Response { attempts, .. } | RequestOutcome::Failed { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            RequestOutcome::Response { elapsed, .. } | RequestOutcome::Failed { elapsed, .. } => {
                *elapsed
            }
        }
    }
}

// =============================================================================
// Summary
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub total_requests: u64,
    pub completed: u64,
    pub failed: u64,
    pub elapsed: Duration,
    pub average: Duration,
}

impl RunSummary {
    /// Summary of a run that dispatched nothing.
    pub fn empty() -> Self {
        Self {
            total_requests: 0,
            completed: 0,
            failed: 0,
            elapsed: Duration::ZERO,
            average: Duration::ZERO,
        }
    }

    pub fn new(total_requests: u64, completed: u64, failed: u64, elapsed: Duration) -> Self {
        Self {
            total_requests,
            completed,
            failed,
            elapsed,
            average: average_per_request(elapsed, total_requests),
        }
    }
}

/// `elapsed / requests`, zero when there were no requests.
pub fn average_per_request(elapsed: Duration, requests: u64) -> Duration {
    if requests == 0 {
        return Duration::ZERO;
    }
    let nanos = elapsed.as_nanos() / u128::from(requests);
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Total time: {:?} Avg: {:?}", self.elapsed, self.average)
    }
}

// =============================================================================
// Reporter
// =============================================================================

/// Receives every job outcome as it happens and the summary once at the end.
///
/// Called concurrently from all workers, so implementations must not assume
/// any ordering between outcomes.
pub trait Reporter: Send + Sync {
    fn outcome(&self, worker: usize, job: u64, outcome: &RequestOutcome);

    fn summary(&self, summary: &RunSummary);
}

/// Writes outcomes to the current tracing subscriber and the summary line to
/// stdout. The summary line is written once; the log only gets the counts.
pub struct TracingReporter {
    summary_out: Mutex<Box<dyn Write + Send>>,
}

impl TracingReporter {
    pub fn stdout() -> Self {
        Self::with_writer(io::stdout())
    }

    pub fn with_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            summary_out: Mutex::new(Box::new(writer)),
        }
    }
}

impl Reporter for TracingReporter {
    fn outcome(&self, worker: usize, job: u64, outcome: &RequestOutcome) {
        match outcome {
            RequestOutcome::Response {
                status,
                elapsed,
                attempts,
                body,
            } => {
                if outcome.is_success() {
                    info!(
                        "Worker {} finished job {}: {} in {:?} ({} attempts)",
                        worker, job, status, elapsed, attempts
                    );
                } else {
                    warn!(
                        "Worker {} finished job {}: {} in {:?} after {} attempts",
                        worker, job, status, elapsed, attempts
                    );
                }
                debug!("Worker {} job {} body: {}", worker, job, body);
            }
            RequestOutcome::Failed {
                error,
                elapsed,
                attempts,
            } => {
                error!(
                    "Worker {} failed job {} after {} attempts in {:?}: {}",
                    worker, job, attempts, elapsed, error
                );
            }
        }
    }

    fn summary(&self, summary: &RunSummary) {
        match self.summary_out.lock() {
            Ok(mut out) => {
                if let Err(e) = writeln!(out, "{}", summary).and_then(|_| out.flush()) {
                    warn!("Failed to write summary: {}", e);
                }
            }
            Err(_) => warn!("Summary writer lock poisoned"),
        }
        info!(
            "Requests: {}  Completed: {}  Failed: {}",
            summary.total_requests, summary.completed, summary.failed
        );
    }
}
