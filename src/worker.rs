use crate::config::RunConfig;
use crate::report::{Reporter, RequestOutcome};
use crate::retry::{Retryable, RetryPolicy};
use reqwest::{Client, StatusCode};
use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, trace};

/// Receiving end of the job queue, shared by every worker. Each job id is
/// handed to exactly one worker.
pub type JobReceiver = Arc<Mutex<mpsc::Receiver<u64>>>;

// =============================================================================
// Counters
// =============================================================================

#[derive(Clone, Default)]
pub struct Counters {
    pub completed: Arc<AtomicU64>,
    pub failed: Arc<AtomicU64>,
}

impl Counters {
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Responses
// =============================================================================

/// One attempt that made it to a response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

impl Retryable for HttpResponse {
    /// Anything other than 200 is retried, including other 2xx codes.
    fn should_retry(&self) -> bool {
        self.status != StatusCode::OK
    }

    fn describe(&self) -> String {
        self.status.to_string()
    }
}

/// Render an error with all of its causes, outermost first.
pub fn error_chain(error: &dyn Error) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

// =============================================================================
// Worker
// =============================================================================

pub struct Worker {
    id: usize,
    client: Client,
    config: Arc<RunConfig>,
    retry: RetryPolicy,
    jobs: JobReceiver,
    reporter: Arc<dyn Reporter>,
    counters: Counters,
}

impl Worker {
    /// Each worker gets its own client so connection pools are not shared.
    pub fn new(
        id: usize,
        config: Arc<RunConfig>,
        jobs: JobReceiver,
        reporter: Arc<dyn Reporter>,
        counters: Counters,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        let retry = RetryPolicy::new(config.max_retries);

        Ok(Self {
            id,
            client,
            config,
            retry,
            jobs,
            reporter,
            counters,
        })
    }

    /// Pull jobs until the queue is closed and drained. Returns how many jobs
    /// this worker handled.
    pub async fn run(self) -> u64 {
        debug!("Worker {} started", self.id);
        let mut handled = 0;

        loop {
            let job = {
                let mut jobs = self.jobs.lock().await;
                jobs.recv().await
            };
            let Some(job) = job else { break };

            let outcome = self.execute(job).await;
            if !outcome.is_success() {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
            }
            self.reporter.outcome(self.id, job, &outcome);
            self.counters.completed.fetch_add(1, Ordering::AcqRel);
            handled += 1;
        }

        debug!("Worker {} stopped after {} jobs", self.id, handled);
        handled
    }

    async fn execute(&self, job: u64) -> RequestOutcome {
        let start = Instant::now();
        let attempted = self
            .retry
            .execute(|attempt| self.send_once(job, attempt))
            .await;
        let elapsed = start.elapsed();

        match attempted.result {
            Ok(response) => RequestOutcome::Response {
                status: response.status,
                elapsed,
                attempts: attempted.attempts,
                body: response.body,
            },
            Err(e) => RequestOutcome::Failed {
                error: error_chain(&e),
                elapsed,
                attempts: attempted.attempts,
            },
        }
    }

    async fn send_once(&self, job: u64, attempt: u32) -> Result<HttpResponse, reqwest::Error> {
        trace!("Worker {} job {} attempt {}", self.id, job, attempt);

        let mut request = self
            .client
            .request(self.config.method.clone(), self.config.url.clone())
            .headers(self.config.headers.clone());
        if !self.config.body.is_empty() {
            request = request.body(self.config.body.clone());
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_predicate_is_exactly_200() {
        let response = |code: u16| HttpResponse {
            status: StatusCode::from_u16(code).unwrap(),
            body: String::new(),
        };

        assert!(!response(200).should_retry());
        assert!(response(201).should_retry());
        assert!(response(204).should_retry());
        assert!(response(404).should_retry());
        assert!(response(503).should_retry());
        assert_eq!(response(503).describe(), "503 Service Unavailable");
    }

    #[derive(Debug, thiserror::Error)]
    #[error("error sending request")]
    struct SendError(#[source] ConnectError);

    #[derive(Debug, thiserror::Error)]
    #[error("tcp connect error")]
    struct ConnectError(#[source] std::io::Error);

    #[test]
    fn test_error_chain_keeps_every_cause() {
        let refused =
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        let error = SendError(ConnectError(refused));
        assert_eq!(
            error_chain(&error),
            "error sending request: tcp connect error: connection refused"
        );

        let plain = std::io::Error::new(std::io::ErrorKind::TimedOut, "operation timed out");
        assert_eq!(error_chain(&plain), "operation timed out");
    }
}
