use std::fmt::Display;
use std::future::Future;
use tracing::warn;

/// A successful attempt result that may still call for another attempt.
pub trait Retryable {
    fn should_retry(&self) -> bool;

    /// Short description used in the retry log line.
    fn describe(&self) -> String;
}

/// Final result of a retried operation together with how many attempts it took.
#[derive(Debug)]
pub struct Attempted<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

/// Immediate retries, no backoff. An error or a retryable value triggers
/// another attempt until `1 + max_retries` attempts have been made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Run `attempt` until it yields a value that does not need retrying or
    /// the attempts are used up. The last result is returned as is.
    ///
    /// `attempt` receives the 1-based attempt number.
    pub async fn execute<F, Fut, T, E>(&self, mut attempt: F) -> Attempted<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Retryable,
        E: Display,
    {
        let max_attempts = self.max_attempts();
        let mut current = 1;

        loop {
            let result = attempt(current).await;

            let retry = match &result {
                Ok(value) => value.should_retry(),
                Err(_) => true,
            };

            if !retry || current >= max_attempts {
                return Attempted {
                    result,
                    attempts: current,
                };
            }

            match &result {
                Ok(value) => warn!(
                    "Attempt {}/{} returned {}, retrying",
                    current,
                    max_attempts,
                    value.describe()
                ),
                Err(e) => warn!(
                    "Attempt {}/{} failed: {}, retrying",
                    current, max_attempts, e
                ),
            }

            current += 1;
        }
    }
}
