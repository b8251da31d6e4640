use crate::config::RunConfig;
use crate::error::LoadError;
use crate::report::{Reporter, RunSummary};
use crate::worker::{Counters, Worker};
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tracing::instrument::WithSubscriber;
use tracing::{debug, info, warn};

/// Upper bound on the job queue. Smaller runs get a queue that holds every
/// job; larger ones make the producer wait for workers to catch up.
pub const MAX_QUEUE_CAPACITY: u64 = 65_536;

// =============================================================================
// Run Coordinator
// =============================================================================

/// Dispatch `total_requests` jobs over `worker_count` workers and wait for
/// every one of them to produce an outcome.
///
/// Request failures do not fail the run; they are handed to `reporter`. The
/// summary is passed to `reporter` before it is returned.
pub async fn run_load(
    config: Arc<RunConfig>,
    total_requests: u64,
    worker_count: usize,
    reporter: Arc<dyn Reporter>,
) -> Result<RunSummary, LoadError> {
    if worker_count == 0 {
        return Err(LoadError::NoWorkers);
    }

    if total_requests == 0 {
        info!("No requests to send");
        let summary = RunSummary::empty();
        reporter.summary(&summary);
        return Ok(summary);
    }

    let capacity = queue_capacity(total_requests);
    let (tx, rx) = mpsc::channel::<u64>(capacity);
    let jobs = Arc::new(Mutex::new(rx));
    let counters = Counters::default();

    // Build every client before spawning anything so a failure leaves no
    // tasks behind.
    let mut workers = Vec::with_capacity(worker_count);
    for id in 1..=worker_count {
        workers.push(Worker::new(
            id,
            Arc::clone(&config),
            Arc::clone(&jobs),
            Arc::clone(&reporter),
            counters.clone(),
        )?);
    }
    drop(jobs);

    let handles: Vec<_> = workers
        .into_iter()
        .map(|worker| tokio::spawn(worker.run().with_current_subscriber()))
        .collect();

    info!(
        "Dispatching {} requests to {} workers (queue capacity {})",
        total_requests, worker_count, capacity
    );

    let start = Instant::now();
    for job in 1..=total_requests {
        if tx.send(job).await.is_err() {
            // Only possible when every worker has died.
            warn!("Job queue closed early at job {}", job);
            break;
        }
    }
    drop(tx);
    debug!("All {} jobs queued", total_requests);

    let results = join_all(handles).await;
    let elapsed = start.elapsed();

    for (index, result) in results.into_iter().enumerate() {
        let handled = result?;
        debug!("Worker {} handled {} jobs", index + 1, handled);
    }

    let completed = counters.completed();
    if completed != total_requests {
        return Err(LoadError::Incomplete {
            completed,
            expected: total_requests,
        });
    }

    let summary = RunSummary::new(total_requests, completed, counters.failed(), elapsed);
    reporter.summary(&summary);
    Ok(summary)
}

fn queue_capacity(total_requests: u64) -> usize {
    let capped = total_requests.clamp(1, MAX_QUEUE_CAPACITY);
    usize::try_from(capped).unwrap_or(usize::MAX)
}
