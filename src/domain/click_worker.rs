//! Background worker draining the click queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, error, info};

use crate::domain::click_event::ClickEvent;
use crate::domain::repositories::ClickRepository;
use crate::error::AppError;

const MAX_ATTEMPTS: usize = 3;

/// Persists click events until the sending side of the channel is dropped.
///
/// At most `concurrency` inserts run at once. Each insert is retried with
/// jittered exponential backoff; validation failures (the link was deleted in
/// the meantime) are not retried. Events that still fail are logged and counted
/// in `click_events_failed_total`.
pub async fn run_click_worker(
    mut rx: mpsc::Receiver<ClickEvent>,
    repository: Arc<dyn ClickRepository>,
    concurrency: usize,
) {
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));

    while let Some(event) = rx.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let repository = repository.clone();

        tokio::spawn(async move {
            persist_with_retry(repository.as_ref(), event).await;
            drop(permit);
        });
    }

    // Wait for in-flight inserts before returning.
    let _ = permits.acquire_many(concurrency.max(1) as u32).await;
    info!("Click worker stopped");
}

async fn persist_with_retry(repository: &dyn ClickRepository, event: ClickEvent) {
    let strategy = ExponentialBackoff::from_millis(10)
        .max_delay(Duration::from_secs(1))
        .map(jitter)
        .take(MAX_ATTEMPTS - 1);

    let link_id = event.link_id;
    let result = RetryIf::spawn(
        strategy,
        || {
            let event = event.clone();
            async move {
                match repository.record_click(event).await {
                    Err(AppError::Validation { message, .. }) => {
                        Err(RetryOutcome::Permanent(message))
                    }
                    Err(e) => Err(RetryOutcome::Transient(e.to_string())),
                    Ok(()) => Ok(()),
                }
            }
        },
        |outcome: &RetryOutcome| matches!(outcome, RetryOutcome::Transient(_)),
    )
    .await;

    match result {
        Ok(()) => {
            metrics::counter!("click_events_persisted_total").increment(1);
            debug!(link_id, "Click recorded");
        }
        Err(outcome) => {
            metrics::counter!("click_events_failed_total").increment(1);
            error!(link_id, error = %outcome, "Failed to record click");
        }
    }
}

/// Wraps an insert failure so that permanent errors short-circuit the retries.
#[derive(Debug, thiserror::Error)]
enum RetryOutcome {
    #[error("{0} (not retried)")]
    Permanent(String),
    #[error("{0}")]
    Transient(String),
}
