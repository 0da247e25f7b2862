//! The incremental enrichment engine.
//!
//! One engine drives both pipelines: it decides which items still need
//! work, fans them out over a bounded worker pool, retries transient
//! failures with exponential backoff, and checkpoints every terminal
//! outcome before moving on. Kind-specific behavior lives entirely in
//! the [`Annotate`] implementation and the item contexts.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use paperatlas_shared::{
    Annotate, EngineConfig, EnrichmentResult, ItemFailure, PaperAtlasError, Result, RunSummary,
    WorkItem,
};
use paperatlas_store::CheckpointStore;

/// Observer for run progress. The CLI hangs a progress bar off this;
/// library callers use [`SilentProgress`].
pub trait EnrichmentProgress: Send + Sync {
    /// Called once before any work starts.
    fn begin(&self, _total: usize, _skipped: usize) {}
    /// Called after each item reaches a terminal outcome.
    fn item_finished(&self, _item_id: &str, _success: bool) {}
}

/// No-op progress observer.
pub struct SilentProgress;

impl EnrichmentProgress for SilentProgress {}

/// Whether a checkpoint entry lets us skip this item.
///
/// Complete means success with a valid payload; on top of that the
/// stored fingerprint must match the item's current one, so an upstream
/// PDF URL change forces re-enrichment.
pub(crate) fn can_skip(item: &WorkItem, existing: Option<&EnrichmentResult>) -> bool {
    existing.is_some_and(|e| e.is_complete() && e.source_fingerprint == item.fingerprint)
}

/// Run one enrichment pass over `items`.
///
/// Already-complete items are skipped; the rest are processed by a pool
/// of `config.workers` concurrent workers. Every terminal outcome is
/// durably upserted into the store before the item counts as done, so an
/// interrupted run loses at most the items still in flight.
#[instrument(skip_all, fields(items = items.len(), workers = config.workers))]
pub async fn run_enrichment(
    items: Vec<WorkItem>,
    annotator: Arc<dyn Annotate>,
    store: Arc<CheckpointStore>,
    config: EngineConfig,
    progress: Arc<dyn EnrichmentProgress>,
) -> Result<RunSummary> {
    let total_items = items.len();
    let snapshot = store.snapshot().await;

    let pending: Vec<WorkItem> = items
        .into_iter()
        .filter(|item| {
            if can_skip(item, snapshot.get(&item.id)) {
                debug!(item = %item.id, "already complete, skipping");
                false
            } else {
                true
            }
        })
        .collect();

    let skipped = total_items - pending.len();
    info!(total = total_items, skipped, pending = pending.len(), "starting enrichment pass");
    progress.begin(total_items, skipped);

    let semaphore = Arc::new(Semaphore::new(config.workers));
    let mut tasks = JoinSet::new();

    for item in pending {
        let semaphore = Arc::clone(&semaphore);
        let annotator = Arc::clone(&annotator);
        let store = Arc::clone(&store);
        let progress = Arc::clone(&progress);
        let config = config.clone();

        tasks.spawn(async move {
            let _permit = semaphore
                .acquire()
                .await
                .map_err(|e| PaperAtlasError::validation(format!("worker pool closed: {e}")))?;

            let result = enrich_one(&item, annotator.as_ref(), &config).await;
            let outcome = match result.status {
                paperatlas_shared::EnrichmentStatus::Success => Ok(()),
                _ => Err(ItemFailure {
                    item_id: item.id.clone(),
                    error: result.error.clone().unwrap_or_default(),
                }),
            };

            // Checkpoint before reporting done.
            store.upsert(result).await?;
            progress.item_finished(&item.id, outcome.is_ok());
            Ok::<_, PaperAtlasError>(outcome)
        });
    }

    let mut summary = RunSummary {
        total_items,
        skipped,
        ..Default::default()
    };

    while let Some(joined) = tasks.join_next().await {
        let outcome = joined
            .map_err(|e| PaperAtlasError::validation(format!("enrichment worker panicked: {e}")))??;
        match outcome {
            Ok(()) => summary.succeeded += 1,
            Err(failure) => {
                summary.failed += 1;
                summary.failures.push(failure);
            }
        }
    }

    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        skipped = summary.skipped,
        "enrichment pass finished"
    );
    Ok(summary)
}

/// Process one item to a terminal result, retrying up to the attempt
/// budget with exponential backoff between attempts.
async fn enrich_one(
    item: &WorkItem,
    annotator: &dyn Annotate,
    config: &EngineConfig,
) -> EnrichmentResult {
    let mut last_error = String::new();

    for attempt in 1..=config.max_attempts {
        match annotator.annotate(item).await {
            // The annotator validates its own parses, but payloads can
            // also arrive from other Annotate impls; enforce the
            // all-or-nothing rule here regardless.
            Ok(payload) => match payload.validate() {
                Ok(()) => {
                    debug!(item = %item.id, attempt, "enriched");
                    return EnrichmentResult::success(
                        item.id.clone(),
                        payload,
                        attempt,
                        item.fingerprint.clone(),
                    );
                }
                Err(violation) => {
                    last_error = format!("malformed annotation: {violation}");
                }
            },
            Err(e) => {
                last_error = e.to_string();
            }
        }

        if attempt < config.max_attempts {
            let delay = backoff_delay(config, attempt);
            warn!(
                item = %item.id,
                attempt,
                error = %last_error,
                delay_ms = delay.as_millis() as u64,
                "attempt failed, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }

    warn!(item = %item.id, attempts = config.max_attempts, error = %last_error, "giving up");
    EnrichmentResult::failed(
        item.id.clone(),
        item.kind,
        last_error,
        config.max_attempts,
        item.fingerprint.clone(),
    )
}

/// Delay before the retry following `attempt` (1-based).
fn backoff_delay(config: &EngineConfig, attempt: u32) -> Duration {
    let factor = config.backoff_multiplier.powi(attempt as i32 - 1);
    Duration::from_millis((config.backoff_base_ms as f64 * factor) as u64)
}
