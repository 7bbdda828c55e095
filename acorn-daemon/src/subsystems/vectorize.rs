//! Batch vectorization coordinator.
//!
//! Drives the embedding pipeline over many entities strictly sequentially,
//! with a fixed inter-request delay to stay inside provider rate limits.
//! Per-item failures are counted and logged but never halt the batch; the
//! final summary carries aggregate counts only, so a partial failure is
//! retried by re-running the batch (upserts make that idempotent).

use std::time::Duration;

use acorn_core::{CaptureEntity, Embedder, VectorStore};
use serde::Serialize;
use tokio::sync::mpsc;

use super::pipeline;

/// Emitted after every item, success or failure, so a caller can render a
/// live progress indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub current: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub success_count: usize,
    pub error_count: usize,
    pub total: usize,
}

/// Run the pipeline over `entities` one at a time.
///
/// `delay` is inserted between provider calls (not after the last one).
/// Progress events are pushed through `progress` when supplied; a dropped
/// receiver is ignored.
pub async fn run_batch(
    entities: Vec<CaptureEntity>,
    store: &VectorStore,
    embedder: &dyn Embedder,
    delay: Duration,
    progress: Option<mpsc::UnboundedSender<BatchProgress>>,
) -> BatchSummary {
    let total = entities.len();
    let mut success_count = 0usize;
    let mut error_count = 0usize;

    tracing::info!(total, "Batch vectorization started");

    for (index, entity) in entities.iter().enumerate() {
        match pipeline::embed_entity(entity, store, embedder).await {
            Ok(_) => success_count += 1,
            Err(e) => {
                error_count += 1;
                tracing::warn!(id = %entity.id(), error = %e, "Batch item failed, continuing");
            }
        }

        if let Some(tx) = &progress {
            let _ = tx.send(BatchProgress {
                current: index + 1,
                total,
            });
        }

        if index + 1 < total && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    let summary = BatchSummary {
        success_count,
        error_count,
        total,
    };
    if summary.error_count > 0 {
        tracing::warn!(?summary, "Batch vectorization finished with failures");
    } else {
        tracing::info!(?summary, "Batch vectorization complete");
    }
    summary
}
