//! Embedding pipeline — text derivation, provider call, store upsert.
//!
//! Two entry points with different failure policies: [`embed_entity`]
//! propagates errors and backs the user-initiated batch path, while
//! [`embed_on_capture`] swallows every failure so embedding can never abort
//! a capture in progress.

use acorn_core::{
    AcornConfig, CaptureEntity, Embedder, EmbeddingClient, VectorRecord, VectorStore,
};
use chrono::Utc;

/// Terminal outcome of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedOutcome {
    /// Vector generated and upserted.
    Stored,
    /// Entity had no embeddable text; no provider call, no store write.
    SkippedEmpty,
}

/// Outcome reported on the capture path, where failures are absorbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    Stored,
    SkippedEmpty,
    /// Semantic search is switched off; silent no-op.
    Disabled,
    /// Embedding failed; the error was logged and swallowed.
    Failed,
}

impl CaptureOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureOutcome::Stored => "stored",
            CaptureOutcome::SkippedEmpty => "skipped_empty",
            CaptureOutcome::Disabled => "disabled",
            CaptureOutcome::Failed => "failed",
        }
    }
}

/// Derive text, embed it, and upsert the resulting record.
pub async fn embed_entity(
    entity: &CaptureEntity,
    store: &VectorStore,
    embedder: &dyn Embedder,
) -> anyhow::Result<EmbedOutcome> {
    let text = entity.embedding_text();
    if text.trim().is_empty() {
        tracing::info!(id = %entity.id(), "Entity has no embeddable text, skipping");
        return Ok(EmbedOutcome::SkippedEmpty);
    }

    let vector = embedder.embed(&text).await?;
    anyhow::ensure!(!vector.is_empty(), "provider returned an empty vector");

    let record = VectorRecord {
        id: entity.id().to_string(),
        record_type: entity.record_type(),
        content: text,
        vector,
        created_at: Utc::now(),
    };
    store.put(&record).await?;

    tracing::info!(id = %record.id, kind = %record.record_type, "Entity vectorized");
    Ok(EmbedOutcome::Stored)
}

/// Capture-path embed: best-effort, never fails the caller.
pub async fn embed_on_capture(
    entity: &CaptureEntity,
    store: &VectorStore,
    config: &AcornConfig,
) -> CaptureOutcome {
    if !config.embedding.semantic_search {
        return CaptureOutcome::Disabled;
    }

    let client = match EmbeddingClient::from_config(config) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(id = %entity.id(), error = %e, "Embedding client unavailable");
            return CaptureOutcome::Failed;
        }
    };

    match embed_entity(entity, store, &client).await {
        Ok(EmbedOutcome::Stored) => CaptureOutcome::Stored,
        Ok(EmbedOutcome::SkippedEmpty) => CaptureOutcome::SkippedEmpty,
        Err(e) => {
            tracing::error!(id = %entity.id(), error = %e, "Capture embedding failed (swallowed)");
            CaptureOutcome::Failed
        }
    }
}
