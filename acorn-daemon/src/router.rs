//! Typed request dispatch.
//!
//! One exhaustive `match` maps every request discriminant onto its handler,
//! so an unhandled message kind is a compile error rather than a silent
//! drop. The router never invents errors: handler failures come back as
//! `success: false` with the handler's message; capture-path embeds always
//! answer `success: true` because their failures are absorbed upstream.

use std::sync::atomic::Ordering;
use std::time::Duration;

use acorn_core::ipc::{AcornEvent, AcornRequest, AcornResponse};
use acorn_core::{CaptureEntity, EmbeddingClient, RecordType};
use tokio::sync::mpsc;

use crate::state::AppState;
use crate::subsystems::{pipeline, search, vectorize};

pub async fn handle_request(request: AcornRequest, state: &AppState) -> AcornResponse {
    match request {
        AcornRequest::Ping => AcornResponse::pong(),

        AcornRequest::EmbedTweet { tweet } => {
            let entity = CaptureEntity::from(tweet);
            let outcome = pipeline::embed_on_capture(&entity, &state.store, &state.config).await;
            AcornResponse::ok(serde_json::json!({
                "id": entity.id(),
                "embedding": outcome.as_str(),
            }))
        }

        AcornRequest::EmbedInspiration { item } => {
            let entity = CaptureEntity::from(item);
            let outcome = pipeline::embed_on_capture(&entity, &state.store, &state.config).await;
            AcornResponse::ok(serde_json::json!({
                "id": entity.id(),
                "embedding": outcome.as_str(),
            }))
        }

        AcornRequest::Search {
            query,
            top_k,
            record_type,
        } => handle_search(query, top_k, record_type, state).await,

        AcornRequest::Stats => match state.store.stats().await {
            Ok(stats) => AcornResponse::ok(serde_json::json!({
                "total": stats.total,
                "tweets": stats.tweets,
                "inspirations": stats.inspirations,
            })),
            Err(e) => AcornResponse::err(e.to_string()),
        },

        AcornRequest::DeleteVector { id } => match state.store.delete(&id).await {
            Ok(()) => AcornResponse::ok(serde_json::json!({"deleted": true, "id": id})),
            Err(e) => AcornResponse::err(e.to_string()),
        },

        AcornRequest::ClearVectors => match state.store.clear().await {
            Ok(()) => AcornResponse::ok(serde_json::json!({"cleared": true})),
            Err(e) => AcornResponse::err(e.to_string()),
        },

        AcornRequest::TestEmbedding => match EmbeddingClient::from_config(&state.config) {
            Ok(client) => match client.test_connection().await {
                Ok(dimensions) => AcornResponse::ok(serde_json::json!({
                    "dimensions": dimensions,
                    "message": format!("Connection OK, {}-dimensional embeddings", dimensions),
                })),
                Err(e) => AcornResponse::err(e.to_string()),
            },
            Err(e) => AcornResponse::err(e.to_string()),
        },

        AcornRequest::Vectorize { tweets, items } => handle_vectorize(tweets, items, state).await,

        AcornRequest::SetCaptureMode { enabled, broadcast } => {
            state.capture_mode.store(enabled, Ordering::SeqCst);
            if broadcast {
                state
                    .subscribers
                    .broadcast(&AcornEvent::CaptureModeChanged { enabled })
                    .await;
            }
            AcornResponse::ok(serde_json::json!({"capture_mode": enabled}))
        }

        // Subscribe hands the connection's write half to the event registry,
        // which only the connection task can do.
        AcornRequest::Subscribe => {
            AcornResponse::err("subscribe is handled at the connection level")
        }
    }
}

async fn handle_search(
    query: String,
    top_k: Option<u32>,
    record_type: Option<RecordType>,
    state: &AppState,
) -> AcornResponse {
    // Disabled master switch: empty result, never an error
    if !state.config.embedding.semantic_search {
        return AcornResponse::ok(serde_json::json!({"results": [], "count": 0}));
    }

    let client = match EmbeddingClient::from_config(&state.config) {
        Ok(c) => c,
        Err(e) => return AcornResponse::err(e.to_string()),
    };

    let top_k = top_k.map(|k| k as usize).unwrap_or(search::DEFAULT_TOP_K);
    match search::search(&query, top_k, record_type, &state.store, &client).await {
        Ok(hits) => AcornResponse::ok(serde_json::json!({
            "count": hits.len(),
            "results": hits,
        })),
        Err(e) => AcornResponse::err(e.to_string()),
    }
}

async fn handle_vectorize(
    tweets: Vec<acorn_core::Tweet>,
    items: Vec<acorn_core::InspirationItem>,
    state: &AppState,
) -> AcornResponse {
    if !state.config.embedding.semantic_search {
        return AcornResponse::ok(serde_json::json!({
            "success_count": 0,
            "error_count": 0,
            "total": 0,
            "semantic_search": false,
        }));
    }

    let client = match EmbeddingClient::from_config(&state.config) {
        Ok(c) => c,
        Err(e) => return AcornResponse::err(e.to_string()),
    };

    let entities: Vec<CaptureEntity> = tweets
        .into_iter()
        .map(CaptureEntity::from)
        .chain(items.into_iter().map(CaptureEntity::from))
        .collect();

    // Forward per-item progress to subscribed page contexts
    let (tx, mut rx) = mpsc::unbounded_channel::<vectorize::BatchProgress>();
    let subscribers = state.subscribers.clone();
    let forwarder = tokio::spawn(async move {
        while let Some(p) = rx.recv().await {
            subscribers
                .broadcast(&AcornEvent::VectorizeProgress {
                    current: p.current,
                    total: p.total,
                })
                .await;
        }
    });

    let delay = Duration::from_millis(state.config.embedding.rate_limit_delay_ms);
    let summary =
        vectorize::run_batch(entities, &state.store, &client, delay, Some(tx)).await;
    let _ = forwarder.await;

    AcornResponse::ok(serde_json::json!({
        "success_count": summary.success_count,
        "error_count": summary.error_count,
        "total": summary.total,
        "partial_failure": summary.error_count > 0,
    }))
}
