//! Typed IPC protocol between the daemon and its UI surfaces.
//!
//! Requests and events are closed sum types dispatched by one exhaustive
//! `match` in the daemon router; the wire format is MessagePack frames with
//! a 4-byte little-endian length prefix. Every request gets exactly one
//! correlated [`AcornResponse`] on its own connection; [`AcornEvent`]s are
//! fire-and-forget broadcasts pushed to subscribed connections only.

use serde::{Deserialize, Serialize};

use crate::models::{InspirationItem, RecordType, Tweet};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AcornRequest {
    Ping,
    /// Capture-path embed. Always answered `success: true`; embedding is
    /// best-effort and must never fail the capture itself.
    EmbedTweet {
        tweet: Tweet,
    },
    EmbedInspiration {
        item: InspirationItem,
    },
    /// Semantic search over the vector store.
    Search {
        query: String,
        top_k: Option<u32>,
        #[serde(default)]
        record_type: Option<RecordType>,
    },
    Stats,
    DeleteVector {
        id: String,
    },
    ClearVectors,
    /// Connectivity self-test against the embedding provider.
    TestEmbedding,
    /// Explicit batch vectorization of caller-supplied entities.
    Vectorize {
        #[serde(default)]
        tweets: Vec<Tweet>,
        #[serde(default)]
        items: Vec<InspirationItem>,
    },
    /// Toggle the shared capture-mode flag, optionally fanning the change
    /// out to every subscribed page context.
    SetCaptureMode {
        enabled: bool,
        #[serde(default = "default_true")]
        broadcast: bool,
    },
    /// Register this connection as a page context that receives events.
    /// Handled at the connection level, not by the router.
    Subscribe,
}

fn default_true() -> bool {
    true
}

/// Single correlated response per request: `{success, data | error}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AcornResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl AcornResponse {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }

    pub fn pong() -> Self {
        Self::ok(serde_json::json!({"pong": true}))
    }
}

/// Broadcast events pushed to subscribed page contexts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AcornEvent {
    CaptureModeChanged { enabled: bool },
    VectorizeProgress { current: usize, total: usize },
}
