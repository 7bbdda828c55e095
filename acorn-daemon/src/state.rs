use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use acorn_core::{AcornConfig, VectorStore};

use crate::subsystems::broadcast::Subscribers;

/// Shared daemon state handed to every connection task.
///
/// The store handle is opened once at startup and only ever reached through
/// this struct; UI surfaces go through the IPC bus, never the file.
#[derive(Clone)]
pub struct AppState {
    pub store: VectorStore,
    pub config: AcornConfig,
    /// The shared capture-mode flag toggled by `SetCaptureMode`.
    pub capture_mode: Arc<AtomicBool>,
    pub subscribers: Subscribers,
}

impl AppState {
    pub fn new(store: VectorStore, config: AcornConfig) -> Self {
        Self {
            store,
            config,
            capture_mode: Arc::new(AtomicBool::new(false)),
            subscribers: Subscribers::new(),
        }
    }
}
