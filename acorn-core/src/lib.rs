pub mod config;
pub mod embeddings;
pub mod error;
pub mod ipc;
pub mod models;
pub mod similarity;
pub mod store;

pub use config::AcornConfig;
pub use embeddings::{Embedder, EmbeddingClient, EmbeddingError, ProviderSettings, MAX_EMBED_CHARS};
pub use error::AcornError;
pub use models::{CaptureEntity, InspirationItem, RecordType, Tweet, VectorRecord, VectorStats};
pub use similarity::{cosine_similarity, rank_top_k, SearchMatch};
pub use store::VectorStore;
