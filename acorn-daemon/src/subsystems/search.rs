//! Semantic search: embed the query, scan the store, rank by cosine
//! similarity.

use acorn_core::similarity::rank_top_k;
use acorn_core::{Embedder, RecordType, VectorStore};
use serde::Serialize;

/// Default result count when the caller does not specify one.
pub const DEFAULT_TOP_K: usize = 10;

/// A ranked result shaped for the IPC response.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub record_type: RecordType,
    pub content: String,
    pub similarity: f32,
}

/// Brute-force semantic search over the stored vectors, optionally filtered
/// by record type. Provider and storage errors propagate; this is a
/// user-initiated path.
pub async fn search(
    query: &str,
    top_k: usize,
    record_type: Option<RecordType>,
    store: &VectorStore,
    embedder: &dyn Embedder,
) -> anyhow::Result<Vec<SearchHit>> {
    let query_vector = embedder.embed(query).await?;

    let candidates = match record_type {
        Some(t) => store.list_by_type(t).await?,
        None => store.list_all().await?,
    };

    let hits = rank_top_k(&query_vector, candidates, top_k)
        .into_iter()
        .map(|m| SearchHit {
            id: m.record.id,
            record_type: m.record.record_type,
            content: m.record.content,
            similarity: m.similarity,
        })
        .collect();

    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use acorn_core::{EmbeddingError, VectorRecord};
    use async_trait::async_trait;
    use chrono::Utc;

    /// Embedder returning a fixed query vector.
    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(self.0.clone())
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(vec![self.0.clone()])
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    async fn seeded_store() -> VectorStore {
        let store = VectorStore::open_in_memory().await.unwrap();
        let records = [
            ("a", RecordType::Tweet, vec![1.0, 0.0]),
            ("b", RecordType::Tweet, vec![0.0, 1.0]),
            ("c", RecordType::Inspiration, vec![1.0, 1.0]),
        ];
        for (id, record_type, vector) in records {
            store
                .put(&VectorRecord {
                    id: id.to_string(),
                    record_type,
                    content: format!("text of {}", id),
                    vector,
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn returns_top_k_ordered_by_similarity() {
        let store = seeded_store().await;
        let embedder = FixedEmbedder(vec![1.0, 0.0]);

        let hits = search("query", 2, None, &store, &embedder).await.unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "a");
        assert!((hits[0].similarity - 1.0).abs() < 1e-6);
        assert_eq!(hits[1].id, "c");
        assert!((hits[1].similarity - 0.707).abs() < 1e-3);
    }

    #[tokio::test]
    async fn type_filter_restricts_candidates() {
        let store = seeded_store().await;
        let embedder = FixedEmbedder(vec![1.0, 0.0]);

        let hits = search("query", 10, Some(RecordType::Inspiration), &store, &embedder)
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "c");
        assert_eq!(hits[0].record_type, RecordType::Inspiration);
    }

    #[tokio::test]
    async fn empty_store_yields_no_hits() {
        let store = VectorStore::open_in_memory().await.unwrap();
        let embedder = FixedEmbedder(vec![1.0, 0.0]);

        let hits = search("query", 10, None, &store, &embedder).await.unwrap();
        assert!(hits.is_empty());
    }
}
