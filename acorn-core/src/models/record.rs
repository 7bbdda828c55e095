use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of source entity a vector was derived from. Stored alongside the
/// record and used for filtered scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Tweet,
    Inspiration,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Tweet => "tweet",
            RecordType::Inspiration => "inspiration",
        }
    }
}

impl std::str::FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tweet" => Ok(RecordType::Tweet),
            "inspiration" => Ok(RecordType::Inspiration),
            other => Err(format!("unknown record type: {}", other)),
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted unit pairing an entity id with its embedding vector and the
/// exact text that was embedded.
///
/// `id` is the id of the source entity; the store upserts on it, so there is
/// at most one record per entity at any time. `created_at` is the moment the
/// vector was generated, not the source entity's capture time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub record_type: RecordType,
    pub content: String,
    pub vector: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

/// Per-type record counts, derived by scanning the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorStats {
    pub total: usize,
    pub tweets: usize,
    pub inspirations: usize,
}
