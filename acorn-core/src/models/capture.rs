use serde::{Deserialize, Serialize};

use super::RecordType;

/// A captured tweet, as delivered by the capture surfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tweet {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub author_thread: Option<String>,
    #[serde(default)]
    pub comment_highlights: Option<String>,
}

/// A captured inspiration item (e.g. a collected note from a content feed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspirationItem {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub content: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub author_thread: Option<String>,
    #[serde(default)]
    pub comment_highlights: Option<String>,
}

/// Either kind of embeddable source entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CaptureEntity {
    Tweet(Tweet),
    Inspiration(InspirationItem),
}

impl CaptureEntity {
    pub fn id(&self) -> &str {
        match self {
            CaptureEntity::Tweet(t) => &t.id,
            CaptureEntity::Inspiration(i) => &i.id,
        }
    }

    pub fn record_type(&self) -> RecordType {
        match self {
            CaptureEntity::Tweet(_) => RecordType::Tweet,
            CaptureEntity::Inspiration(_) => RecordType::Inspiration,
        }
    }

    /// Canonical text to embed: every non-empty text field in fixed order,
    /// joined with a blank line. Deterministic per entity.
    pub fn embedding_text(&self) -> String {
        let parts: Vec<&str> = match self {
            CaptureEntity::Tweet(t) => [
                Some(t.content.as_str()),
                t.summary.as_deref(),
                t.author_thread.as_deref(),
                t.comment_highlights.as_deref(),
            ]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .collect(),
            CaptureEntity::Inspiration(i) => [
                i.title.as_deref(),
                Some(i.content.as_str()),
                i.summary.as_deref(),
                i.author_thread.as_deref(),
                i.comment_highlights.as_deref(),
            ]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .collect(),
        };

        parts.join("\n\n")
    }
}

impl From<Tweet> for CaptureEntity {
    fn from(t: Tweet) -> Self {
        CaptureEntity::Tweet(t)
    }
}

impl From<InspirationItem> for CaptureEntity {
    fn from(i: InspirationItem) -> Self {
        CaptureEntity::Inspiration(i)
    }
}
