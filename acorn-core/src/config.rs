use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AcornConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub embedding: EmbeddingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub socket_path: String,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

/// General provider credentials, shared with the chat features of the
/// capture tool. Embedding-specific overrides live in [`EmbeddingSettings`].
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ApiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingSettings {
    /// Master switch for the whole semantic-search feature. When off, every
    /// pipeline and search entry point is a silent no-op.
    #[serde(default = "default_semantic_search")]
    pub semantic_search: bool,

    /// Override credentials/endpoint for the embedding provider. Empty
    /// values fall back to the general `[api]` section.
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,

    /// Inter-request delay during batch vectorization.
    #[serde(default = "default_rate_limit_delay_ms")]
    pub rate_limit_delay_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_semantic_search() -> bool {
    true
}

fn default_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_rate_limit_delay_ms() -> u64 {
    200
}

fn default_max_retries() -> usize {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            semantic_search: default_semantic_search(),
            api_key: String::new(),
            base_url: String::new(),
            model: default_model(),
            rate_limit_delay_ms: default_rate_limit_delay_ms(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl AcornConfig {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path))
            .build()?;
        s.try_deserialize()
    }

    /// Embedding credential, falling back to the general API key when the
    /// embedding-specific one is unset.
    pub fn embedding_api_key(&self) -> &str {
        if self.embedding.api_key.is_empty() {
            &self.api.api_key
        } else {
            &self.embedding.api_key
        }
    }

    /// Embedding endpoint, falling back to the general base URL.
    pub fn embedding_base_url(&self) -> &str {
        if self.embedding.base_url.is_empty() {
            &self.api.base_url
        } else {
            &self.embedding.base_url
        }
    }
}
