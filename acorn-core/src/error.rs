use thiserror::Error;

#[derive(Error, Debug)]
pub enum AcornError {
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
