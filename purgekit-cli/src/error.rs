use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] purgekit_engine::ConfigError),

    #[error("Purge rejected: {0}")]
    Purge(#[from] purgekit_engine::PurgeError),

    #[error("Invalid backend selection: {0}")]
    Selection(#[from] purgekit_engine::SelectionError),

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No caches were purged ({failed} of {requested} backends failed)")]
    NothingPurged { failed: usize, requested: usize },
}

impl CliError {
    pub fn nothing_purged(failed: usize, requested: usize) -> Self {
        Self::NothingPurged { failed, requested }
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NothingPurged { .. } => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
