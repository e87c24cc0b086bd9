use thiserror::Error;

/// Failures while reading a run request or writing its outputs.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("no run request on stdin")]
    EmptyInput,
    #[error("invalid run request JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid run request TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("run input does not match the expected shape: {0}")]
    Input(serde_json::Error),
    #[error("failed to write CSV output: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("failed to configure logging: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, RunnerError>;
