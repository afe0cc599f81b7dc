use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize preferences: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Snapshot(#[from] threadtrim_dom::SnapshotError),

    #[error(transparent)]
    Dom(#[from] threadtrim_dom::DomError),

    #[error("Replay script line {line}: {message}")]
    Replay { line: usize, message: String },

    #[error(transparent)]
    Core(#[from] threadtrim_core::Error),
}
