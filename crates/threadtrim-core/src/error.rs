use serde::Serialize;
use thiserror::Error;
use threadtrim_dom::DomError;

use crate::command::ValidationError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Feature unavailable on this page: {0}")]
    Unavailable(#[from] DetectionFailure),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("DOM error: {0}")]
    Dom(#[from] DomError),

    #[error("A windowing pass is already in progress")]
    Busy,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Engine runtime has shut down")]
    ChannelClosed,
}

impl Error {
    /// Stable identifier reported in structured failure responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Unavailable(_) => "unavailable",
            Error::Validation(err) => err.kind(),
            Error::Dom(_) => "dom",
            Error::Busy => "busy",
            Error::Configuration(_) => "configuration",
            Error::Io(_) => "io",
            Error::Serialization(_) => "serialization",
            Error::ChannelClosed => "channel-closed",
        }
    }
}

/// Why the page could not be windowed. Never surfaced as a visible failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionFailure {
    #[error("no scrollable conversation container found")]
    NoContainer,

    #[error("no repeated message blocks found under the container")]
    NoContentParent,

    #[error("windowing is disabled for this surface")]
    SurfaceDisabled,
}
