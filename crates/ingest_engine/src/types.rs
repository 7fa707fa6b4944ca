use std::fmt;

use ingest_core::{FailureClass, Generation, StepEvent, UploadFailure};

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Step {
        generation: Generation,
        event: StepEvent,
    },
    Finished {
        generation: Generation,
        result: Result<UploadSummary, UploadError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadSummary {
    pub frames: usize,
    pub events: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct UploadError {
    pub kind: FailureKind,
    pub message: String,
}

impl UploadError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Core-facing failure, or `None` for a cancelled (superseded) upload.
    pub fn to_failure(&self) -> Option<UploadFailure> {
        let class = match self.kind {
            FailureKind::Cancelled => return None,
            FailureKind::Framing => FailureClass::Framing,
            FailureKind::Parse => FailureClass::Parse,
            FailureKind::InvalidUrl
            | FailureKind::Io
            | FailureKind::HttpStatus(_)
            | FailureKind::MissingBody
            | FailureKind::Timeout
            | FailureKind::Transport => FailureClass::Transport,
        };
        Some(UploadFailure {
            class,
            message: self.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    Io,
    HttpStatus(u16),
    MissingBody,
    Timeout,
    Transport,
    Framing,
    Parse,
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::Io => write!(f, "file read error"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::MissingBody => write!(f, "response has no body"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Transport => write!(f, "network error"),
            FailureKind::Framing => write!(f, "malformed event stream"),
            FailureKind::Parse => write!(f, "malformed event payload"),
            FailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}
