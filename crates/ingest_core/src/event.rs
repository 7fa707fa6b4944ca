use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

const EXCERPT_CHARS: usize = 120;

/// Status carried by a step event. Unknown wire values are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    Waiting,
    Result,
    Error,
    Log,
    Other(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            EventType::Waiting => "WAITING",
            EventType::Result => "RESULT",
            EventType::Error => "ERROR",
            EventType::Log => "LOG",
            EventType::Other(raw) => raw,
        }
    }

    pub fn is_waiting(&self) -> bool {
        matches!(self, EventType::Waiting)
    }
}

impl From<String> for EventType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "WAITING" => EventType::Waiting,
            "RESULT" => EventType::Result,
            "ERROR" => EventType::Error,
            "LOG" => EventType::Log,
            _ => EventType::Other(raw),
        }
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        match value {
            EventType::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded unit of the upload event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEvent {
    pub step: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default)]
    pub message: Value,
}

impl StepEvent {
    pub fn new(step: impl Into<String>, event_type: EventType, message: Value) -> Self {
        Self {
            step: step.into(),
            event_type,
            message,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("malformed step event ({message}) in payload {excerpt:?}")]
pub struct ParseError {
    pub message: String,
    pub excerpt: String,
}

/// Parse one frame payload. The message body is kept as opaque JSON.
pub fn parse_step_event(payload: &str) -> Result<StepEvent, ParseError> {
    serde_json::from_str(payload).map_err(|err| ParseError {
        message: err.to_string(),
        excerpt: excerpt(payload),
    })
}

fn excerpt(payload: &str) -> String {
    match payload.char_indices().nth(EXCERPT_CHARS) {
        Some((end, _)) => format!("{}...", &payload[..end]),
        None => payload.to_string(),
    }
}
