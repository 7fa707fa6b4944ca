use serde_json::Value;

use crate::{EventType, SessionStatus};

/// Characters shown before a "read more" affordance.
pub const READ_MORE_LIMIT: usize = 280;

/// Default file name offered for the JSON download.
pub const EXPORT_FILENAME: &str = "data.json";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActivityView {
    pub status: SessionStatus,
    pub file_name: Option<String>,
    pub event_count: usize,
    pub rows: Vec<ActivityRow>,
    pub in_progress: Option<InProgressIndicator>,
    pub failure: Option<String>,
    pub export_available: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRow {
    /// Position in the log, stable across re-renders.
    pub index: usize,
    pub step: String,
    pub event_type: EventType,
    pub rendering: Rendering,
}

impl ActivityRow {
    pub fn key(&self) -> String {
        format!("{}-{}", self.step, self.index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rendering {
    ClauseTable(ClauseTable),
    Document(DocumentView),
    Text(ReadMore),
    Json(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClauseTable {
    pub rows: Vec<ClauseRow>,
}

impl ClauseTable {
    pub const HEADERS: [&'static str; 8] = [
        "Document ID",
        "Clause #",
        "Type",
        "Description",
        "Promisor",
        "Promisee",
        "Promise",
        "Text",
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClauseRow {
    pub document_id: String,
    pub number: String,
    pub clause_type: String,
    pub description: String,
    pub promisor: String,
    pub promisee: String,
    pub promise: String,
    pub text: ReadMore,
}

/// Structured document payload handed to the document viewer as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentView {
    pub document: Value,
    pub children: Option<Vec<Value>>,
}

/// Text capped at [`READ_MORE_LIMIT`] characters with the full value kept for expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadMore {
    pub preview: String,
    pub full: String,
    pub truncated: bool,
}

impl ReadMore {
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_limit(text, READ_MORE_LIMIT)
    }

    pub fn with_limit(text: impl Into<String>, limit: usize) -> Self {
        let full = text.into();
        match full.char_indices().nth(limit) {
            Some((end, _)) => Self {
                preview: full[..end].to_string(),
                full,
                truncated: true,
            },
            None => Self {
                preview: full.clone(),
                full,
                truncated: false,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InProgressIndicator {
    pub steps: Vec<String>,
    pub label: String,
    pub indeterminate: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_not_truncated() {
        let read_more = ReadMore::new("short");
        assert!(!read_more.truncated);
        assert_eq!(read_more.preview, "short");
    }

    #[test]
    fn long_text_is_capped_on_char_boundary() {
        let text = "ü".repeat(READ_MORE_LIMIT + 5);
        let read_more = ReadMore::new(text.clone());
        assert!(read_more.truncated);
        assert_eq!(read_more.preview.chars().count(), READ_MORE_LIMIT);
        assert_eq!(read_more.full, text);
    }

    #[test]
    fn text_at_limit_is_kept_whole() {
        let read_more = ReadMore::new("a".repeat(READ_MORE_LIMIT));
        assert!(!read_more.truncated);
    }
}
