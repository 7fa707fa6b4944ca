//! Activity log rendering: maps the append-only log to display rows.
//!
//! Specialized renderings are looked up in [`RENDER_RULES`] by step name and
//! event type. A rule whose builder rejects the payload shape falls through to
//! the generic text/JSON rendering instead of failing.
use serde::Deserialize;
use serde_json::Value;

use crate::view_model::{
    ActivityRow, ActivityView, ClauseRow, ClauseTable, DocumentView, InProgressIndicator,
    ReadMore, Rendering,
};
use crate::{EventType, StepEvent, UploadState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMatcher {
    Exact(&'static str),
    EndsWith(&'static str),
}

impl StepMatcher {
    pub fn matches(self, step: &str) -> bool {
        match self {
            StepMatcher::Exact(name) => step == name,
            StepMatcher::EndsWith(suffix) => step.ends_with(suffix),
        }
    }
}

pub struct RenderRule {
    pub name: &'static str,
    pub matcher: StepMatcher,
    pub event_type: EventType,
    pub build: fn(&Value) -> Option<Rendering>,
}

impl RenderRule {
    fn applies(&self, event: &StepEvent) -> bool {
        self.event_type == event.event_type && self.matcher.matches(&event.step)
    }
}

/// Specialized renderings, most specific first.
pub static RENDER_RULES: [RenderRule; 2] = [
    RenderRule {
        name: "clause-extraction",
        matcher: StepMatcher::EndsWith("Parse_Clauses_From_Markdown"),
        event_type: EventType::Result,
        build: clause_table,
    },
    RenderRule {
        name: "document-fetch",
        matcher: StepMatcher::Exact("Get_Document_Content"),
        event_type: EventType::Result,
        build: document_view,
    },
];

/// Rendering for a single log entry; `None` means it has no row of its own.
pub fn classify(event: &StepEvent) -> Option<Rendering> {
    let specialized = RENDER_RULES
        .iter()
        .filter(|rule| rule.applies(event))
        .find_map(|rule| (rule.build)(&event.message));
    if specialized.is_some() {
        return specialized;
    }
    if event.event_type.is_waiting() {
        return None;
    }
    Some(fallback(&event.message))
}

/// Serialize the whole log for download.
pub fn export_snapshot(log: &[StepEvent]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(log)
}

pub(crate) fn build_view(state: &UploadState) -> ActivityView {
    let log = state.log();
    let rows = log
        .iter()
        .enumerate()
        .filter_map(|(index, event)| {
            classify(event).map(|rendering| ActivityRow {
                index,
                step: event.step.clone(),
                event_type: event.event_type.clone(),
                rendering,
            })
        })
        .collect();

    let in_progress = if state.pending().is_empty() {
        None
    } else {
        let steps: Vec<String> = state.pending().iter().map(|p| p.step.clone()).collect();
        Some(InProgressIndicator {
            label: steps.join(","),
            steps,
            indeterminate: true,
        })
    };

    ActivityView {
        status: state.status(),
        file_name: state.file_name().map(ToOwned::to_owned),
        event_count: log.len(),
        rows,
        in_progress,
        failure: state.failure().map(ToString::to_string),
        export_available: !log.is_empty(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Clause {
    #[serde(default)]
    document_id: Value,
    #[serde(default)]
    number: Value,
    #[serde(default, rename = "type")]
    clause_type: Value,
    #[serde(default)]
    description: Value,
    #[serde(default)]
    promisor: Value,
    #[serde(default)]
    promisee: Value,
    #[serde(default)]
    promise: Value,
    #[serde(default)]
    content: Value,
}

fn clause_table(message: &Value) -> Option<Rendering> {
    let items = message.as_array()?;
    let rows = items
        .iter()
        .map(|item| {
            if !item.is_object() {
                return None;
            }
            let clause = Clause::deserialize(item).ok()?;
            Some(ClauseRow {
                document_id: cell_text(&clause.document_id),
                number: cell_text(&clause.number),
                clause_type: cell_text(&clause.clause_type),
                description: cell_text(&clause.description),
                promisor: cell_text(&clause.promisor),
                promisee: cell_text(&clause.promisee),
                promise: cell_text(&clause.promise),
                text: ReadMore::new(cell_text(&clause.content)),
            })
        })
        .collect::<Option<Vec<_>>>()?;
    Some(Rendering::ClauseTable(ClauseTable { rows }))
}

fn document_view(message: &Value) -> Option<Rendering> {
    if !message.is_object() {
        return None;
    }
    let children = message
        .pointer("/slate/document/children")
        .and_then(Value::as_array)
        .cloned();
    Some(Rendering::Document(DocumentView {
        document: message.clone(),
        children,
    }))
}

fn fallback(message: &Value) -> Rendering {
    match message {
        Value::String(text) => Rendering::Text(ReadMore::new(text.as_str())),
        other => Rendering::Json(
            serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        ),
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clause_rule_matches_qualified_step_names() {
        let event = StepEvent::new(
            "pipeline.Parse_Clauses_From_Markdown",
            EventType::Result,
            json!([{"number": 3, "content": "text"}]),
        );
        match classify(&event) {
            Some(Rendering::ClauseTable(table)) => {
                assert_eq!(table.rows.len(), 1);
                assert_eq!(table.rows[0].number, "3");
                assert_eq!(table.rows[0].promisor, "");
            }
            other => panic!("expected clause table, got {other:?}"),
        }
    }

    #[test]
    fn clause_rule_requires_result_type() {
        let event = StepEvent::new(
            "Parse_Clauses_From_Markdown",
            EventType::Log,
            json!([{"number": 1}]),
        );
        assert!(matches!(classify(&event), Some(Rendering::Json(_))));
    }

    #[test]
    fn clause_rule_falls_back_on_non_object_items() {
        let event = StepEvent::new(
            "Parse_Clauses_From_Markdown",
            EventType::Result,
            json!([[1, 2], "x"]),
        );
        assert!(matches!(classify(&event), Some(Rendering::Json(_))));
    }

    #[test]
    fn document_rule_is_exact_and_extracts_children() {
        let message = json!({"slate": {"document": {"children": [{"type": "paragraph"}]}}});
        let event = StepEvent::new("Get_Document_Content", EventType::Result, message.clone());
        match classify(&event) {
            Some(Rendering::Document(doc)) => {
                assert_eq!(doc.document, message);
                assert_eq!(doc.children, Some(vec![json!({"type": "paragraph"})]));
            }
            other => panic!("expected document, got {other:?}"),
        }

        let prefixed = StepEvent::new("x.Get_Document_Content", EventType::Result, message);
        assert!(matches!(classify(&prefixed), Some(Rendering::Json(_))));
    }

    #[test]
    fn document_rule_falls_back_on_string_payload() {
        let event = StepEvent::new("Get_Document_Content", EventType::Result, json!("raw"));
        assert!(matches!(classify(&event), Some(Rendering::Text(_))));
    }

    #[test]
    fn waiting_has_no_row() {
        let event = StepEvent::new("Anything", EventType::Waiting, json!({}));
        assert_eq!(classify(&event), None);
    }

    #[test]
    fn unknown_types_use_fallback() {
        let event = StepEvent::new("s", EventType::Other("TRACE".into()), json!({"a": 1}));
        assert_eq!(
            classify(&event),
            Some(Rendering::Json("{\n  \"a\": 1\n}".to_string()))
        );
    }
}
