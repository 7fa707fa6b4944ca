use std::io::{self, Write};

use chrono::Local;
use ingest_core::{
    ActivityRow, ActivityView, ClauseTable, DocumentView, ReadMore, Rendering, SessionStatus,
};
use serde_json::Value;

const INDENT: &str = "    ";

/// Prints the activity log incrementally: rows already shown are not repeated.
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    printed_rows: usize,
    last_waiting: Option<String>,
    file_name: Option<String>,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, view: &ActivityView, out: &mut impl Write) -> io::Result<()> {
        if view.file_name != self.file_name || view.rows.len() < self.printed_rows {
            // New upload: start over.
            self.printed_rows = 0;
            self.last_waiting = None;
            self.file_name = view.file_name.clone();
            if let Some(name) = &view.file_name {
                writeln!(out, "Uploading {name}")?;
            }
        }

        for row in &view.rows[self.printed_rows..] {
            let stamp = Local::now().format("%H:%M:%S");
            writeln!(out, "[{stamp}] {}", format_row(row))?;
        }
        self.printed_rows = view.rows.len();

        let waiting = view.in_progress.as_ref().map(|p| p.label.clone());
        if waiting != self.last_waiting {
            if let Some(label) = &waiting {
                writeln!(out, "... {label}: in progress")?;
            }
            self.last_waiting = waiting;
        }

        match view.status {
            SessionStatus::Completed => {
                writeln!(out, "Upload complete ({} events)", view.event_count)?;
            }
            SessionStatus::Failed => {
                let reason = view.failure.as_deref().unwrap_or("unknown error");
                writeln!(
                    out,
                    "Upload failed after {} events: {reason}",
                    view.event_count
                )?;
            }
            SessionStatus::Idle | SessionStatus::Uploading => {}
        }
        out.flush()
    }
}

pub fn format_row(row: &ActivityRow) -> String {
    let body = match &row.rendering {
        Rendering::ClauseTable(table) => format_clause_table(table),
        Rendering::Document(document) => format_document(document),
        Rendering::Text(text) => format_read_more(text),
        Rendering::Json(json) => json.clone(),
    };
    format!("{} {}\n{}", row.step, row.event_type, indent(&body))
}

fn format_clause_table(table: &ClauseTable) -> String {
    let mut lines = vec![ClauseTable::HEADERS.join(" | ")];
    for clause in &table.rows {
        lines.push(
            [
                clause.document_id.as_str(),
                clause.number.as_str(),
                clause.clause_type.as_str(),
                clause.description.as_str(),
                clause.promisor.as_str(),
                clause.promisee.as_str(),
                clause.promise.as_str(),
                &format_read_more(&clause.text),
            ]
            .join(" | "),
        );
    }
    lines.join("\n")
}

fn format_document(document: &DocumentView) -> String {
    match &document.children {
        Some(children) => {
            let mut text = String::new();
            collect_text(children, &mut text);
            format!(
                "document with {} blocks\n{}",
                children.len(),
                format_read_more(&ReadMore::new(text.trim()))
            )
        }
        None => "document".to_string(),
    }
}

/// Concatenate the `text` leaves of a slate node tree, one line per block.
fn collect_text(nodes: &[Value], out: &mut String) {
    for node in nodes {
        if let Some(text) = node.get("text").and_then(Value::as_str) {
            out.push_str(text);
        }
        if let Some(children) = node.get("children").and_then(Value::as_array) {
            collect_text(children, out);
            if !out.ends_with('\n') {
                out.push('\n');
            }
        }
    }
}

fn format_read_more(text: &ReadMore) -> String {
    if text.truncated {
        let hidden = text.full.chars().count() - text.preview.chars().count();
        format!("{}... [{hidden} more chars]", text.preview)
    } else {
        text.full.clone()
    }
}

fn indent(body: &str) -> String {
    body.lines()
        .map(|line| format!("{INDENT}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
