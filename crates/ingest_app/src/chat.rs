//! Blocking front for the conversation and graph endpoints.

use std::future::Future;
use std::io::{self, Write};
use std::path::Path;

use anyhow::Context;
use ingest_engine::{ApiClient, ApiSettings, ConversationEngine, GraphStore};
use serde_json::Value;

use crate::session::{load_session, save_session};

fn block_on<F: Future>(future: F) -> anyhow::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    Ok(runtime.block_on(future))
}

/// An API client whose cookies are restored from and saved to the session file.
pub struct ChatSession<'a> {
    client: ApiClient,
    settings: &'a ApiSettings,
    session_file: &'a Path,
}

impl<'a> ChatSession<'a> {
    pub fn open(settings: &'a ApiSettings, session_file: &'a Path) -> anyhow::Result<Self> {
        let client = ApiClient::new(settings).context("failed to build api client")?;
        if let Some(cookies) = load_session(session_file, &settings.base_url) {
            client.restore_session(&cookies);
        }
        Ok(Self {
            client,
            settings,
            session_file,
        })
    }

    fn save(&self) {
        if let Some(cookies) = self.client.session_cookies() {
            save_session(self.session_file, &self.settings.base_url, &cookies);
        }
    }

    pub fn send(&self, message: &str) -> anyhow::Result<()> {
        let messages = block_on(self.client.send(message))?.context("chat request failed")?;
        self.save();
        // The reply is the newest visible message.
        let reply = messages.iter().rev().find(|m| !is_system(m));
        print_messages(reply.into_iter(), &mut io::stdout())?;
        Ok(())
    }

    pub fn history(&self) -> anyhow::Result<()> {
        let messages = block_on(self.client.history())?.context("history request failed")?;
        self.save();
        if !messages.iter().any(|m| !is_system(m)) {
            println!("(no messages)");
        }
        print_messages(messages.iter(), &mut io::stdout())?;
        Ok(())
    }

    pub fn reset(&self) -> anyhow::Result<()> {
        block_on(self.client.reset())?.context("reset request failed")?;
        self.save();
        println!("conversation reset");
        Ok(())
    }

    pub fn questions(&self) -> anyhow::Result<()> {
        let questions = block_on(self.client.questions())?.context("questions request failed")?;
        let mut out = io::stdout();
        for question in &questions {
            writeln!(out, "- {}", display_value(question))?;
        }
        Ok(())
    }

    pub fn description(&self) -> anyhow::Result<()> {
        let description =
            block_on(self.client.description())?.context("description request failed")?;
        println!("{}", display_value(&description));
        Ok(())
    }
}

fn is_system(message: &Value) -> bool {
    message.get("role").and_then(Value::as_str) == Some("system")
}

/// Prints every non-system message, one per line.
fn print_messages<'a>(
    messages: impl Iterator<Item = &'a Value>,
    out: &mut impl Write,
) -> io::Result<()> {
    for message in messages.filter(|m| !is_system(m)) {
        writeln!(out, "{}", format_message(message))?;
    }
    Ok(())
}

/// `role: text` when the message has a role, raw JSON otherwise.
fn format_message(message: &Value) -> String {
    match message.get("role").and_then(Value::as_str) {
        Some(role) => format!("{role}: {}", message_text(message)),
        None => message.to_string(),
    }
}

/// The content, or for an assistant turn without content, its tool calls.
fn message_text(message: &Value) -> String {
    let content = message.get("content").map(display_value).unwrap_or_default();
    if !content.is_empty() {
        return content;
    }
    let Some(calls) = message.get("tool_calls").and_then(Value::as_array) else {
        return String::new();
    };
    calls
        .iter()
        .map(|call| {
            let function = call.get("function");
            let name = function
                .and_then(|f| f.get("name"))
                .map(display_value)
                .unwrap_or_default();
            let arguments = function
                .and_then(|f| f.get("arguments"))
                .map(display_value)
                .unwrap_or_default();
            format!("{name} with {arguments}")
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}
