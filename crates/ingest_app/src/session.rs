//! Chat session cookie persistence between runs.

use std::fs;
use std::path::Path;

use ingest_engine::ExportWriter;
use ingest_logging::{ingest_debug, ingest_error, ingest_info, ingest_warn};
use serde::{Deserialize, Serialize};

pub const SESSION_FILENAME: &str = ".ingest_session.ron";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StoredSession {
    base_url: String,
    cookies: String,
}

/// Cookies saved for `base_url`, if any. A session saved for another server
/// is ignored.
pub fn load_session(path: &Path, base_url: &str) -> Option<String> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
        Err(err) => {
            ingest_warn!("Failed to read chat session from {:?}: {}", path, err);
            return None;
        }
    };
    let session: StoredSession = match ron::from_str(&content) {
        Ok(session) => session,
        Err(err) => {
            ingest_warn!("Failed to parse chat session from {:?}: {}", path, err);
            return None;
        }
    };
    if session.base_url != base_url {
        ingest_debug!(
            "ignoring chat session for {} (current server {})",
            session.base_url,
            base_url
        );
        return None;
    }
    ingest_info!("Loaded chat session from {:?}", path);
    Some(session.cookies)
}

pub fn save_session(path: &Path, base_url: &str, cookies: &str) {
    let session = StoredSession {
        base_url: base_url.to_string(),
        cookies: cookies.to_string(),
    };
    let content = match ron::ser::to_string_pretty(&session, ron::ser::PrettyConfig::new()) {
        Ok(text) => text,
        Err(err) => {
            ingest_error!("Failed to serialize chat session: {}", err);
            return;
        }
    };
    let (writer, filename) = ExportWriter::for_target(path);
    if let Err(err) = writer.write(&filename, &content) {
        ingest_error!("Failed to write chat session to {:?}: {}", path, err);
    }
}
