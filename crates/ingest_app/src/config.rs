//! Settings resolution: CLI flags and environment, then `ingest.ron`, then defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use ingest_engine::{ApiSettings, UploadSettings};
use serde::{Deserialize, Serialize};

use crate::cli::GlobalArgs;
use crate::session::SESSION_FILENAME;

const DEFAULT_CONFIG_FILENAME: &str = "ingest.ron";
const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_UPLOAD_PATH: &str = "/api/upload";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub upload_path: Option<String>,
    pub upload_query: Option<Vec<(String, String)>>,
    pub connect_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub max_frame_bytes: Option<usize>,
    pub log_file: Option<PathBuf>,
    pub session_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub upload: UploadSettings,
    pub api: ApiSettings,
    pub log_file: Option<PathBuf>,
    pub session_file: PathBuf,
    /// The config file that was read, if any. Logged once logging is up.
    pub source: Option<PathBuf>,
}

pub fn load(args: &GlobalArgs) -> anyhow::Result<AppConfig> {
    let source = match &args.config {
        Some(path) => Some(path.clone()),
        None => Some(PathBuf::from(DEFAULT_CONFIG_FILENAME)).filter(|path| path.exists()),
    };
    let file = match &source {
        Some(path) => read_config(path)?,
        None => FileConfig::default(),
    };
    let mut config = resolve(args, file);
    config.source = source;
    Ok(config)
}

fn read_config(path: &Path) -> anyhow::Result<FileConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = ron::from_str(&text)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    Ok(config)
}

fn resolve(args: &GlobalArgs, file: FileConfig) -> AppConfig {
    let base_url = args
        .base_url
        .clone()
        .or(file.base_url)
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let upload_path = file
        .upload_path
        .unwrap_or_else(|| DEFAULT_UPLOAD_PATH.to_string());

    let mut upload = UploadSettings {
        endpoint: join_url(&base_url, &upload_path),
        ..UploadSettings::default()
    };
    if let Some(query) = file.upload_query {
        upload.query = query;
    }
    if let Some(secs) = file.connect_timeout_secs {
        upload.connect_timeout = Duration::from_secs(secs);
    }
    if let Some(max) = file.max_frame_bytes {
        upload.max_frame_bytes = max;
    }

    let mut api = ApiSettings {
        base_url,
        ..ApiSettings::default()
    };
    if let Some(secs) = file.request_timeout_secs {
        api.request_timeout = Duration::from_secs(secs);
    }

    AppConfig {
        upload,
        api,
        log_file: args.log_file.clone().or(file.log_file),
        session_file: file
            .session_file
            .unwrap_or_else(|| PathBuf::from(SESSION_FILENAME)),
        source: None,
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
