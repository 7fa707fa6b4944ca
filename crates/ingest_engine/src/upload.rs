use std::pin::pin;
use std::time::Duration;

use futures_util::StreamExt;
use ingest_core::{parse_step_event, Generation, StepEvent};
use ingest_logging::{ingest_debug, ingest_info, ingest_warn};
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::frame::{FrameDecoder, FramingError};
use crate::{EngineEvent, FailureKind, UploadError, UploadSummary};

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub endpoint: String,
    pub connect_timeout: Duration,
    pub query: Vec<(String, String)>,
    pub form_field: String,
    pub max_frame_bytes: usize,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3000/api/upload".to_string(),
            connect_timeout: Duration::from_secs(10),
            query: vec![("select-openai".to_string(), "true".to_string())],
            form_field: "file".to_string(),
            max_frame_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Receives each event as soon as it is parsed.
pub trait StepSink: Send + Sync {
    fn emit(&self, event: StepEvent);
}

pub struct ChannelStepSink {
    generation: Generation,
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelStepSink {
    pub fn new(generation: Generation, tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { generation, tx }
    }
}

impl StepSink for ChannelStepSink {
    fn emit(&self, event: StepEvent) {
        let _ = self.tx.send(EngineEvent::Step {
            generation: self.generation,
            event,
        });
    }
}

#[async_trait::async_trait]
pub trait Uploader: Send + Sync {
    /// Upload one file and stream its step events into `sink` until the
    /// response ends, a fatal error occurs, or `cancel` fires.
    async fn upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        sink: &dyn StepSink,
        cancel: &CancellationToken,
    ) -> Result<UploadSummary, UploadError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestUploader {
    settings: UploadSettings,
}

impl ReqwestUploader {
    pub fn new(settings: UploadSettings) -> Self {
        Self { settings }
    }

    fn endpoint_url(&self) -> Result<Url, UploadError> {
        let mut url = Url::parse(&self.settings.endpoint)
            .map_err(|err| UploadError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if !self.settings.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.settings.query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn build_client(&self) -> Result<reqwest::Client, UploadError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .build()
            .map_err(|err| UploadError::new(FailureKind::Transport, err.to_string()))
    }
}

#[async_trait::async_trait]
impl Uploader for ReqwestUploader {
    async fn upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        sink: &dyn StepSink,
        cancel: &CancellationToken,
    ) -> Result<UploadSummary, UploadError> {
        let url = self.endpoint_url()?;
        let client = self.build_client()?;
        ingest_info!("uploading {} ({} bytes) to {}", file_name, bytes.len(), url);

        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let form = Form::new().part(self.settings.form_field.clone(), part);
        let request = client
            .post(url)
            .header(ACCEPT, "text/event-stream")
            .multipart(form)
            .send();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            response = request => response.map_err(map_reqwest_error)?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.canonical_reason().unwrap_or("request failed"),
            ));
        }
        if matches!(status, StatusCode::NO_CONTENT | StatusCode::RESET_CONTENT) {
            return Err(UploadError::new(FailureKind::MissingBody, status.to_string()));
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other));
        let mut frames = pin!(FramedRead::new(
            StreamReader::new(body),
            FrameDecoder::new(self.settings.max_frame_bytes),
        ));

        let mut summary = UploadSummary {
            frames: 0,
            events: 0,
        };
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled()),
                next = frames.next() => next,
            };
            let Some(frame) = next else {
                break;
            };
            let frame = frame.map_err(map_framing_error)?;
            summary.frames += 1;

            let event = parse_step_event(&frame.data).map_err(|err| {
                ingest_warn!("halting upload of {}: {}", file_name, err);
                UploadError::new(FailureKind::Parse, err.to_string())
            })?;
            ingest_debug!("frame {} -> {} {}", summary.frames, event.step, event.event_type);
            sink.emit(event);
            summary.events += 1;
        }

        ingest_info!(
            "upload of {} finished after {} events",
            file_name,
            summary.events
        );
        Ok(summary)
    }
}

fn cancelled() -> UploadError {
    UploadError::new(FailureKind::Cancelled, "upload superseded")
}

fn map_reqwest_error(err: reqwest::Error) -> UploadError {
    if err.is_timeout() {
        return UploadError::new(FailureKind::Timeout, err.to_string());
    }
    UploadError::new(FailureKind::Transport, err.to_string())
}

fn map_framing_error(err: FramingError) -> UploadError {
    match err {
        FramingError::Io(io_err) => {
            let transport = io_err
                .get_ref()
                .and_then(|inner| inner.downcast_ref::<reqwest::Error>())
                .map(|reqwest_err| (reqwest_err.is_timeout(), reqwest_err.to_string()));
            match transport {
                Some((true, message)) => UploadError::new(FailureKind::Timeout, message),
                Some((false, message)) => UploadError::new(FailureKind::Transport, message),
                None => UploadError::new(FailureKind::Transport, io_err.to_string()),
            }
        }
        other => UploadError::new(FailureKind::Framing, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_carries_configured_query() {
        let uploader = ReqwestUploader::new(UploadSettings::default());
        let url = uploader.endpoint_url().unwrap();
        assert_eq!(url.query(), Some("select-openai=true"));
    }

    #[test]
    fn empty_query_leaves_url_untouched() {
        let uploader = ReqwestUploader::new(UploadSettings {
            endpoint: "http://example.com/api/upload".to_string(),
            query: Vec::new(),
            ..UploadSettings::default()
        });
        assert_eq!(
            uploader.endpoint_url().unwrap().as_str(),
            "http://example.com/api/upload"
        );
    }

    #[test]
    fn bad_endpoint_is_invalid_url() {
        let uploader = ReqwestUploader::new(UploadSettings {
            endpoint: "not a url".to_string(),
            ..UploadSettings::default()
        });
        assert_eq!(uploader.endpoint_url().unwrap_err().kind, FailureKind::InvalidUrl);
    }

    #[test]
    fn size_errors_are_framing_failures() {
        let err = map_framing_error(FramingError::FrameTooLarge { max_bytes: 4 });
        assert_eq!(err.kind, FailureKind::Framing);
    }
}
