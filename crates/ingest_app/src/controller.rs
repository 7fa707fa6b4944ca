use std::io::Write;
use std::path::PathBuf;

use anyhow::bail;
use ingest_core::{update, Msg, SessionStatus, UploadFile, UploadState};

use crate::effects::EffectRunner;
use crate::render::TerminalRenderer;

/// Owns the upload session and drives it from engine events.
pub struct UploadController<W: Write> {
    state: UploadState,
    effects: EffectRunner,
    renderer: TerminalRenderer,
    out: W,
}

impl<W: Write> UploadController<W> {
    pub fn new(effects: EffectRunner, out: W) -> Self {
        Self {
            state: UploadState::new(),
            effects,
            renderer: TerminalRenderer::new(),
            out,
        }
    }

    pub fn dispatch(&mut self, msg: Msg) -> anyhow::Result<()> {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let dirty = state.consume_dirty();
        self.state = state;
        self.effects.run(effects);
        if dirty {
            self.renderer.render(&self.state.view(), &mut self.out)?;
        }
        Ok(())
    }

    /// Upload one file, rendering after every event, until the stream ends.
    pub fn run_upload(&mut self, path: PathBuf, export: bool) -> anyhow::Result<SessionStatus> {
        self.dispatch(Msg::FileSelected(Some(UploadFile::from_path(path))))?;
        while self.state.is_active() {
            let Some(msg) = self.effects.next_msg() else {
                bail!("upload engine stopped unexpectedly");
            };
            self.dispatch(msg)?;
        }
        if export {
            self.dispatch(Msg::ExportRequested)?;
        }
        Ok(self.state.status())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;
    use std::sync::Arc;

    use ingest_core::{EventType, StepEvent};
    use ingest_engine::{EngineHandle, StepSink, UploadError, UploadSummary, Uploader};
    use serde_json::json;
    use tempfile::{NamedTempFile, TempDir};
    use tokio_util::sync::CancellationToken;

    use super::*;

    /// Replays a fixed script, then ends with `outcome`.
    struct ScriptedUploader {
        events: Vec<StepEvent>,
        outcome: Result<UploadSummary, UploadError>,
    }

    #[async_trait::async_trait]
    impl Uploader for ScriptedUploader {
        async fn upload(
            &self,
            _file_name: &str,
            _bytes: Vec<u8>,
            sink: &dyn StepSink,
            _cancel: &CancellationToken,
        ) -> Result<UploadSummary, UploadError> {
            for event in &self.events {
                sink.emit(event.clone());
            }
            self.outcome.clone()
        }
    }

    fn controller(
        uploader: ScriptedUploader,
        export: Option<PathBuf>,
    ) -> UploadController<Vec<u8>> {
        let engine = EngineHandle::with_uploader(Arc::new(uploader));
        UploadController::new(EffectRunner::new(engine, export), Vec::new())
    }

    fn input_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"contract").unwrap();
        file
    }

    #[test]
    fn successful_upload_renders_and_exports() {
        let events = vec![
            StepEvent::new("Get_Document_Content", EventType::Waiting, json!({})),
            StepEvent::new("Get_Document_Content", EventType::Result, json!({"slate": {}})),
            StepEvent::new("Summarize", EventType::Log, json!("short summary")),
        ];
        let dir = TempDir::new().unwrap();
        let export = dir.path().join("data.json");
        let mut controller = controller(
            ScriptedUploader {
                events: events.clone(),
                outcome: Ok(UploadSummary { frames: 3, events: 3 }),
            },
            Some(export.clone()),
        );
        let input = input_file();

        let status = controller
            .run_upload(input.path().to_path_buf(), true)
            .unwrap();

        assert_eq!(status, SessionStatus::Completed);
        assert_eq!(controller.state.log(), events.as_slice());
        assert!(controller.state.pending().is_empty());
        let printed = String::from_utf8(controller.out.clone()).unwrap();
        assert!(printed.contains("... Get_Document_Content: in progress"));
        assert!(printed.contains("Summarize LOG\n    short summary"));
        assert!(printed.contains("Upload complete (3 events)"));

        let exported: Vec<StepEvent> =
            serde_json::from_str(&std::fs::read_to_string(export).unwrap()).unwrap();
        assert_eq!(exported, events);
    }

    #[test]
    fn failed_upload_keeps_partial_progress() {
        let events = vec![StepEvent::new("Parse", EventType::Waiting, json!({}))];
        let mut controller = controller(
            ScriptedUploader {
                events,
                outcome: Err(UploadError::new(
                    ingest_engine::FailureKind::Parse,
                    "expected value at line 1 column 2",
                )),
            },
            None,
        );
        let input = input_file();

        let status = controller
            .run_upload(input.path().to_path_buf(), false)
            .unwrap();

        assert_eq!(status, SessionStatus::Failed);
        assert_eq!(controller.state.log().len(), 1);
        assert_eq!(controller.state.pending().len(), 1);
        let printed = String::from_utf8(controller.out.clone()).unwrap();
        assert!(printed.contains("Upload failed after 1 events: parse error"));
    }
}
