use std::fmt;
use std::path::{Path, PathBuf};

use crate::progress::{reduce, PendingStep, ProgressState};
use crate::render::build_view;
use crate::view_model::ActivityView;
use crate::StepEvent;

/// Monotonic upload counter; events tagged with an older value are stale.
pub type Generation = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    Uploading,
    Completed,
    Failed,
}

/// A file chosen for upload. Reading it is the engine's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub path: PathBuf,
    pub name: String,
}

impl UploadFile {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Self { path, name }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Transport,
    Framing,
    Parse,
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureClass::Transport => write!(f, "transport error"),
            FailureClass::Framing => write!(f, "framing error"),
            FailureClass::Parse => write!(f, "parse error"),
        }
    }
}

/// Fatal outcome of an upload, shown to the user once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
    pub class: FailureClass,
    pub message: String,
}

impl fmt::Display for UploadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.class, self.message)
    }
}

/// The upload session owned by the controller.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UploadState {
    generation: Generation,
    status: SessionStatus,
    file_name: Option<String>,
    progress: ProgressState,
    failure: Option<UploadFailure>,
    dirty: bool,
}

impl UploadState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> ActivityView {
        build_view(self)
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Uploading
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn log(&self) -> &[StepEvent] {
        self.progress.log()
    }

    pub fn pending(&self) -> &[PendingStep] {
        self.progress.pending()
    }

    pub fn failure(&self) -> Option<&UploadFailure> {
        self.failure.as_ref()
    }

    /// Returns whether the state changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn begin_upload(&mut self, file_name: String) -> Generation {
        self.generation += 1;
        self.status = SessionStatus::Uploading;
        self.file_name = Some(file_name);
        self.progress = ProgressState::new();
        self.failure = None;
        self.dirty = true;
        self.generation
    }

    pub(crate) fn apply_event(&mut self, event: StepEvent) {
        let progress = std::mem::take(&mut self.progress);
        self.progress = reduce(progress, event);
        self.dirty = true;
    }

    pub(crate) fn finish(&mut self, failure: Option<UploadFailure>) {
        self.status = if failure.is_some() {
            SessionStatus::Failed
        } else {
            SessionStatus::Completed
        };
        self.failure = failure;
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_file_takes_name_from_path() {
        let file = UploadFile::from_path("/tmp/contracts/lease.pdf");
        assert_eq!(file.name, "lease.pdf");
        assert_eq!(file.path, PathBuf::from("/tmp/contracts/lease.pdf"));
    }

    #[test]
    fn failure_display_includes_class() {
        let failure = UploadFailure {
            class: FailureClass::Transport,
            message: "http status 502".to_string(),
        };
        assert_eq!(failure.to_string(), "transport error: http status 502");
    }
}
