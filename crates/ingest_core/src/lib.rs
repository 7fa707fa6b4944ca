//! Ingest core: pure upload-progress state machine and view-model helpers.
mod effect;
mod event;
mod msg;
mod progress;
mod render;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use event::{parse_step_event, EventType, ParseError, StepEvent};
pub use msg::Msg;
pub use progress::{reduce, PendingStep, ProgressState};
pub use render::{classify, export_snapshot, RenderRule, StepMatcher, RENDER_RULES};
pub use state::{
    FailureClass, Generation, SessionStatus, UploadFailure, UploadFile, UploadState,
};
pub use update::update;
pub use view_model::{
    ActivityRow, ActivityView, ClauseRow, ClauseTable, DocumentView, InProgressIndicator,
    ReadMore, Rendering, EXPORT_FILENAME, READ_MORE_LIMIT,
};
