//! Ingest engine: upload transport, event-stream framing and effect execution.
mod api;
mod engine;
mod export;
mod frame;
mod types;
mod upload;

pub use api::{ApiClient, ApiError, ApiSettings, ConversationEngine, GraphStore};
pub use engine::EngineHandle;
pub use export::{ExportError, ExportWriter};
pub use frame::{Frame, FrameDecoder, FramingError};
pub use types::{EngineEvent, FailureKind, UploadError, UploadSummary};
pub use upload::{ChannelStepSink, ReqwestUploader, StepSink, UploadSettings, Uploader};
