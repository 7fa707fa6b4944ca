#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User picked a file (or dismissed the picker with nothing selected).
    FileSelected(Option<crate::UploadFile>),
    /// Engine decoded and parsed one event for an upload.
    StepReceived {
        generation: crate::Generation,
        event: crate::StepEvent,
    },
    /// Engine finished an upload, with the fatal failure if there was one.
    UploadFinished {
        generation: crate::Generation,
        failure: Option<crate::UploadFailure>,
    },
    /// User asked to download the accumulated log.
    ExportRequested,
    /// Fallback for placeholder wiring.
    NoOp,
}
