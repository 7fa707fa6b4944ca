#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    CancelUpload {
        generation: crate::Generation,
    },
    StartUpload {
        generation: crate::Generation,
        file: crate::UploadFile,
    },
    WriteExport {
        snapshot: String,
    },
}
