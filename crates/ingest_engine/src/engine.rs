use std::sync::{mpsc, Arc};
use std::thread;

use ingest_core::{Generation, UploadFile};
use ingest_logging::{ingest_debug, ingest_error};
use tokio_util::sync::CancellationToken;

use crate::upload::{ChannelStepSink, ReqwestUploader, UploadSettings, Uploader};
use crate::{EngineEvent, FailureKind, UploadError};

enum EngineCommand {
    Upload {
        generation: Generation,
        file: UploadFile,
    },
    Cancel {
        generation: Generation,
    },
}

/// Runs uploads on a background tokio runtime and hands events back over a channel.
///
/// At most one upload is live: starting a new one cancels the previous.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(settings: UploadSettings) -> Self {
        Self::with_uploader(Arc::new(ReqwestUploader::new(settings)))
    }

    pub fn with_uploader(uploader: Arc<dyn Uploader>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    ingest_error!("failed to start upload runtime: {}", err);
                    return;
                }
            };
            let mut live: Option<(Generation, CancellationToken)> = None;
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::Upload { generation, file } => {
                        if let Some((previous, token)) = live.take() {
                            ingest_debug!("upload #{} superseded by #{}", previous, generation);
                            token.cancel();
                        }
                        let token = CancellationToken::new();
                        live = Some((generation, token.clone()));
                        let uploader = uploader.clone();
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            run_upload(uploader.as_ref(), generation, file, token, event_tx).await;
                        });
                    }
                    EngineCommand::Cancel { generation } => {
                        if live.as_ref().is_some_and(|(current, _)| *current == generation) {
                            if let Some((_, token)) = live.take() {
                                ingest_debug!("upload #{} cancelled", generation);
                                token.cancel();
                            }
                        }
                    }
                }
            }
        });

        Self { cmd_tx, event_rx }
    }

    pub fn upload(&self, generation: Generation, file: UploadFile) {
        let _ = self
            .cmd_tx
            .send(EngineCommand::Upload { generation, file });
    }

    pub fn cancel(&self, generation: Generation) {
        let _ = self.cmd_tx.send(EngineCommand::Cancel { generation });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Block until the next event. `None` once the engine thread is gone.
    pub fn recv(&self) -> Option<EngineEvent> {
        self.event_rx.recv().ok()
    }
}

async fn run_upload(
    uploader: &dyn Uploader,
    generation: Generation,
    file: UploadFile,
    cancel: CancellationToken,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let result = match tokio::fs::read(&file.path).await {
        Ok(bytes) => {
            let sink = ChannelStepSink::new(generation, event_tx.clone());
            uploader.upload(&file.name, bytes, &sink, &cancel).await
        }
        Err(err) => Err(UploadError::new(
            FailureKind::Io,
            format!("{}: {}", file.path.display(), err),
        )),
    };
    let _ = event_tx.send(EngineEvent::Finished { generation, result });
}
