use std::path::PathBuf;

use ingest_core::{Effect, Msg};
use ingest_engine::{EngineEvent, EngineHandle, ExportWriter};
use ingest_logging::{ingest_error, ingest_info, ingest_warn};

/// Executes core effects against the engine and the filesystem.
pub struct EffectRunner {
    engine: EngineHandle,
    export_target: Option<PathBuf>,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, export_target: Option<PathBuf>) -> Self {
        Self {
            engine,
            export_target,
        }
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartUpload { generation, file } => {
                    ingest_info!(
                        "StartUpload generation={} file={}",
                        generation,
                        file.path.display()
                    );
                    self.engine.upload(generation, file);
                }
                Effect::CancelUpload { generation } => {
                    ingest_info!("CancelUpload generation={}", generation);
                    self.engine.cancel(generation);
                }
                Effect::WriteExport { snapshot } => self.write_export(&snapshot),
            }
        }
    }

    /// Block for the next engine event, translated into a core message.
    pub fn next_msg(&self) -> Option<Msg> {
        self.engine.recv().map(map_engine_event)
    }

    fn write_export(&self, snapshot: &str) {
        let Some(target) = &self.export_target else {
            ingest_warn!("export requested without a target path");
            return;
        };
        let (writer, filename) = ExportWriter::for_target(target);
        if let Err(err) = writer.write(&filename, snapshot) {
            ingest_error!("Failed to write activity log to {:?}: {}", target, err);
        }
    }
}

pub fn map_engine_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Step { generation, event } => Msg::StepReceived { generation, event },
        EngineEvent::Finished { generation, result } => Msg::UploadFinished {
            generation,
            failure: result.err().and_then(|err| err.to_failure()),
        },
    }
}
