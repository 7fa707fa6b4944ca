use ingest_logging::{ingest_debug, ingest_error, ingest_info, ingest_warn};

use crate::{export_snapshot, Effect, Msg, UploadState};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: UploadState, msg: Msg) -> (UploadState, Vec<Effect>) {
    let effects = match msg {
        Msg::FileSelected(None) => Vec::new(),
        Msg::FileSelected(Some(file)) => {
            let mut effects = Vec::with_capacity(2);
            if state.is_active() {
                // The previous stream must not feed the reset session.
                effects.push(Effect::CancelUpload {
                    generation: state.generation(),
                });
            }
            let generation = state.begin_upload(file.name.clone());
            ingest_info!("upload #{} started for {}", generation, file.name);
            effects.push(Effect::StartUpload { generation, file });
            effects
        }
        Msg::StepReceived { generation, event } => {
            if generation != state.generation() || !state.is_active() {
                ingest_debug!(
                    "dropping stale event from upload #{} (current #{})",
                    generation,
                    state.generation()
                );
                return (state, Vec::new());
            }
            ingest_debug!("upload #{} event {} {}", generation, event.step, event.event_type);
            state.apply_event(event);
            Vec::new()
        }
        Msg::UploadFinished {
            generation,
            failure,
        } => {
            if generation != state.generation() || !state.is_active() {
                return (state, Vec::new());
            }
            match &failure {
                Some(failure) => ingest_warn!("upload #{} failed: {}", generation, failure),
                None => ingest_info!(
                    "upload #{} completed with {} events",
                    generation,
                    state.log().len()
                ),
            }
            state.finish(failure);
            Vec::new()
        }
        Msg::ExportRequested => {
            if state.log().is_empty() {
                return (state, Vec::new());
            }
            match export_snapshot(state.log()) {
                Ok(snapshot) => vec![Effect::WriteExport { snapshot }],
                Err(err) => {
                    ingest_error!("failed to serialize activity log: {}", err);
                    Vec::new()
                }
            }
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
