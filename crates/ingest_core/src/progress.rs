use ingest_logging::ingest_debug;

use crate::StepEvent;

/// A step with an unanswered `WAITING` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingStep {
    pub step: String,
}

/// Accumulated log and in-flight steps of one upload.
///
/// The log is append-only. `pending` keeps insertion order and holds each
/// step name at most once.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressState {
    log: Vec<StepEvent>,
    pending: Vec<PendingStep>,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> &[StepEvent] {
        &self.log
    }

    pub fn pending(&self) -> &[PendingStep] {
        &self.pending
    }

    pub fn is_pending(&self, step: &str) -> bool {
        self.pending.iter().any(|p| p.step == step)
    }
}

/// Fold one event into the progress state.
pub fn reduce(mut state: ProgressState, event: StepEvent) -> ProgressState {
    if event.event_type.is_waiting() {
        if !state.is_pending(&event.step) {
            ingest_debug!("step {} waiting", event.step);
            state.pending.push(PendingStep {
                step: event.step.clone(),
            });
        }
    } else {
        let before = state.pending.len();
        state.pending.retain(|p| p.step != event.step);
        if state.pending.len() != before {
            ingest_debug!("step {} settled with {}", event.step, event.event_type);
        }
    }
    state.log.push(event);
    state
}
