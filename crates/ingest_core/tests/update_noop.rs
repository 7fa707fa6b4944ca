use ingest_core::{update, Msg, UploadState};

#[test]
fn update_is_noop() {
    let state = UploadState::new();
    let (next, effects) = update(state.clone(), Msg::NoOp);

    assert_eq!(state, next);
    assert!(effects.is_empty());
}

#[test]
fn file_selected_without_file_is_noop() {
    let state = UploadState::new();
    let (mut next, effects) = update(state.clone(), Msg::FileSelected(None));

    assert_eq!(state, next);
    assert!(effects.is_empty());
    assert!(!next.consume_dirty());
}
