use ekho_core::{update, AppState, Msg, PollPolicy, Session};

#[test]
fn update_is_noop() {
    let state = AppState::new(Session::new("user_42"), PollPolicy::default());
    let (next, effects) = update(state.clone(), Msg::NoOp);

    assert_eq!(state, next);
    assert!(effects.is_empty());
}
