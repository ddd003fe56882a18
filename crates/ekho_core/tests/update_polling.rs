use std::sync::Once;
use std::time::Duration;

use ekho_core::{
    update, ApiFailure, AppState, AvatarRequest, CreationAck, Effect, JobId, JobPhase, JobStatus,
    JobStatusSnapshot, Msg, PollPolicy, Session, UiError,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(ekho_logging::initialize_for_tests);
}

const JOB: &str = "veo_user_42_ab12";

fn job_id() -> JobId {
    JobId::parse(JOB).unwrap()
}

/// State with an armed avatar job.
fn armed_state(policy: PollPolicy) -> AppState {
    let state = AppState::new(Session::new("user_42"), policy);
    let request = AvatarRequest {
        face_captures: vec!["a".into(), "b".into(), "c".into()],
        age_years: 5,
    };
    let (state, _) = update(state, Msg::AvatarSubmitted(request));
    let (state, effects) = update(
        state,
        Msg::AvatarCreated(Ok(CreationAck {
            job_id: Some(JOB.to_string()),
            status: Some(JobStatus::Pending),
            message: None,
            estimated_seconds: None,
        })),
    );
    assert!(matches!(effects.as_slice(), [Effect::StartPoller { .. }]));
    state
}

fn tick(state: AppState) -> (AppState, Vec<Effect>) {
    update(state, Msg::PollTick { job_id: job_id() })
}

fn fetched(state: AppState, snapshot: JobStatusSnapshot) -> (AppState, Vec<Effect>) {
    update(
        state,
        Msg::StatusFetched {
            job_id: job_id(),
            result: Ok(snapshot),
        },
    )
}

fn fetch_failed(state: AppState, detail: &str) -> (AppState, Vec<Effect>) {
    update(
        state,
        Msg::StatusFetched {
            job_id: job_id(),
            result: Err(ApiFailure::new(None, detail)),
        },
    )
}

#[test]
fn tick_issues_fetch_and_progress_is_reconciled() {
    init_logging();
    let (state, effects) = tick(armed_state(PollPolicy::default()));
    assert_eq!(effects, vec![Effect::FetchStatus { job_id: job_id() }]);

    let (state, effects) = fetched(
        state,
        JobStatusSnapshot::new(JOB, JobStatus::Processing, 40, None, None),
    );
    assert!(effects.is_empty());
    let job = state.view().avatar.job.unwrap();
    assert_eq!(job.status, JobStatus::Processing);
    assert_eq!(job.progress, 40);
    assert_eq!(job.phase, JobPhase::Active);
}

#[test]
fn tick_is_skipped_while_query_in_flight() {
    init_logging();
    let (state, first) = tick(armed_state(PollPolicy::default()));
    assert_eq!(first.len(), 1);

    let (state, second) = tick(state);
    assert!(second.is_empty());

    let (state, _) = fetched(
        state,
        JobStatusSnapshot::new(JOB, JobStatus::Processing, 10, None, None),
    );
    let (_state, third) = tick(state);
    assert_eq!(third, vec![Effect::FetchStatus { job_id: job_id() }]);
}

#[test]
fn completion_stops_polling_and_later_ticks_fetch_nothing() {
    init_logging();
    let (state, _) = tick(armed_state(PollPolicy::default()));
    let (state, effects) = fetched(
        state,
        JobStatusSnapshot::new(
            JOB,
            JobStatus::Completed,
            100,
            Some("https://x/video.mp4".into()),
            None,
        ),
    );
    assert_eq!(effects, vec![Effect::StopPoller { job_id: job_id() }]);

    let job = state.view().avatar.job.unwrap();
    assert_eq!(job.result_url.as_deref(), Some("https://x/video.mp4"));
    assert_eq!(job.phase, JobPhase::Terminal);
    assert!(state.is_settled());

    let (state, effects) = tick(state);
    assert!(!effects
        .iter()
        .any(|effect| matches!(effect, Effect::FetchStatus { .. })));

    // A late answer for the finished job changes nothing.
    let before = state.view().avatar.job;
    let (state, effects) = fetched(
        state,
        JobStatusSnapshot::new(JOB, JobStatus::Failed, 0, None, Some("late".into())),
    );
    assert!(effects.is_empty());
    assert_eq!(state.view().avatar.job, before);
}

#[test]
fn service_failure_is_a_job_failure() {
    init_logging();
    let (state, _) = tick(armed_state(PollPolicy::default()));
    let (state, effects) = fetched(
        state,
        JobStatusSnapshot::new(JOB, JobStatus::Failed, 0, None, Some("safety filter".into())),
    );
    assert_eq!(effects, vec![Effect::StopPoller { job_id: job_id() }]);
    let job = state.view().avatar.job.unwrap();
    assert_eq!(job.error, Some(UiError::JobFailure("safety filter".into())));
}

#[test]
fn single_fetch_failure_is_terminal_by_default() {
    init_logging();
    let (state, _) = tick(armed_state(PollPolicy::default()));
    let (state, effects) = fetch_failed(state, "connection refused");

    assert_eq!(effects, vec![Effect::StopPoller { job_id: job_id() }]);
    let job = state.view().avatar.job.unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.phase, JobPhase::Terminal);
    assert_eq!(
        job.error,
        Some(UiError::Transport("connection refused".into()))
    );
}

#[test]
fn bounded_retry_tolerates_transient_failures() {
    init_logging();
    let policy = PollPolicy {
        interval: Duration::from_secs(1),
        max_consecutive_failures: 3,
    };
    let (state, _) = tick(armed_state(policy));
    let (state, effects) = fetch_failed(state, "timeout");
    assert!(effects.is_empty());
    assert_eq!(state.view().avatar.job.unwrap().phase, JobPhase::Active);

    // Success resets the counter.
    let (state, _) = tick(state);
    let (state, _) = fetched(
        state,
        JobStatusSnapshot::new(JOB, JobStatus::Processing, 20, None, None),
    );
    let (state, _) = tick(state);
    let (state, effects) = fetch_failed(state, "timeout");
    assert!(effects.is_empty());
    let (state, _) = tick(state);
    let (state, effects) = fetch_failed(state, "timeout");
    assert!(effects.is_empty());
    let (state, _) = tick(state);
    let (state, effects) = fetch_failed(state, "timeout");
    assert_eq!(effects, vec![Effect::StopPoller { job_id: job_id() }]);
    assert_eq!(state.view().avatar.job.unwrap().status, JobStatus::Failed);
}

#[test]
fn unknown_job_tick_stops_orphan_timer() {
    init_logging();
    let state = AppState::new(Session::new("user_42"), PollPolicy::default());
    let (_state, effects) = tick(state);
    assert_eq!(effects, vec![Effect::StopPoller { job_id: job_id() }]);
}

#[test]
fn teardown_stops_all_pollers_once() {
    init_logging();
    let (state, effects) = update(armed_state(PollPolicy::default()), Msg::Teardown);
    assert_eq!(effects, vec![Effect::StopAllPollers]);

    let (state, effects) = update(state, Msg::Teardown);
    assert!(effects.is_empty());
    let (_state, effects) = tick(state);
    assert!(effects.is_empty());
}
