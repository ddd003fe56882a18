use std::path::PathBuf;

use ekho_core::{
    update, ApiFailure, AppState, Effect, HealthReport, JobListing, JobStatus, JobStatusSnapshot,
    Msg, PollPolicy, Session, UiError, VoiceClone, VoiceCloneRequest,
};

fn new_state() -> AppState {
    AppState::new(Session::new("user_42"), PollPolicy::default())
}

#[test]
fn voice_clone_round_trip() {
    let request = VoiceCloneRequest {
        audio_path: PathBuf::from("sample.wav"),
    };
    let (state, effects) = update(new_state(), Msg::VoiceCloneSubmitted(request));
    assert_eq!(
        effects,
        vec![Effect::CloneVoice {
            user_id: "user_42".to_string(),
            audio_path: PathBuf::from("sample.wav"),
        }]
    );
    assert!(!state.is_settled());

    let clone = VoiceClone {
        user_id: "user_42".to_string(),
        voice_id: "voice_abc".to_string(),
        status: "cloned".to_string(),
    };
    let (state, effects) = update(state, Msg::VoiceCloned(Ok(clone.clone())));
    assert!(effects.is_empty());
    assert_eq!(state.view().voice, Some(clone));
    assert!(state.is_settled());
}

#[test]
fn voice_clone_without_file_is_rejected() {
    let request = VoiceCloneRequest {
        audio_path: PathBuf::new(),
    };
    let (state, effects) = update(new_state(), Msg::VoiceCloneSubmitted(request));
    assert!(effects.is_empty());
    assert!(matches!(state.view().voice_error, Some(UiError::Validation(_))));
}

#[test]
fn health_check_is_deduplicated_and_reports_failure() {
    let (state, effects) = update(new_state(), Msg::HealthRequested);
    assert_eq!(effects, vec![Effect::CheckHealth]);
    let (state, effects) = update(state, Msg::HealthRequested);
    assert!(effects.is_empty());

    let (state, _) = update(
        state,
        Msg::HealthChecked(Err(ApiFailure::new(None, "Could not connect to server"))),
    );
    assert!(matches!(state.view().health_error, Some(UiError::Transport(_))));

    let (state, _) = update(state, Msg::HealthRequested);
    let report = HealthReport {
        status: "healthy".to_string(),
        service: "ekho-api".to_string(),
        timestamp: None,
        cloud_connected: true,
    };
    let (state, _) = update(state, Msg::HealthChecked(Ok(report.clone())));
    let view = state.view();
    assert_eq!(view.health, Some(report));
    assert_eq!(view.health_error, None);
}

#[test]
fn job_listing_is_stored() {
    let (state, effects) = update(new_state(), Msg::JobListRequested);
    assert_eq!(
        effects,
        vec![Effect::ListJobs {
            user_id: "user_42".to_string()
        }]
    );
    let listing = JobListing {
        user_id: "user_42".to_string(),
        jobs: vec![JobStatusSnapshot::new(
            "veo_1",
            JobStatus::Processing,
            10,
            None,
            None,
        )],
    };
    let (state, _) = update(state, Msg::JobListLoaded(Ok(listing.clone())));
    assert_eq!(state.view().listing, Some(listing));
    assert!(state.is_settled());
}
