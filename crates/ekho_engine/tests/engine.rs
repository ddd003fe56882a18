use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use ekho_engine::{
    ApiError, AvatarJobBody, ChatBody, ChatReplyBody, CreationReply, EkhoApi, EngineCommand,
    EngineEvent, EngineHandle, FailureKind, HealthReply, JobListReply, StatusReply, VideoJobBody,
    VoiceCloneReply, VoiceUpload,
};
use tempfile::TempDir;

#[derive(Default)]
struct FakeApi {
    uploads: Mutex<Vec<VoiceUpload>>,
}

#[async_trait]
impl EkhoApi for FakeApi {
    async fn create_avatar_job(&self, body: &AvatarJobBody) -> Result<CreationReply, ApiError> {
        Ok(CreationReply {
            job_id: Some(format!("veo_{}", body.user_id)),
            status: Some("submitted".into()),
            ..CreationReply::default()
        })
    }

    async fn create_video_job(&self, _body: &VideoJobBody) -> Result<CreationReply, ApiError> {
        Err(ApiError::new(FailureKind::HttpStatus(500), "Veo quota exceeded"))
    }

    async fn job_status(&self, job_id: &str) -> Result<StatusReply, ApiError> {
        Ok(StatusReply {
            job_id: Some(job_id.to_string()),
            status: "processing".into(),
            progress: Some(10),
            ..StatusReply::default()
        })
    }

    async fn send_chat(&self, body: &ChatBody) -> Result<ChatReplyBody, ApiError> {
        Ok(ChatReplyBody {
            text: format!("echo: {}", body.message),
            ..ChatReplyBody::default()
        })
    }

    async fn clone_voice(
        &self,
        user_id: &str,
        upload: VoiceUpload,
    ) -> Result<VoiceCloneReply, ApiError> {
        self.uploads.lock().unwrap().push(upload);
        Ok(VoiceCloneReply {
            user_id: user_id.to_string(),
            voice_id: "voice_1".into(),
            status: "cloned".into(),
        })
    }

    async fn health(&self) -> Result<HealthReply, ApiError> {
        Err(ApiError::new(FailureKind::Network, "connection refused"))
    }

    async fn user_jobs(&self, user_id: &str) -> Result<JobListReply, ApiError> {
        Ok(JobListReply {
            user_id: user_id.to_string(),
            jobs: Vec::new(),
            count: 0,
        })
    }
}

fn next_event(engine: &EngineHandle) -> EngineEvent {
    engine
        .recv_timeout(Duration::from_secs(5))
        .expect("engine event")
}

/// Collect events for `window`.
fn drain_for(engine: &EngineHandle, window: Duration) -> Vec<EngineEvent> {
    let deadline = Instant::now() + window;
    let mut events = Vec::new();
    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        match engine.recv_timeout(remaining) {
            Some(event) => events.push(event),
            None => break,
        }
    }
    events
}

#[test]
fn requests_are_answered_with_events() {
    let engine = EngineHandle::new(Arc::new(FakeApi::default())).unwrap();

    engine.send(EngineCommand::CreateAvatar(AvatarJobBody {
        user_id: "user_42".into(),
        face_captures: vec!["a".into(); 3],
        age_progression_years: 5,
    }));
    match next_event(&engine) {
        EngineEvent::AvatarCreated(Ok(reply)) => {
            assert_eq!(reply.job_id.as_deref(), Some("veo_user_42"))
        }
        other => panic!("unexpected event {other:?}"),
    }

    engine.send(EngineCommand::SendChat {
        entry_id: 9,
        body: ChatBody {
            user_id: "user_42".into(),
            message: "hello".into(),
            make_video: false,
        },
    });
    match next_event(&engine) {
        EngineEvent::ChatReplied { entry_id, result } => {
            assert_eq!(entry_id, 9);
            assert_eq!(result.unwrap().text, "echo: hello");
        }
        other => panic!("unexpected event {other:?}"),
    }

    engine.send(EngineCommand::CheckHealth);
    match next_event(&engine) {
        EngineEvent::HealthChecked(Err(err)) => assert_eq!(err.kind, FailureKind::Network),
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn status_fetch_reports_job_id() {
    let engine = EngineHandle::new(Arc::new(FakeApi::default())).unwrap();
    engine.send(EngineCommand::FetchStatus {
        job_id: "veo_1".into(),
    });
    match next_event(&engine) {
        EngineEvent::StatusFetched { job_id, result } => {
            assert_eq!(job_id, "veo_1");
            assert_eq!(result.unwrap().progress, Some(10));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn poller_commands_drive_ticks() {
    let engine = EngineHandle::new(Arc::new(FakeApi::default())).unwrap();
    engine.send(EngineCommand::StartPoller {
        job_id: "veo_1".into(),
        interval: Duration::from_millis(20),
    });
    let events = drain_for(&engine, Duration::from_millis(120));
    assert!(events
        .iter()
        .any(|event| matches!(event, EngineEvent::PollTick { job_id } if job_id == "veo_1")));

    engine.send(EngineCommand::StopAllPollers);
    let _ = drain_for(&engine, Duration::from_millis(40));
    assert!(drain_for(&engine, Duration::from_millis(80)).is_empty());
}

#[test]
fn voice_sample_is_read_from_disk() {
    let temp = TempDir::new().unwrap();
    let sample = temp.path().join("grandma.mp3");
    std::fs::write(&sample, b"ID3fake").unwrap();

    let api = Arc::new(FakeApi::default());
    let engine = EngineHandle::new(api.clone()).unwrap();
    engine.send(EngineCommand::CloneVoice {
        user_id: "user_42".into(),
        audio_path: sample,
    });
    match next_event(&engine) {
        EngineEvent::VoiceCloned(Ok(reply)) => assert_eq!(reply.voice_id, "voice_1"),
        other => panic!("unexpected event {other:?}"),
    }
    let uploads = api.uploads.lock().unwrap();
    assert_eq!(uploads[0].file_name, "grandma.mp3");
    assert_eq!(uploads[0].mime, "audio/mpeg");
    assert_eq!(uploads[0].bytes, b"ID3fake");
}

#[test]
fn missing_voice_sample_is_an_io_failure() {
    let engine = EngineHandle::new(Arc::new(FakeApi::default())).unwrap();
    engine.send(EngineCommand::CloneVoice {
        user_id: "user_42".into(),
        audio_path: "/definitely/not/here.wav".into(),
    });
    match next_event(&engine) {
        EngineEvent::VoiceCloned(Err(err)) => assert_eq!(err.kind, FailureKind::Io),
        other => panic!("unexpected event {other:?}"),
    }
}
