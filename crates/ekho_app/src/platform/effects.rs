use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use ekho_core::{
    ApiFailure, ChatReply, CreationAck, Effect, HealthReport, JobId, JobListing, JobStatus,
    JobStatusSnapshot, Msg, VoiceClone,
};
use ekho_engine::{
    ApiError, AvatarJobBody, ChatBody, ChatReplyBody, CreationReply, EngineCommand, EngineEvent,
    EngineHandle, StatusReply, VideoJobBody,
};
use ekho_logging::{ekho_debug, ekho_warn};

/// Feeds core effects to the engine and turns engine events back into
/// messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            ekho_debug!("effect {}", effect_name(&effect));
            self.engine.send(to_command(effect));
        }
    }

    /// Direct access for one-off requests that bypass the state machine.
    pub fn send(&self, command: EngineCommand) {
        self.engine.send(command);
    }

    pub fn try_next(&self) -> Option<Msg> {
        self.engine.try_recv().map(map_event)
    }

    pub fn next_timeout(&self, timeout: Duration) -> Option<Msg> {
        self.engine.recv_timeout(timeout).map(map_event)
    }

    pub fn next_event_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.engine.recv_timeout(timeout)
    }
}

fn effect_name(effect: &Effect) -> &'static str {
    match effect {
        Effect::CreateAvatarJob { .. } => "create_avatar_job",
        Effect::CreateVideoJob { .. } => "create_video_job",
        Effect::SendChat { .. } => "send_chat",
        Effect::CloneVoice { .. } => "clone_voice",
        Effect::CheckHealth => "check_health",
        Effect::ListJobs { .. } => "list_jobs",
        Effect::StartPoller { .. } => "start_poller",
        Effect::FetchStatus { .. } => "fetch_status",
        Effect::StopPoller { .. } => "stop_poller",
        Effect::StopAllPollers => "stop_all_pollers",
    }
}

pub(crate) fn to_command(effect: Effect) -> EngineCommand {
    match effect {
        Effect::CreateAvatarJob { user_id, request } => EngineCommand::CreateAvatar(AvatarJobBody {
            user_id,
            face_captures: request.face_captures,
            age_progression_years: request.age_years,
        }),
        Effect::CreateVideoJob { user_id, request } => EngineCommand::CreateVideo(VideoJobBody {
            user_id,
            prompt: request.prompt.trim().to_string(),
            duration: request.duration_secs,
            reference_images: (!request.reference_images.is_empty())
                .then_some(request.reference_images),
            style: request.style.as_str().to_string(),
        }),
        Effect::SendChat {
            entry_id,
            user_id,
            message,
            make_video,
        } => EngineCommand::SendChat {
            entry_id,
            body: ChatBody {
                user_id,
                message,
                make_video,
            },
        },
        Effect::CloneVoice {
            user_id,
            audio_path,
        } => EngineCommand::CloneVoice {
            user_id,
            audio_path,
        },
        Effect::CheckHealth => EngineCommand::CheckHealth,
        Effect::ListJobs { user_id } => EngineCommand::ListJobs { user_id },
        Effect::StartPoller { job_id, interval } => EngineCommand::StartPoller {
            job_id: job_id.to_string(),
            interval,
        },
        Effect::FetchStatus { job_id } => EngineCommand::FetchStatus {
            job_id: job_id.to_string(),
        },
        Effect::StopPoller { job_id } => EngineCommand::StopPoller {
            job_id: job_id.to_string(),
        },
        Effect::StopAllPollers => EngineCommand::StopAllPollers,
    }
}

pub(crate) fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::AvatarCreated(result) => {
            Msg::AvatarCreated(result.map(creation_ack).map_err(api_failure))
        }
        EngineEvent::VideoCreated(result) => {
            Msg::VideoCreated(result.map(creation_ack).map_err(api_failure))
        }
        EngineEvent::ChatReplied { entry_id, result } => Msg::ChatReplied {
            entry_id,
            result: result.map(chat_reply).map_err(api_failure),
        },
        EngineEvent::VoiceCloned(result) => Msg::VoiceCloned(
            result
                .map(|reply| VoiceClone {
                    user_id: reply.user_id,
                    voice_id: reply.voice_id,
                    status: reply.status,
                })
                .map_err(api_failure),
        ),
        EngineEvent::HealthChecked(result) => Msg::HealthChecked(
            result
                .map(|reply| HealthReport {
                    timestamp: parse_timestamp(reply.timestamp.as_deref()),
                    status: reply.status,
                    service: reply.service,
                    cloud_connected: reply.google_cloud_connected,
                })
                .map_err(api_failure),
        ),
        EngineEvent::JobsListed(result) => Msg::JobListLoaded(
            result
                .map(|reply| JobListing {
                    jobs: reply
                        .jobs
                        .into_iter()
                        .map(|job| status_snapshot("", job))
                        .collect(),
                    user_id: reply.user_id,
                })
                .map_err(api_failure),
        ),
        EngineEvent::StatusFetched { job_id, result } => match JobId::parse(&job_id) {
            Some(id) => Msg::StatusFetched {
                result: result
                    .map(|reply| status_snapshot(id.as_str(), reply))
                    .map_err(api_failure),
                job_id: id,
            },
            None => {
                ekho_warn!("status reply for an empty job id dropped");
                Msg::NoOp
            }
        },
        EngineEvent::PollTick { job_id } => match JobId::parse(&job_id) {
            Some(job_id) => Msg::PollTick { job_id },
            None => Msg::NoOp,
        },
    }
}

fn creation_ack(reply: CreationReply) -> CreationAck {
    CreationAck {
        job_id: reply.job_id,
        status: reply.status.as_deref().map(JobStatus::from_wire),
        message: reply.message,
        estimated_seconds: reply.estimated_time_seconds,
    }
}

fn chat_reply(reply: ChatReplyBody) -> ChatReply {
    ChatReply {
        reply_text: reply.text,
        video_job_id: reply.video_job_id,
        video_url: reply.video_url,
        audio_url: reply.audio_url,
        mode: reply.mode,
        tone: reply.emotional_tone,
    }
}

/// `fallback_id` is used when the reply does not echo the job id.
pub(crate) fn status_snapshot(fallback_id: &str, reply: StatusReply) -> JobStatusSnapshot {
    let error_message = reply.error_message();
    let job_id = reply
        .job_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| fallback_id.to_string());
    JobStatusSnapshot::new(
        job_id,
        JobStatus::from_wire(&reply.status),
        reply.progress.unwrap_or(0),
        reply.video_url.filter(|url| !url.trim().is_empty()),
        error_message,
    )
    .with_timestamps(
        parse_timestamp(reply.created_at.as_deref()),
        parse_timestamp(reply.updated_at.as_deref()),
    )
}

pub(crate) fn api_failure(err: ApiError) -> ApiFailure {
    ApiFailure::new(err.status(), err.detail())
}

/// The service emits naive ISO-8601 timestamps in UTC; RFC 3339 is accepted too.
pub(crate) fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw.map(str::trim).filter(|raw| !raw.is_empty())?;
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
