//! Wire shapes of the Ekho REST API.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvatarJobBody {
    pub user_id: String,
    pub face_captures: Vec<String>,
    pub age_progression_years: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoJobBody {
    pub user_id: String,
    pub prompt: String,
    pub duration: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_images: Option<Vec<String>>,
    pub style: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatBody {
    pub user_id: String,
    pub message: String,
    pub make_video: bool,
}

/// Reply to `/generate-avatar` and `/generate-video`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct CreationReply {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub estimated_time_seconds: Option<u32>,
}

/// Reply to `/video-status/{job_id}`; also the element type of job listings.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct StatusReply {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default = "unknown_status")]
    pub status: String,
    #[serde(default)]
    pub progress: Option<u32>,
    #[serde(default)]
    pub video_url: Option<String>,
    /// Usually a string; the service passes provider error objects through
    /// unchanged when the generation backend reports one.
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

fn unknown_status() -> String {
    "unknown".to_string()
}

impl StatusReply {
    /// Flatten the `error` field into a message.
    pub fn error_message(&self) -> Option<String> {
        match self.error.as_ref()? {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            Value::Object(map) => map
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| Some(Value::Object(map.clone()).to_string())),
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct ChatReplyBody {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub video_job_id: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub emotional_tone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VoiceCloneReply {
    pub user_id: String,
    pub voice_id: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthReply {
    pub status: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, alias = "cloud_connected")]
    pub google_cloud_connected: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobListReply {
    pub user_id: String,
    #[serde(default)]
    pub jobs: Vec<StatusReply>,
    #[serde(default)]
    pub count: usize,
}

/// Results reported by the engine thread.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    AvatarCreated(Result<CreationReply, ApiError>),
    VideoCreated(Result<CreationReply, ApiError>),
    ChatReplied {
        entry_id: u64,
        result: Result<ChatReplyBody, ApiError>,
    },
    VoiceCloned(Result<VoiceCloneReply, ApiError>),
    HealthChecked(Result<HealthReply, ApiError>),
    JobsListed(Result<JobListReply, ApiError>),
    StatusFetched {
        job_id: String,
        result: Result<StatusReply, ApiError>,
    },
    PollTick {
        job_id: String,
    },
}

/// Audio sample uploaded for voice cloning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceUpload {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// HTTP status code, when the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self.kind {
            FailureKind::HttpStatus(code) => Some(code),
            _ => None,
        }
    }

    /// Message suitable for showing to the user.
    pub fn detail(&self) -> String {
        match self.kind {
            FailureKind::HttpStatus(_) => self.message.clone(),
            FailureKind::Network => "Could not connect to server".to_string(),
            _ => self.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    /// The request could not be built from the given input.
    InvalidRequest,
    HttpStatus(u16),
    Timeout,
    Network,
    Decode,
    Io,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::InvalidRequest => write!(f, "invalid request"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "unexpected response"),
            FailureKind::Io => write!(f, "io error"),
        }
    }
}

/// Pull the `detail` out of an error body.
///
/// FastAPI sends either `{"detail": "..."}` or, for request validation,
/// `{"detail": [{"msg": "...", ...}]}`.
pub fn extract_detail(status: u16, body: &str) -> String {
    let fallback = || format!("Request failed with status {status}");
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return fallback();
    };
    match value.get("detail") {
        Some(Value::String(text)) if !text.trim().is_empty() => text.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .find_map(|item| item.get("msg").and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(fallback),
        _ => fallback(),
    }
}
