//! Service replies after they have been mapped off the wire.

use chrono::{DateTime, Utc};

use crate::job::{JobStatus, JobStatusSnapshot};

/// Reply to an avatar or video creation call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreationAck {
    pub job_id: Option<String>,
    /// `None` when the reply carried no status at all.
    pub status: Option<JobStatus>,
    pub message: Option<String>,
    pub estimated_seconds: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatReply {
    pub reply_text: String,
    pub video_job_id: Option<String>,
    pub video_url: Option<String>,
    pub audio_url: Option<String>,
    pub mode: Option<String>,
    pub tone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceClone {
    pub user_id: String,
    pub voice_id: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub status: String,
    pub service: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub cloud_connected: bool,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobListing {
    pub user_id: String,
    pub jobs: Vec<JobStatusSnapshot>,
}
