use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::UiError;

/// Opaque identifier assigned by the service when a job is created.
///
/// Always non-empty and trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(String);

impl JobId {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    Unknown,
}

impl JobStatus {
    /// Map a status string as reported by the service.
    ///
    /// The service uses a few synonyms (`submitted` right after creation,
    /// `error` when it could not reach its own backend).
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" | "submitted" | "queued" => JobStatus::Pending,
            "processing" | "running" => JobStatus::Processing,
            "completed" | "succeeded" | "done" => JobStatus::Completed,
            "failed" | "error" => JobStatus::Failed,
            _ => JobStatus::Unknown,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn label(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub const MISSING_RESULT_URL: &str = "job completed without a result url";
pub const GENERIC_JOB_FAILURE: &str = "job failed";

/// Last known state of one job.
///
/// Fields are private so that every snapshot goes through [`JobStatusSnapshot::new`],
/// which keeps `result_url` present iff the job completed and `error_message`
/// present only when it failed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobStatusSnapshot {
    job_id: String,
    status: JobStatus,
    progress: u8,
    result_url: Option<String>,
    error_message: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl JobStatusSnapshot {
    pub fn new(
        job_id: impl Into<String>,
        status: JobStatus,
        progress: u32,
        result_url: Option<String>,
        error_message: Option<String>,
    ) -> Self {
        let result_url = result_url.filter(|url| !url.trim().is_empty());
        let error_message = error_message.filter(|msg| !msg.trim().is_empty());

        let (status, result_url, error_message) = match status {
            JobStatus::Completed => match result_url {
                Some(url) => (JobStatus::Completed, Some(url), None),
                None => (
                    JobStatus::Failed,
                    None,
                    Some(MISSING_RESULT_URL.to_string()),
                ),
            },
            JobStatus::Failed => (
                JobStatus::Failed,
                None,
                Some(error_message.unwrap_or_else(|| GENERIC_JOB_FAILURE.to_string())),
            ),
            other => (other, None, None),
        };

        Self {
            job_id: job_id.into(),
            status,
            progress: progress.min(100) as u8,
            result_url,
            error_message,
            created_at: None,
            updated_at: None,
        }
    }

    /// Seed snapshot for a freshly created job.
    pub fn seeded(job_id: impl Into<String>, status: JobStatus) -> Self {
        Self::new(job_id, status, 0, None, None)
    }

    pub fn failed(job_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(job_id, JobStatus::Failed, 0, None, Some(message.into()))
    }

    pub fn with_timestamps(
        mut self,
        created_at: Option<DateTime<Utc>>,
        updated_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.created_at = created_at;
        self.updated_at = updated_at;
        self
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn result_url(&self) -> Option<&str> {
        self.result_url.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub(crate) fn with_job_id(mut self, job_id: &str) -> Self {
        if self.job_id.trim().is_empty() {
            self.job_id = job_id.to_string();
        }
        self
    }
}

/// How a job can be followed up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobRef {
    /// The service returned an id the status endpoint knows about.
    Tracked(JobId),
    /// The service acknowledged the submission without a status-query id.
    Placeholder,
}

impl JobRef {
    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            JobRef::Tracked(id) => Some(id),
            JobRef::Placeholder => None,
        }
    }
}

/// Prefix the chat endpoint puts in front of a job id when the video
/// kick-off itself failed.
pub const KICKOFF_ERROR_PREFIX: &str = "error:";

/// Outcome of interpreting the job id of a creation reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KickoffRef {
    /// No job was started.
    None,
    Started(JobRef),
    /// The service reported a kick-off failure in place of an id.
    Failed(String),
}

impl KickoffRef {
    /// `acknowledged` is true when the reply carried a status for the job
    /// even though the id may be missing.
    pub fn classify(raw_job_id: Option<&str>, acknowledged: bool) -> Self {
        let raw = raw_job_id.map(str::trim).unwrap_or_default();
        if let Some(detail) = raw.strip_prefix(KICKOFF_ERROR_PREFIX) {
            let detail = detail.trim();
            return KickoffRef::Failed(if detail.is_empty() {
                GENERIC_JOB_FAILURE.to_string()
            } else {
                detail.to_string()
            });
        }
        match JobId::parse(raw) {
            Some(id) => KickoffRef::Started(JobRef::Tracked(id)),
            None if acknowledged => KickoffRef::Started(JobRef::Placeholder),
            None => KickoffRef::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobPhase {
    #[default]
    NotStarted,
    Active,
    /// No further polling; completed, failed or placeholder.
    Terminal,
}

pub const PLACEHOLDER_NOTE: &str = "submitted, pending status";

/// One job followed by a surface: reference, snapshot and poll bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTracker {
    pub reference: JobRef,
    pub snapshot: JobStatusSnapshot,
    pub phase: JobPhase,
    pub in_flight: bool,
    pub consecutive_failures: u32,
    pub message: Option<String>,
    pub estimated_seconds: Option<u32>,
    /// Set when the job ended badly; `JobFailure` if the service said so,
    /// `Transport` if the status query itself failed.
    pub error: Option<UiError>,
}

impl JobTracker {
    /// A tracker for a job the poller should follow. Starts `NotStarted`;
    /// [`JobTracker::arm`] moves it to `Active`.
    pub fn tracked(job_id: JobId, status: JobStatus) -> Self {
        Self {
            snapshot: JobStatusSnapshot::seeded(job_id.as_str(), status),
            reference: JobRef::Tracked(job_id),
            phase: JobPhase::NotStarted,
            in_flight: false,
            consecutive_failures: 0,
            message: None,
            estimated_seconds: None,
            error: None,
        }
    }

    pub fn placeholder() -> Self {
        let reconciled = crate::reconcile::reconcile_placeholder(&JobStatusSnapshot::default());
        Self {
            reference: JobRef::Placeholder,
            snapshot: reconciled.snapshot,
            phase: JobPhase::Terminal,
            in_flight: false,
            consecutive_failures: 0,
            message: Some(PLACEHOLDER_NOTE.to_string()),
            estimated_seconds: None,
            error: None,
        }
    }

    pub fn kickoff_failed(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self {
            reference: JobRef::Placeholder,
            snapshot: JobStatusSnapshot::failed("", detail.clone()),
            phase: JobPhase::Terminal,
            in_flight: false,
            consecutive_failures: 0,
            message: None,
            estimated_seconds: None,
            error: Some(UiError::JobFailure(detail)),
        }
    }

    /// Build a tracker from a kick-off reference. Returns `None` when no job
    /// was started.
    pub fn from_kickoff(kickoff: KickoffRef, status: JobStatus) -> Option<Self> {
        match kickoff {
            KickoffRef::None => None,
            KickoffRef::Failed(detail) => Some(Self::kickoff_failed(detail)),
            KickoffRef::Started(JobRef::Placeholder) => Some(Self::placeholder()),
            KickoffRef::Started(JobRef::Tracked(id)) => Some(Self::tracked(id, status)),
        }
    }

    pub fn with_message(mut self, message: Option<String>) -> Self {
        if message.is_some() {
            self.message = message;
        }
        self
    }

    pub fn with_estimate(mut self, estimated_seconds: Option<u32>) -> Self {
        self.estimated_seconds = estimated_seconds;
        self
    }

    /// Move to `Active` if the job is trackable and not yet terminal.
    /// Returns the id to poll when the tracker was armed.
    pub fn arm(&mut self) -> Option<JobId> {
        if self.phase != JobPhase::NotStarted {
            return None;
        }
        if self.snapshot.is_terminal() {
            self.phase = JobPhase::Terminal;
            return None;
        }
        match &self.reference {
            JobRef::Tracked(id) => {
                self.phase = JobPhase::Active;
                Some(id.clone())
            }
            JobRef::Placeholder => {
                self.phase = JobPhase::Terminal;
                None
            }
        }
    }

    pub fn job_id(&self) -> Option<&JobId> {
        self.reference.job_id()
    }

    pub fn is_active(&self) -> bool {
        self.phase == JobPhase::Active
    }

    pub fn polls(&self, job_id: &JobId) -> bool {
        self.job_id() == Some(job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_without_url_is_normalized_to_failed() {
        let snapshot = JobStatusSnapshot::new("j1", JobStatus::Completed, 100, None, None);
        assert_eq!(snapshot.status(), JobStatus::Failed);
        assert_eq!(snapshot.result_url(), None);
        assert_eq!(snapshot.error_message(), Some(MISSING_RESULT_URL));
    }

    #[test]
    fn terminal_fields_follow_status() {
        let done = JobStatusSnapshot::new(
            "j1",
            JobStatus::Completed,
            100,
            Some("https://x/video.mp4".into()),
            Some("stale".into()),
        );
        assert_eq!(done.result_url(), Some("https://x/video.mp4"));
        assert_eq!(done.error_message(), None);

        let failed = JobStatusSnapshot::new(
            "j1",
            JobStatus::Failed,
            0,
            Some("https://x/video.mp4".into()),
            None,
        );
        assert_eq!(failed.result_url(), None);
        assert_eq!(failed.error_message(), Some(GENERIC_JOB_FAILURE));

        let running = JobStatusSnapshot::new(
            "j1",
            JobStatus::Processing,
            250,
            Some("https://x/video.mp4".into()),
            Some("boom".into()),
        );
        assert_eq!(running.progress(), 100);
        assert_eq!(running.result_url(), None);
        assert_eq!(running.error_message(), None);
    }

    #[test]
    fn wire_status_synonyms() {
        assert_eq!(JobStatus::from_wire("submitted"), JobStatus::Pending);
        assert_eq!(JobStatus::from_wire("Processing"), JobStatus::Processing);
        assert_eq!(JobStatus::from_wire("error"), JobStatus::Failed);
        assert_eq!(JobStatus::from_wire("mystery"), JobStatus::Unknown);
    }

    #[test]
    fn kickoff_classification() {
        assert_eq!(KickoffRef::classify(None, false), KickoffRef::None);
        assert_eq!(KickoffRef::classify(Some("  "), false), KickoffRef::None);
        assert_eq!(
            KickoffRef::classify(None, true),
            KickoffRef::Started(JobRef::Placeholder)
        );
        assert_eq!(
            KickoffRef::classify(Some("error: quota exceeded"), true),
            KickoffRef::Failed("quota exceeded".into())
        );
        assert_eq!(
            KickoffRef::classify(Some(" veo_u_1 "), true),
            KickoffRef::Started(JobRef::Tracked(JobId::parse("veo_u_1").unwrap()))
        );
    }

    #[test]
    fn placeholder_never_arms() {
        let mut tracker = JobTracker::placeholder();
        assert_eq!(tracker.arm(), None);
        assert_eq!(tracker.phase, JobPhase::Terminal);
        assert_eq!(tracker.snapshot.status(), JobStatus::Pending);
        assert_eq!(tracker.message.as_deref(), Some(PLACEHOLDER_NOTE));
    }

    #[test]
    fn terminal_seed_never_arms() {
        let id = JobId::parse("j9").unwrap();
        let mut tracker = JobTracker::tracked(id.clone(), JobStatus::Failed);
        assert_eq!(tracker.arm(), None);
        assert_eq!(tracker.phase, JobPhase::Terminal);

        let mut tracker = JobTracker::tracked(id.clone(), JobStatus::Pending);
        assert_eq!(tracker.arm(), Some(id));
        assert!(tracker.is_active());
        assert_eq!(tracker.arm(), None);
    }
}
