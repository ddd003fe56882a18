use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use ekho_core::{
    ChatHistoryEntry, JobId, JobPhase, JobStatus, JobStatusSnapshot, JobTracker, UiError,
};
use ekho_engine::AtomicFileWriter;
use ekho_logging::{ekho_error, ekho_info, ekho_warn};
use serde::{Deserialize, Serialize};

const HISTORY_FILENAME: &str = ".ekho_chat.ron";
/// Older entries are dropped on save.
const MAX_SAVED_ENTRIES: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum PersistedError {
    Validation(String),
    Transport(String),
    JobFailure(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PersistedJob {
    /// `None` for placeholders and failed kick-offs.
    job_id: Option<String>,
    status: String,
    progress: u8,
    result_url: Option<String>,
    error_message: Option<String>,
    /// Still being polled when the history was saved.
    active: bool,
    message: Option<String>,
    estimated_seconds: Option<u32>,
    error: Option<PersistedError>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PersistedEntry {
    user_prompt: String,
    reply_text: String,
    tone: Option<String>,
    mode: Option<String>,
    audio_url: Option<String>,
    video_url: Option<String>,
    make_video: bool,
    reply_pending: bool,
    error: Option<PersistedError>,
    job: Option<PersistedJob>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PersistedHistory {
    entries: Vec<PersistedEntry>,
}

pub(crate) fn history_path(state_dir: &Path) -> PathBuf {
    state_dir.join(HISTORY_FILENAME)
}

/// Entries come back most recent first; ids are reassigned on restore.
pub(crate) fn load_chat_history(state_dir: &Path) -> Vec<ChatHistoryEntry> {
    let writer = AtomicFileWriter::new(state_dir.to_path_buf());
    let content = match writer.read(HISTORY_FILENAME) {
        Ok(Some(text)) => text,
        Ok(None) => return Vec::new(),
        Err(err) => {
            ekho_warn!(
                "Failed to read chat history from {:?}: {}",
                history_path(state_dir),
                err
            );
            return Vec::new();
        }
    };

    let history: PersistedHistory = match ron::from_str(&content) {
        Ok(history) => history,
        Err(err) => {
            ekho_warn!(
                "Failed to parse chat history from {:?}: {}",
                history_path(state_dir),
                err
            );
            return Vec::new();
        }
    };

    let entries: Vec<ChatHistoryEntry> = history
        .entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| restore_entry(index as u64, entry))
        .collect();
    ekho_info!("Loaded {} chat entries", entries.len());
    entries
}

pub(crate) fn save_chat_history(state_dir: &Path, entries: &[ChatHistoryEntry]) {
    let history = PersistedHistory {
        entries: entries
            .iter()
            .take(MAX_SAVED_ENTRIES)
            .map(persist_entry)
            .collect(),
    };

    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(&history, pretty) {
        Ok(text) => text,
        Err(err) => {
            ekho_error!("Failed to serialize chat history: {}", err);
            return;
        }
    };

    let writer = AtomicFileWriter::new(state_dir.to_path_buf());
    if let Err(err) = writer.write(HISTORY_FILENAME, &content) {
        ekho_error!("Failed to write chat history to {:?}: {}", state_dir, err);
    }
}

fn persist_error(err: &UiError) -> PersistedError {
    match err {
        UiError::Validation(msg) => PersistedError::Validation(msg.clone()),
        UiError::Transport(msg) => PersistedError::Transport(msg.clone()),
        UiError::JobFailure(msg) => PersistedError::JobFailure(msg.clone()),
    }
}

fn restore_error(err: PersistedError) -> UiError {
    match err {
        PersistedError::Validation(msg) => UiError::Validation(msg),
        PersistedError::Transport(msg) => UiError::Transport(msg),
        PersistedError::JobFailure(msg) => UiError::JobFailure(msg),
    }
}

fn persist_job(tracker: &JobTracker) -> PersistedJob {
    let snapshot = &tracker.snapshot;
    PersistedJob {
        job_id: tracker.job_id().map(|id| id.to_string()),
        status: snapshot.status().label().to_string(),
        progress: snapshot.progress(),
        result_url: snapshot.result_url().map(str::to_string),
        error_message: snapshot.error_message().map(str::to_string),
        active: tracker.phase != JobPhase::Terminal,
        message: tracker.message.clone(),
        estimated_seconds: tracker.estimated_seconds,
        error: tracker.error.as_ref().map(persist_error),
        created_at: snapshot.created_at(),
        updated_at: snapshot.updated_at(),
    }
}

fn restore_job(job: PersistedJob) -> JobTracker {
    let status = JobStatus::from_wire(&job.status);
    let mut tracker = match job.job_id.as_deref().and_then(JobId::parse) {
        Some(id) => {
            let mut tracker = JobTracker::tracked(id.clone(), status);
            tracker.snapshot = JobStatusSnapshot::new(
                id.as_str(),
                status,
                u32::from(job.progress),
                job.result_url,
                job.error_message,
            )
            .with_timestamps(job.created_at, job.updated_at);
            tracker.phase = if job.active && !tracker.snapshot.is_terminal() {
                JobPhase::Active
            } else {
                JobPhase::Terminal
            };
            tracker
        }
        None if status == JobStatus::Failed => JobTracker::kickoff_failed(
            job.error_message
                .unwrap_or_else(|| ekho_core::GENERIC_JOB_FAILURE.to_string()),
        ),
        None => JobTracker::placeholder(),
    };
    tracker.message = job.message.or(tracker.message);
    tracker.estimated_seconds = job.estimated_seconds;
    tracker.error = job.error.map(restore_error).or(tracker.error);
    tracker
}

fn persist_entry(entry: &ChatHistoryEntry) -> PersistedEntry {
    PersistedEntry {
        user_prompt: entry.user_prompt.clone(),
        reply_text: entry.reply_text.clone(),
        tone: entry.tone.clone(),
        mode: entry.mode.clone(),
        audio_url: entry.audio_url.clone(),
        video_url: entry.video_url.clone(),
        make_video: entry.make_video,
        reply_pending: entry.reply_pending,
        error: entry.error.as_ref().map(persist_error),
        job: entry.job.as_ref().map(persist_job),
    }
}

fn restore_entry(id: u64, entry: PersistedEntry) -> ChatHistoryEntry {
    let mut restored = ChatHistoryEntry::submitted(id, entry.user_prompt, entry.make_video);
    restored.reply_text = entry.reply_text;
    restored.tone = entry.tone;
    restored.mode = entry.mode;
    restored.audio_url = entry.audio_url;
    restored.video_url = entry.video_url;
    restored.reply_pending = entry.reply_pending;
    restored.error = entry.error.map(restore_error);
    restored.job = entry.job.map(restore_job);
    restored
}
