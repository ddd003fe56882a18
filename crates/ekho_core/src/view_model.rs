use crate::chat::ChatHistoryEntry;
use crate::error::UiError;
use crate::job::{JobPhase, JobStatus, JobTracker};
use crate::reply::{HealthReport, JobListing, VoiceClone};
use crate::state::{AppState, JobSlot};
use crate::EntryId;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub user_id: String,
    pub avatar: SlotView,
    pub video: SlotView,
    pub chat: Vec<ChatRowView>,
    pub chat_sending: bool,
    pub chat_error: Option<UiError>,
    pub voice: Option<VoiceClone>,
    pub voice_error: Option<UiError>,
    pub health: Option<HealthReport>,
    pub health_error: Option<UiError>,
    pub listing: Option<JobListing>,
    pub listing_error: Option<UiError>,
    pub active_jobs: usize,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SlotView {
    pub submitting: bool,
    pub job: Option<JobRowView>,
    pub error: Option<UiError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRowView {
    pub job_id: String,
    pub status: JobStatus,
    pub phase: JobPhase,
    pub progress: u8,
    pub result_url: Option<String>,
    pub message: Option<String>,
    pub estimated_seconds: Option<u32>,
    pub error: Option<UiError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRowView {
    pub entry_id: EntryId,
    pub user_prompt: String,
    pub reply_text: String,
    pub reply_pending: bool,
    pub tone: Option<String>,
    pub mode: Option<String>,
    pub audio_url: Option<String>,
    pub video_url: Option<String>,
    pub is_polling: bool,
    pub job: Option<JobRowView>,
    pub error: Option<UiError>,
}

impl AppViewModel {
    pub(crate) fn from_state(state: &AppState, dirty: bool) -> Self {
        let chat: Vec<ChatRowView> = state.chat().entries().iter().map(chat_row).collect();
        let active_jobs = [state.avatar(), state.video()]
            .iter()
            .filter(|slot| slot.tracker.as_ref().is_some_and(JobTracker::is_active))
            .count()
            + chat.iter().filter(|row| row.is_polling).count();

        Self {
            user_id: state.session().user_id.clone(),
            avatar: slot_view(state.avatar()),
            video: slot_view(state.video()),
            chat,
            chat_sending: state.chat().pending_reply().is_some(),
            chat_error: state.chat().error().cloned(),
            voice: state.voice().last.clone(),
            voice_error: state.voice().error.clone(),
            health: state.health().report.clone(),
            health_error: state.health().error.clone(),
            listing: state.jobs().listing.clone(),
            listing_error: state.jobs().error.clone(),
            active_jobs,
            dirty,
        }
    }
}

fn slot_view(slot: &JobSlot) -> SlotView {
    SlotView {
        submitting: slot.submitting,
        job: slot.tracker.as_ref().map(job_row),
        error: slot.error.clone(),
    }
}

fn job_row(tracker: &JobTracker) -> JobRowView {
    let snapshot = &tracker.snapshot;
    JobRowView {
        job_id: snapshot.job_id().to_string(),
        status: snapshot.status(),
        phase: tracker.phase,
        progress: snapshot.progress(),
        result_url: snapshot.result_url().map(str::to_string),
        message: tracker.message.clone(),
        estimated_seconds: tracker.estimated_seconds,
        error: tracker.error.clone(),
    }
}

fn chat_row(entry: &ChatHistoryEntry) -> ChatRowView {
    ChatRowView {
        entry_id: entry.id,
        user_prompt: entry.user_prompt.clone(),
        reply_text: entry.reply_text.clone(),
        reply_pending: entry.reply_pending,
        tone: entry.tone.clone(),
        mode: entry.mode.clone(),
        audio_url: entry.audio_url.clone(),
        video_url: entry.video_url.clone(),
        is_polling: entry.is_polling(),
        job: entry.job.as_ref().map(job_row),
        error: entry.error.clone(),
    }
}
