//! Ekho core: pure job-tracking state machine and view-model helpers.
mod chat;
mod effect;
mod error;
mod job;
mod msg;
mod reconcile;
mod reply;
mod request;
mod state;
mod update;
mod view_model;

pub use chat::{ChatHistoryEntry, ChatState, EntryId};
pub use effect::Effect;
pub use error::{ApiFailure, UiError, ValidationError};
pub use job::{
    JobId, JobPhase, JobRef, JobStatus, JobStatusSnapshot, JobTracker, KickoffRef,
    GENERIC_JOB_FAILURE, KICKOFF_ERROR_PREFIX, MISSING_RESULT_URL, PLACEHOLDER_NOTE,
};
pub use msg::Msg;
pub use reconcile::{
    reconcile, reconcile_placeholder, reconcile_transport_failure, PollPolicy, Reconciled,
};
pub use reply::{ChatReply, CreationAck, HealthReport, JobListing, VoiceClone};
pub use request::{
    AvatarRequest, ChatRequest, VideoRequest, VideoStyle, VoiceCloneRequest, DEFAULT_AGE_YEARS,
    DEFAULT_VIDEO_SECONDS, MAX_CHAT_CHARS, MAX_FACE_CAPTURES, MIN_FACE_CAPTURES,
};
pub use state::{AppState, HealthState, JobListState, JobSlot, Session, VoiceState};
pub use update::{update, CREATION_FAILED};
pub use view_model::{AppViewModel, ChatRowView, JobRowView, SlotView};
