//! Ekho engine: HTTP client, poll timers and the background runtime that
//! executes effects.
mod client;
mod engine;
mod persist;
mod poll;
mod types;

pub use client::{load_voice_sample, ClientSettings, EkhoApi, ReqwestClient, DEFAULT_BASE_URL};
pub use engine::{EngineCommand, EngineHandle};
pub use persist::{ensure_state_dir, AtomicFileWriter, PersistError};
pub use poll::PollTimers;
pub use types::{
    extract_detail, ApiError, AvatarJobBody, ChatBody, ChatReplyBody, CreationReply, EngineEvent,
    FailureKind, HealthReply, JobListReply, StatusReply, VideoJobBody, VoiceCloneReply,
    VoiceUpload,
};
