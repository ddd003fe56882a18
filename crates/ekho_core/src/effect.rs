use std::path::PathBuf;
use std::time::Duration;

use crate::{AvatarRequest, EntryId, JobId, VideoRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    CreateAvatarJob {
        user_id: String,
        request: AvatarRequest,
    },
    CreateVideoJob {
        user_id: String,
        request: VideoRequest,
    },
    SendChat {
        entry_id: EntryId,
        user_id: String,
        message: String,
        make_video: bool,
    },
    CloneVoice {
        user_id: String,
        audio_path: PathBuf,
    },
    CheckHealth,
    ListJobs {
        user_id: String,
    },
    /// Arm a repeating timer for this job.
    StartPoller { job_id: JobId, interval: Duration },
    /// Issue one status query for this job.
    FetchStatus { job_id: JobId },
    /// Cancel the timer for this job.
    StopPoller { job_id: JobId },
    StopAllPollers,
}
