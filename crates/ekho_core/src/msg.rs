use crate::{
    ApiFailure, AvatarRequest, ChatHistoryEntry, ChatReply, ChatRequest, CreationAck, EntryId,
    HealthReport, JobId, JobListing, JobStatusSnapshot, VideoRequest, VoiceClone,
    VoiceCloneRequest,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User asked for an aged avatar from face captures.
    AvatarSubmitted(AvatarRequest),
    /// Service answered the avatar creation call.
    AvatarCreated(Result<CreationAck, ApiFailure>),
    /// User asked for a custom video.
    VideoSubmitted(VideoRequest),
    VideoCreated(Result<CreationAck, ApiFailure>),
    /// User sent a chat message.
    ChatSubmitted(ChatRequest),
    ChatReplied {
        entry_id: EntryId,
        result: Result<ChatReply, ApiFailure>,
    },
    /// User uploaded a voice sample for cloning.
    VoiceCloneSubmitted(VoiceCloneRequest),
    VoiceCloned(Result<VoiceClone, ApiFailure>),
    HealthRequested,
    HealthChecked(Result<HealthReport, ApiFailure>),
    JobListRequested,
    JobListLoaded(Result<JobListing, ApiFailure>),
    /// A poller timer fired for this job.
    PollTick { job_id: JobId },
    /// A status query issued for this job came back.
    StatusFetched {
        job_id: JobId,
        result: Result<JobStatusSnapshot, ApiFailure>,
    },
    /// Restore chat history persisted by an earlier run.
    RestoreChatHistory(Vec<ChatHistoryEntry>),
    /// The front end is going away; every poller must stop.
    Teardown,
    /// An engine event that maps to nothing, such as a tick for an empty id.
    NoOp,
}
