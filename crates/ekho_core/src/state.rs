use crate::chat::ChatState;
use crate::error::UiError;
use crate::job::{JobId, JobTracker};
use crate::reconcile::PollPolicy;
use crate::reply::{HealthReport, JobListing, VoiceClone};
use crate::view_model::AppViewModel;

/// Identity threaded into every call made on the user's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new("demo_user")
    }
}

/// One display slot that runs at most one job at a time (avatar, video).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobSlot {
    pub submitting: bool,
    pub tracker: Option<JobTracker>,
    pub error: Option<UiError>,
}

impl JobSlot {
    pub fn is_busy(&self) -> bool {
        self.submitting || self.tracker.as_ref().is_some_and(JobTracker::is_active)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VoiceState {
    pub submitting: bool,
    pub last: Option<VoiceClone>,
    pub error: Option<UiError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HealthState {
    pub checking: bool,
    pub report: Option<HealthReport>,
    pub error: Option<UiError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobListState {
    pub loading: bool,
    pub listing: Option<JobListing>,
    pub error: Option<UiError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    pub(crate) session: Session,
    pub(crate) policy: PollPolicy,
    pub(crate) avatar: JobSlot,
    pub(crate) video: JobSlot,
    pub(crate) chat: ChatState,
    pub(crate) voice: VoiceState,
    pub(crate) health: HealthState,
    pub(crate) jobs: JobListState,
    pub(crate) torn_down: bool,
    dirty: bool,
}

impl AppState {
    pub fn new(session: Session, policy: PollPolicy) -> Self {
        Self {
            session,
            policy,
            ..Self::default()
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    pub fn avatar(&self) -> &JobSlot {
        &self.avatar
    }

    pub fn video(&self) -> &JobSlot {
        &self.video
    }

    pub fn chat(&self) -> &ChatState {
        &self.chat
    }

    pub fn voice(&self) -> &VoiceState {
        &self.voice
    }

    pub fn health(&self) -> &HealthState {
        &self.health
    }

    pub fn jobs(&self) -> &JobListState {
        &self.jobs
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel::from_state(self, self.dirty)
    }

    /// Nothing is in flight and no poller is running.
    pub fn is_settled(&self) -> bool {
        !self.avatar.is_busy()
            && !self.video.is_busy()
            && self.chat.pending_reply().is_none()
            && !self.chat.entries().iter().any(|entry| entry.is_polling())
            && !self.voice.submitting
            && !self.health.checking
            && !self.jobs.loading
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Run `f` on the tracker following `job_id`, wherever it lives.
    pub(crate) fn with_tracker<R>(
        &mut self,
        job_id: &JobId,
        f: impl FnOnce(&mut JobTracker) -> R,
    ) -> Option<R> {
        for slot in [&mut self.avatar, &mut self.video] {
            if let Some(tracker) = slot.tracker.as_mut().filter(|t| t.polls(job_id)) {
                return Some(f(tracker));
            }
        }
        self.chat
            .replace_where(|entry| entry.polls(job_id), |entry| entry.job.as_mut().map(f))
            .flatten()
    }
}
