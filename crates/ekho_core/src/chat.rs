use crate::error::UiError;
use crate::job::{JobId, JobPhase, JobTracker};

/// Stable identity of a chat entry; never reused within a session.
pub type EntryId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatHistoryEntry {
    pub id: EntryId,
    pub user_prompt: String,
    pub reply_text: String,
    pub tone: Option<String>,
    pub mode: Option<String>,
    pub audio_url: Option<String>,
    /// A video URL returned directly with the reply, without a job.
    pub video_url: Option<String>,
    pub make_video: bool,
    pub reply_pending: bool,
    pub error: Option<UiError>,
    pub job: Option<JobTracker>,
}

impl ChatHistoryEntry {
    pub fn submitted(id: EntryId, user_prompt: String, make_video: bool) -> Self {
        Self {
            id,
            user_prompt,
            reply_text: String::new(),
            tone: None,
            mode: None,
            audio_url: None,
            video_url: None,
            make_video,
            reply_pending: true,
            error: None,
            job: None,
        }
    }

    pub fn is_polling(&self) -> bool {
        self.job
            .as_ref()
            .is_some_and(|job| job.phase == JobPhase::Active)
    }

    pub fn polls(&self, job_id: &JobId) -> bool {
        self.job.as_ref().is_some_and(|job| job.polls(job_id))
    }
}

/// Chat history, most recent first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatState {
    entries: Vec<ChatHistoryEntry>,
    next_entry_id: EntryId,
    pending_reply: Option<EntryId>,
    /// Why the last submission was refused; cleared by the next accepted one.
    error: Option<UiError>,
}

impl Default for ChatState {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_entry_id: 1,
            pending_reply: None,
            error: None,
        }
    }
}

impl ChatState {
    pub fn entries(&self) -> &[ChatHistoryEntry] {
        &self.entries
    }

    pub fn pending_reply(&self) -> Option<EntryId> {
        self.pending_reply
    }

    pub fn error(&self) -> Option<&UiError> {
        self.error.as_ref()
    }

    pub(crate) fn set_error(&mut self, error: Option<UiError>) {
        self.error = error;
    }

    pub(crate) fn set_pending_reply(&mut self, pending: Option<EntryId>) {
        self.pending_reply = pending;
    }

    pub(crate) fn push_front(&mut self, user_prompt: String, make_video: bool) -> EntryId {
        let id = self.allocate_id();
        let entry = ChatHistoryEntry::submitted(id, user_prompt, make_video);
        self.entries = std::iter::once(entry)
            .chain(std::mem::take(&mut self.entries))
            .collect();
        id
    }

    /// Append older entries after the current ones, giving each a fresh id.
    pub(crate) fn append_restored(&mut self, restored: Vec<ChatHistoryEntry>) -> Vec<EntryId> {
        let mut ids = Vec::with_capacity(restored.len());
        let restored: Vec<_> = restored
            .into_iter()
            .map(|mut entry| {
                entry.id = self.allocate_id();
                ids.push(entry.id);
                entry
            })
            .collect();
        self.entries = std::mem::take(&mut self.entries)
            .into_iter()
            .chain(restored)
            .collect();
        ids
    }

    /// Replace the sequence with one where the matching entry went through `f`.
    /// Every other entry is carried over untouched.
    pub(crate) fn replace_where<R>(
        &mut self,
        matches: impl Fn(&ChatHistoryEntry) -> bool,
        f: impl FnOnce(&mut ChatHistoryEntry) -> R,
    ) -> Option<R> {
        let mut f = Some(f);
        let mut result = None;
        self.entries = std::mem::take(&mut self.entries)
            .into_iter()
            .map(|mut entry| {
                if matches(&entry) {
                    if let Some(f) = f.take() {
                        result = Some(f(&mut entry));
                    }
                }
                entry
            })
            .collect();
        result
    }

    fn allocate_id(&mut self) -> EntryId {
        let id = self.next_entry_id;
        self.next_entry_id += 1;
        id
    }
}
