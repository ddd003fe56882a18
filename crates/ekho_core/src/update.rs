use ekho_logging::{ekho_debug, ekho_info, ekho_warn};

use crate::chat::ChatHistoryEntry;
use crate::error::{ApiFailure, UiError, ValidationError};
use crate::job::{JobId, JobPhase, JobStatus, JobStatusSnapshot, JobTracker, KickoffRef};
use crate::reconcile::{reconcile, reconcile_transport_failure};
use crate::reply::{ChatReply, CreationAck};
use crate::state::{AppState, JobSlot};
use crate::{Effect, EntryId, Msg};

/// Failure detail for a creation reply that already reports `failed`.
pub const CREATION_FAILED: &str = "job creation failed";

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::AvatarSubmitted(request) => {
            let checked = request.validate();
            submit_to_slot(&mut state, SlotKind::Avatar, checked, |user_id| {
                Effect::CreateAvatarJob { user_id, request }
            })
        }
        Msg::AvatarCreated(result) => on_created(&mut state, SlotKind::Avatar, result),
        Msg::VideoSubmitted(request) => {
            let checked = request.validate();
            submit_to_slot(&mut state, SlotKind::Video, checked, |user_id| {
                Effect::CreateVideoJob { user_id, request }
            })
        }
        Msg::VideoCreated(result) => on_created(&mut state, SlotKind::Video, result),
        Msg::ChatSubmitted(request) => {
            if state.torn_down {
                return (state, Vec::new());
            }
            let checked = match state.chat.pending_reply() {
                Some(_) => Err(ValidationError::RequestPending("chat")),
                None => request.validate(),
            };
            match checked {
                Ok(message) => {
                    let entry_id = state.chat.push_front(message.clone(), request.make_video);
                    state.chat.set_pending_reply(Some(entry_id));
                    state.chat.set_error(None);
                    state.mark_dirty();
                    vec![Effect::SendChat {
                        entry_id,
                        user_id: state.session.user_id.clone(),
                        message,
                        make_video: request.make_video,
                    }]
                }
                Err(err) => {
                    ekho_info!("chat submission rejected: {}", err);
                    state.chat.set_error(Some(err.into()));
                    state.mark_dirty();
                    Vec::new()
                }
            }
        }
        Msg::ChatReplied { entry_id, result } => on_chat_replied(&mut state, entry_id, result),
        Msg::VoiceCloneSubmitted(request) => {
            let checked = if state.voice.submitting {
                Err(ValidationError::RequestPending("voice clone"))
            } else {
                request.validate()
            };
            match checked {
                Ok(()) if !state.torn_down => {
                    state.voice.submitting = true;
                    state.voice.error = None;
                    state.mark_dirty();
                    vec![Effect::CloneVoice {
                        user_id: state.session.user_id.clone(),
                        audio_path: request.audio_path,
                    }]
                }
                Ok(()) => Vec::new(),
                Err(err) => {
                    state.voice.error = Some(err.into());
                    state.mark_dirty();
                    Vec::new()
                }
            }
        }
        Msg::VoiceCloned(result) => {
            state.voice.submitting = false;
            match result {
                Ok(clone) => {
                    ekho_info!("voice cloned voice_id={} status={}", clone.voice_id, clone.status);
                    state.voice.last = Some(clone);
                    state.voice.error = None;
                }
                Err(failure) => state.voice.error = Some(failure.into()),
            }
            state.mark_dirty();
            Vec::new()
        }
        Msg::HealthRequested => {
            if state.health.checking || state.torn_down {
                Vec::new()
            } else {
                state.health.checking = true;
                state.mark_dirty();
                vec![Effect::CheckHealth]
            }
        }
        Msg::HealthChecked(result) => {
            state.health.checking = false;
            match result {
                Ok(report) => {
                    state.health.report = Some(report);
                    state.health.error = None;
                }
                Err(failure) => state.health.error = Some(failure.into()),
            }
            state.mark_dirty();
            Vec::new()
        }
        Msg::JobListRequested => {
            if state.jobs.loading || state.torn_down {
                Vec::new()
            } else {
                state.jobs.loading = true;
                state.mark_dirty();
                vec![Effect::ListJobs {
                    user_id: state.session.user_id.clone(),
                }]
            }
        }
        Msg::JobListLoaded(result) => {
            state.jobs.loading = false;
            match result {
                Ok(listing) => {
                    state.jobs.listing = Some(listing);
                    state.jobs.error = None;
                }
                Err(failure) => state.jobs.error = Some(failure.into()),
            }
            state.mark_dirty();
            Vec::new()
        }
        Msg::PollTick { job_id } => on_poll_tick(&mut state, job_id),
        Msg::StatusFetched { job_id, result } => on_status_fetched(&mut state, job_id, result),
        Msg::RestoreChatHistory(entries) => on_restore(&mut state, entries),
        Msg::Teardown => {
            if state.torn_down {
                Vec::new()
            } else {
                state.torn_down = true;
                vec![Effect::StopAllPollers]
            }
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

#[derive(Debug, Clone, Copy)]
enum SlotKind {
    Avatar,
    Video,
}

impl SlotKind {
    fn name(self) -> &'static str {
        match self {
            SlotKind::Avatar => "avatar",
            SlotKind::Video => "video",
        }
    }

    fn slot(self, state: &mut AppState) -> &mut JobSlot {
        match self {
            SlotKind::Avatar => &mut state.avatar,
            SlotKind::Video => &mut state.video,
        }
    }
}

fn submit_to_slot(
    state: &mut AppState,
    kind: SlotKind,
    checked: Result<(), ValidationError>,
    effect: impl FnOnce(String) -> Effect,
) -> Vec<Effect> {
    if state.torn_down {
        return Vec::new();
    }
    let user_id = state.session.user_id.clone();
    let slot = kind.slot(state);
    let checked = checked.and_then(|()| {
        if slot.submitting {
            Err(ValidationError::RequestPending(kind.name()))
        } else if slot.is_busy() {
            Err(ValidationError::JobActive(kind.name()))
        } else {
            Ok(())
        }
    });

    let effects = match checked {
        Ok(()) => {
            slot.submitting = true;
            slot.error = None;
            vec![effect(user_id)]
        }
        Err(err) => {
            ekho_info!("{} submission rejected: {}", kind.name(), err);
            slot.error = Some(err.into());
            Vec::new()
        }
    };
    state.mark_dirty();
    effects
}

fn on_created(
    state: &mut AppState,
    kind: SlotKind,
    result: Result<CreationAck, ApiFailure>,
) -> Vec<Effect> {
    let interval = state.policy.interval;
    let slot = kind.slot(state);
    slot.submitting = false;

    let effects = match result {
        Ok(ack) => {
            let status = ack.status.unwrap_or_default();
            let kickoff = KickoffRef::classify(ack.job_id.as_deref(), ack.status.is_some());
            match JobTracker::from_kickoff(kickoff, status) {
                Some(tracker) => {
                    let mut tracker = seed_from_ack(tracker, &ack);
                    let armed = tracker.arm();
                    ekho_info!(
                        "{} job created id={:?} status={} armed={}",
                        kind.name(),
                        ack.job_id,
                        status,
                        armed.is_some()
                    );
                    slot.tracker = Some(tracker);
                    slot.error = None;
                    armed
                        .map(|job_id| vec![Effect::StartPoller { job_id, interval }])
                        .unwrap_or_default()
                }
                None => {
                    ekho_warn!("{} creation reply carried no job reference", kind.name());
                    slot.error = Some(UiError::Transport(
                        "service did not return a job reference".to_string(),
                    ));
                    Vec::new()
                }
            }
        }
        Err(failure) => {
            ekho_warn!("{} creation failed: {}", kind.name(), failure);
            slot.error = Some(failure.into());
            Vec::new()
        }
    };
    state.mark_dirty();
    effects
}

/// Carry the creation reply's message and estimate onto the tracker. The
/// message on a reply that already reports failure is the service's "started"
/// banner, so it is not used as the failure detail.
fn seed_from_ack(mut tracker: JobTracker, ack: &CreationAck) -> JobTracker {
    if tracker.job_id().is_some() {
        if tracker.snapshot.status() == JobStatus::Failed {
            tracker.snapshot =
                JobStatusSnapshot::failed(tracker.snapshot.job_id(), CREATION_FAILED);
            tracker.error = Some(UiError::JobFailure(CREATION_FAILED.to_string()));
            return tracker;
        }
        tracker = tracker.with_message(ack.message.clone());
    }
    tracker.with_estimate(ack.estimated_seconds)
}

fn on_chat_replied(
    state: &mut AppState,
    entry_id: EntryId,
    result: Result<ChatReply, ApiFailure>,
) -> Vec<Effect> {
    if state.chat.pending_reply() == Some(entry_id) {
        state.chat.set_pending_reply(None);
    }
    let interval = state.policy.interval;
    let may_arm = !state.torn_down;

    let armed = state
        .chat
        .replace_where(
            |entry| entry.id == entry_id,
            |entry| {
                entry.reply_pending = false;
                match result {
                    Ok(reply) => apply_chat_reply(entry, reply, may_arm),
                    Err(failure) => {
                        ekho_warn!("chat entry {} failed: {}", entry_id, failure);
                        entry.error = Some(failure.into());
                        None
                    }
                }
            },
        )
        .flatten();
    state.mark_dirty();

    match armed {
        Some(job_id) => vec![Effect::StartPoller { job_id, interval }],
        None => Vec::new(),
    }
}

/// A tracker is only armed when `may_arm`; after teardown it stays `NotStarted`
/// so no entry claims a poller that will never run.
fn apply_chat_reply(
    entry: &mut ChatHistoryEntry,
    reply: ChatReply,
    may_arm: bool,
) -> Option<JobId> {
    entry.reply_text = reply.reply_text;
    entry.tone = reply.tone;
    entry.mode = reply.mode;
    entry.audio_url = reply.audio_url;
    entry.video_url = reply.video_url;

    // A missing id is never a placeholder here: the chat reply has no job
    // status to acknowledge it with.
    let kickoff = KickoffRef::classify(reply.video_job_id.as_deref(), false);
    let mut tracker = JobTracker::from_kickoff(kickoff, JobStatus::Pending)?;
    let armed = if may_arm { tracker.arm() } else { None };
    if let Some(job_id) = &armed {
        ekho_info!(job = job_id; "chat entry {} is waiting for its video", entry.id);
    }
    entry.job = Some(tracker);
    armed
}

fn on_poll_tick(state: &mut AppState, job_id: JobId) -> Vec<Effect> {
    if state.torn_down {
        return Vec::new();
    }

    enum Tick {
        Fetch,
        Skip,
        Stop,
    }

    let outcome = state.with_tracker(&job_id, |tracker| {
        if tracker.phase != JobPhase::Active {
            Tick::Stop
        } else if tracker.in_flight {
            Tick::Skip
        } else {
            tracker.in_flight = true;
            Tick::Fetch
        }
    });

    match outcome {
        Some(Tick::Fetch) => vec![Effect::FetchStatus { job_id }],
        Some(Tick::Skip) => {
            ekho_debug!(job = job_id; "previous status query still in flight, skipping tick");
            Vec::new()
        }
        Some(Tick::Stop) | None => vec![Effect::StopPoller { job_id }],
    }
}

fn on_status_fetched(
    state: &mut AppState,
    job_id: JobId,
    result: Result<JobStatusSnapshot, ApiFailure>,
) -> Vec<Effect> {
    if state.torn_down {
        return Vec::new();
    }
    let policy = state.policy;

    enum Fetched {
        Continue,
        Retrying(u32),
        Stopped(JobStatus),
        Ignored,
    }

    let outcome = state.with_tracker(&job_id, |tracker| {
        tracker.in_flight = false;
        if tracker.phase != JobPhase::Active {
            return Fetched::Ignored;
        }

        let reconciled = match result {
            Ok(fetched) => {
                tracker.consecutive_failures = 0;
                let reconciled = reconcile(&tracker.snapshot, fetched);
                if reconciled.snapshot.status() == JobStatus::Failed {
                    let detail = reconciled
                        .snapshot
                        .error_message()
                        .unwrap_or_default()
                        .to_string();
                    tracker.error = Some(UiError::JobFailure(detail));
                }
                reconciled
            }
            Err(failure) => {
                tracker.consecutive_failures += 1;
                if !policy.gives_up_after(tracker.consecutive_failures) {
                    return Fetched::Retrying(tracker.consecutive_failures);
                }
                tracker.error = Some(UiError::Transport(failure.to_string()));
                reconcile_transport_failure(&tracker.snapshot, &failure.to_string())
            }
        };

        tracker.snapshot = reconciled.snapshot;
        if reconciled.continue_polling {
            Fetched::Continue
        } else {
            tracker.phase = JobPhase::Terminal;
            Fetched::Stopped(tracker.snapshot.status())
        }
    });

    match outcome {
        Some(Fetched::Continue) => {
            state.mark_dirty();
            Vec::new()
        }
        Some(Fetched::Retrying(failures)) => {
            ekho_warn!(
                job = job_id;
                "status query failed ({} of {}), will retry",
                failures,
                policy.max_consecutive_failures
            );
            state.mark_dirty();
            Vec::new()
        }
        Some(Fetched::Stopped(status)) => {
            ekho_info!(job = job_id; "job reached {}, stopping poller", status);
            state.mark_dirty();
            vec![Effect::StopPoller { job_id }]
        }
        Some(Fetched::Ignored) => Vec::new(),
        None => {
            ekho_debug!(job = job_id; "status for unknown job dropped");
            vec![Effect::StopPoller { job_id }]
        }
    }
}

fn on_restore(state: &mut AppState, entries: Vec<ChatHistoryEntry>) -> Vec<Effect> {
    if entries.is_empty() {
        return Vec::new();
    }
    let ids = state.chat.append_restored(entries);
    let interval = state.policy.interval;

    let mut effects = Vec::new();
    for entry_id in ids {
        let armed = state
            .chat
            .replace_where(
                |entry| entry.id == entry_id,
                |entry| {
                    // A reply that never arrived will not arrive now.
                    if entry.reply_pending {
                        entry.reply_pending = false;
                        entry.error = Some(UiError::Transport(
                            "reply was lost when the previous session ended".to_string(),
                        ));
                    }
                    let job = entry.job.as_mut()?;
                    job.in_flight = false;
                    job.consecutive_failures = 0;
                    if job.phase == JobPhase::Active {
                        job.phase = JobPhase::NotStarted;
                    }
                    job.arm()
                },
            )
            .flatten();
        if let Some(job_id) = armed {
            if !state.torn_down {
                effects.push(Effect::StartPoller { job_id, interval });
            }
        }
    }
    state.mark_dirty();
    effects
}
