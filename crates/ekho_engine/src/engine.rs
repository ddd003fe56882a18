use std::io;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use ekho_logging::{ekho_debug, ekho_warn};

use crate::client::{load_voice_sample, EkhoApi};
use crate::poll::PollTimers;
use crate::types::{AvatarJobBody, ChatBody, VideoJobBody};
use crate::EngineEvent;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    CreateAvatar(AvatarJobBody),
    CreateVideo(VideoJobBody),
    SendChat { entry_id: u64, body: ChatBody },
    CloneVoice { user_id: String, audio_path: PathBuf },
    CheckHealth,
    ListJobs { user_id: String },
    FetchStatus { job_id: String },
    StartPoller { job_id: String, interval: Duration },
    StopPoller { job_id: String },
    StopAllPollers,
}

/// Runs service calls and poll timers on a background tokio runtime.
///
/// Results come back as [`EngineEvent`]s, in completion order. Dropping the
/// handle shuts the runtime down, which cancels every outstanding timer and
/// request.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(api: Arc<dyn EkhoApi>) -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("ekho-engine")
            .build()?;

        thread::Builder::new()
            .name("ekho-engine".to_string())
            .spawn(move || {
                let mut timers = PollTimers::new(event_tx.clone());
                while let Ok(command) = cmd_rx.recv() {
                    match command {
                        EngineCommand::StartPoller { job_id, interval } => {
                            timers.start(runtime.handle(), job_id, interval);
                        }
                        EngineCommand::StopPoller { job_id } => {
                            timers.stop(&job_id);
                        }
                        EngineCommand::StopAllPollers => timers.stop_all(),
                        command => {
                            let api = api.clone();
                            let event_tx = event_tx.clone();
                            runtime.spawn(async move {
                                handle_command(api.as_ref(), command, event_tx).await;
                            });
                        }
                    }
                }
                timers.stop_all();
                ekho_debug!("engine command channel closed");
            })?;

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            ekho_warn!("engine thread is gone; command dropped");
        }
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

async fn handle_command(
    api: &dyn EkhoApi,
    command: EngineCommand,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let event = match command {
        EngineCommand::CreateAvatar(body) => {
            EngineEvent::AvatarCreated(api.create_avatar_job(&body).await)
        }
        EngineCommand::CreateVideo(body) => {
            EngineEvent::VideoCreated(api.create_video_job(&body).await)
        }
        EngineCommand::SendChat { entry_id, body } => EngineEvent::ChatReplied {
            entry_id,
            result: api.send_chat(&body).await,
        },
        EngineCommand::CloneVoice {
            user_id,
            audio_path,
        } => {
            let result = match load_voice_sample(&audio_path).await {
                Ok(upload) => api.clone_voice(&user_id, upload).await,
                Err(err) => Err(err),
            };
            EngineEvent::VoiceCloned(result)
        }
        EngineCommand::CheckHealth => EngineEvent::HealthChecked(api.health().await),
        EngineCommand::ListJobs { user_id } => {
            EngineEvent::JobsListed(api.user_jobs(&user_id).await)
        }
        EngineCommand::FetchStatus { job_id } => {
            let result = api.job_status(&job_id).await;
            EngineEvent::StatusFetched { job_id, result }
        }
        EngineCommand::StartPoller { .. }
        | EngineCommand::StopPoller { .. }
        | EngineCommand::StopAllPollers => return,
    };
    let _ = event_tx.send(event);
}
