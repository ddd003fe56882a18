use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use clap::Parser;
use ekho_core::{
    update, AppState, AvatarRequest, ChatRequest, JobId, Msg, Session, SlotView, VideoRequest,
    VoiceCloneRequest,
};
use ekho_engine::{EngineCommand, EngineEvent, EngineHandle, ReqwestClient};
use ekho_logging::{ekho_debug, ekho_info};

use super::cli::{Cli, ClientConfig, Command};
use super::effects::{api_failure, status_snapshot, EffectRunner};
use super::persistence::{load_chat_history, save_chat_history};
use super::render::{snapshot_line, Renderer};

/// How long the loop waits for an event before checking input again.
const IDLE_WAIT: Duration = Duration::from_millis(50);
const QUIT_COMMAND: &str = "/quit";

pub fn run_app() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = cli.config;

    ekho_logging::initialize(
        config.log_to.into(),
        ekho_logging::parse_level(&config.log_level),
        &config.log_file(),
    );
    ekho_info!(
        "ekho starting: api={} user={} poll={}s",
        config.api_url,
        config.user_id,
        config.poll_interval_secs
    );

    let client = ReqwestClient::new(config.client_settings())
        .with_context(|| format!("invalid service url {}", config.api_url))?;
    let engine = EngineHandle::new(Arc::new(client)).context("could not start the engine")?;
    let state = AppState::new(
        Session::new(config.user_id.clone()),
        config.poll_policy(),
    );
    let mut app = App::new(state, EffectRunner::new(engine));

    match cli.command {
        Command::Health => app.run_until_settled(Msg::HealthRequested),
        Command::Avatar { captures, years } => {
            let face_captures = encode_files(&captures)?;
            app.run_until_settled(Msg::AvatarSubmitted(AvatarRequest {
                face_captures,
                age_years: years,
            }))
        }
        Command::Video {
            prompt,
            duration,
            style,
            references,
        } => {
            let reference_images = encode_files(&references)?;
            app.run_until_settled(Msg::VideoSubmitted(VideoRequest {
                prompt,
                duration_secs: duration,
                reference_images,
                style: style.into(),
            }))
        }
        Command::CloneVoice { audio } => {
            app.run_until_settled(Msg::VoiceCloneSubmitted(VoiceCloneRequest { audio_path: audio }))
        }
        Command::Jobs => app.run_until_settled(Msg::JobListRequested),
        Command::Status { job_id } => return app.show_status(&job_id, &config),
        Command::Chat { message, video } => {
            return run_chat(&mut app, &config.state_dir, message, video)
        }
    }
    app.shutdown();
    app.ensure_clean()
}

fn run_chat(
    app: &mut App,
    state_dir: &Path,
    message: Option<String>,
    make_video: bool,
) -> Result<()> {
    let history = load_chat_history(state_dir);
    if !history.is_empty() {
        let restored = history.len();
        app.dispatch_quietly(Msg::RestoreChatHistory(history));
        app.print(&format!(
            "({restored} earlier message(s) restored, {} video(s) still generating)",
            app.state.view().active_jobs
        ));
    }

    match message {
        Some(message) => app.run_until_settled(Msg::ChatSubmitted(ChatRequest {
            message,
            make_video,
        })),
        None => app.run_repl(make_video)?,
    }

    app.shutdown();
    save_chat_history(state_dir, app.state.chat().entries());
    Ok(())
}

/// Read and base64-encode every file, in order.
fn encode_files(paths: &[PathBuf]) -> Result<Vec<String>> {
    paths
        .iter()
        .map(|path| {
            let bytes =
                std::fs::read(path).with_context(|| format!("could not read {}", path.display()))?;
            Ok(BASE64.encode(bytes))
        })
        .collect()
}

struct App {
    state: AppState,
    runner: EffectRunner,
    renderer: Renderer,
}

impl App {
    fn new(state: AppState, runner: EffectRunner) -> Self {
        Self {
            state,
            runner,
            renderer: Renderer::default(),
        }
    }

    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        self.runner.run(effects);
        if state.consume_dirty() {
            let view = state.view();
            for line in self.renderer.render(&view) {
                self.print(&line);
            }
        }
        self.state = state;
    }

    /// Apply `msg` without printing what it changed.
    fn dispatch_quietly(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        self.runner.run(effects);
        state.consume_dirty();
        self.renderer.sync(&state.view());
        self.state = state;
    }

    fn print(&self, line: &str) {
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{line}");
        let _ = stdout.flush();
    }

    fn pump_events(&mut self) {
        while let Some(msg) = self.runner.try_next() {
            self.dispatch(msg);
        }
    }

    fn run_until_settled(&mut self, first: Msg) {
        self.dispatch(first);
        while !self.state.is_settled() {
            if let Some(msg) = self.runner.next_timeout(IDLE_WAIT) {
                self.dispatch(msg);
            }
        }
    }

    fn run_repl(&mut self, make_video: bool) -> Result<()> {
        let lines = spawn_stdin_reader()?;
        self.print(&format!("type a message and press enter; {QUIT_COMMAND} leaves"));
        let mut input_open = true;
        loop {
            self.pump_events();
            if !input_open {
                if self.state.is_settled() {
                    break;
                }
                if let Some(msg) = self.runner.next_timeout(IDLE_WAIT) {
                    self.dispatch(msg);
                }
                continue;
            }
            match lines.recv_timeout(IDLE_WAIT) {
                Ok(line) => {
                    let line = line.trim();
                    if line == QUIT_COMMAND {
                        ekho_debug!("leaving chat on request");
                        break;
                    }
                    if !line.is_empty() {
                        self.dispatch(Msg::ChatSubmitted(ChatRequest {
                            message: line.to_string(),
                            make_video,
                        }));
                    }
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => input_open = false,
            }
        }
        Ok(())
    }

    /// One status query outside the poller.
    fn show_status(&mut self, raw_job_id: &str, config: &ClientConfig) -> Result<()> {
        let job_id = JobId::parse(raw_job_id).ok_or_else(|| anyhow!("job id must not be empty"))?;
        self.runner.send(EngineCommand::FetchStatus {
            job_id: job_id.to_string(),
        });
        let deadline = Instant::now() + Duration::from_secs(config.request_timeout_secs + 5);
        while Instant::now() < deadline {
            match self.runner.next_event_timeout(IDLE_WAIT) {
                Some(EngineEvent::StatusFetched { result, .. }) => {
                    return match result {
                        Ok(reply) => {
                            self.print(&snapshot_line(&status_snapshot(job_id.as_str(), reply)));
                            Ok(())
                        }
                        Err(err) => bail!("[connection] {}", api_failure(err)),
                    };
                }
                Some(_) | None => {}
            }
        }
        bail!("[connection] no answer for job {job_id}")
    }

    fn ensure_clean(&self) -> Result<()> {
        let view = self.state.view();
        let slot_failed = |slot: &SlotView| {
            slot.error.is_some() || slot.job.as_ref().is_some_and(|job| job.error.is_some())
        };
        if slot_failed(&view.avatar)
            || slot_failed(&view.video)
            || view.voice_error.is_some()
            || view.health_error.is_some()
            || view.listing_error.is_some()
        {
            bail!("finished with errors");
        }
        Ok(())
    }

    /// Stop every poller before the engine goes away.
    fn shutdown(&mut self) {
        self.dispatch(Msg::Teardown);
        ekho_info!("ekho finished");
    }
}

fn spawn_stdin_reader() -> Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("ekho-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("could not read from stdin")?;
    Ok(rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn files_are_encoded_in_order() {
        let temp = TempDir::new().unwrap();
        let first = temp.path().join("a.jpg");
        let second = temp.path().join("b.jpg");
        std::fs::write(&first, b"face-a").unwrap();
        std::fs::write(&second, b"face-b").unwrap();

        let encoded = encode_files(&[first, second]).unwrap();
        assert_eq!(encoded, vec!["ZmFjZS1h".to_string(), "ZmFjZS1i".to_string()]);
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = encode_files(&[PathBuf::from("/nope/face.jpg")]).unwrap_err();
        assert!(err.to_string().contains("/nope/face.jpg"));
    }
}
