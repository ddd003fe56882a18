use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use ekho_core::{PollPolicy, VideoStyle, DEFAULT_AGE_YEARS, DEFAULT_VIDEO_SECONDS};
use ekho_engine::{ClientSettings, DEFAULT_BASE_URL};
use ekho_logging::LogDestination;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "ekho",
    author,
    version,
    about = "Client for the Ekho avatar, chat and voice-cloning service"
)]
pub struct Cli {
    #[command(flatten)]
    pub config: ClientConfig,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the Ekho service
    #[arg(long, env = "EKHO_API_URL", default_value = DEFAULT_BASE_URL)]
    pub api_url: String,

    /// User the requests are made for
    #[arg(long, env = "EKHO_USER_ID", default_value = "demo_user")]
    pub user_id: String,

    /// Seconds between two status checks of a running job
    #[arg(
        long,
        env = "EKHO_POLL_INTERVAL_SECS",
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub poll_interval_secs: u64,

    /// Consecutive failed status checks before a job is given up
    #[arg(
        long,
        env = "EKHO_MAX_POLL_FAILURES",
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_poll_failures: u32,

    /// Per-request timeout in seconds
    #[arg(long, env = "EKHO_REQUEST_TIMEOUT_SECS", default_value_t = 60)]
    pub request_timeout_secs: u64,

    /// Directory for chat history and the log file
    #[arg(long, env = "EKHO_STATE_DIR", default_value = ".")]
    pub state_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "EKHO_LOG", default_value = "warn")]
    pub log_level: String,

    /// Where log lines go
    #[arg(long, value_enum, default_value_t = LogTarget::File)]
    pub log_to: LogTarget,
}

impl ClientConfig {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_consecutive_failures: self.max_poll_failures,
        }
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.api_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
            ..ClientSettings::default()
        }
    }

    pub fn log_file(&self) -> PathBuf {
        self.state_dir.join("ekho.log")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    File,
    Terminal,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::File => LogDestination::File,
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Check that the service is up
    Health,
    /// Create an aged avatar video from 3 to 5 face captures
    Avatar {
        /// Face capture image; repeat for each capture
        #[arg(long = "capture")]
        captures: Vec<PathBuf>,
        /// Years of age progression
        #[arg(long, default_value_t = DEFAULT_AGE_YEARS)]
        years: u32,
    },
    /// Generate a custom video from a prompt
    Video {
        #[arg(long)]
        prompt: String,
        /// Length in seconds
        #[arg(long, default_value_t = DEFAULT_VIDEO_SECONDS)]
        duration: u32,
        #[arg(long, value_enum, default_value_t = StyleArg::Conversational)]
        style: StyleArg,
        /// Reference image; repeat for each image
        #[arg(long = "reference")]
        references: Vec<PathBuf>,
    },
    /// Talk to your future self; reads lines from stdin when no message is given
    Chat {
        message: Option<String>,
        /// Also generate a video of the reply
        #[arg(long)]
        video: bool,
    },
    /// Upload a voice sample for cloning
    CloneVoice { audio: PathBuf },
    /// Show the current status of one job
    Status { job_id: String },
    /// List the jobs of the user
    Jobs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StyleArg {
    Cinematic,
    Documentary,
    Conversational,
    Emotional,
}

impl From<StyleArg> for VideoStyle {
    fn from(style: StyleArg) -> Self {
        match style {
            StyleArg::Cinematic => VideoStyle::Cinematic,
            StyleArg::Documentary => VideoStyle::Documentary,
            StyleArg::Conversational => VideoStyle::Conversational,
            StyleArg::Emotional => VideoStyle::Emotional,
        }
    }
}
