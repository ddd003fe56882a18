use std::fmt;

use thiserror::Error;

/// A local precondition that blocked a submission before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("at least {min} face captures are required, got {got}")]
    TooFewCaptures { min: usize, got: usize },
    #[error("at most {max} face captures are allowed, got {got}")]
    TooManyCaptures { max: usize, got: usize },
    #[error("age progression must be between {min} and {max} years, got {got}")]
    AgeOutOfRange { min: u32, max: u32, got: u32 },
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("message is too long ({len} characters, max {max})")]
    MessageTooLong { len: usize, max: usize },
    #[error("prompt must be between {min} and {max} characters, got {len}")]
    PromptLength { min: usize, max: usize, len: usize },
    #[error("duration must be between {min} and {max} seconds, got {got}")]
    DurationOutOfRange { min: u32, max: u32, got: u32 },
    #[error("at most {max} reference images are allowed, got {got}")]
    TooManyReferenceImages { max: usize, got: usize },
    #[error("an audio file is required")]
    MissingAudio,
    #[error("a {0} job is already running")]
    JobActive(&'static str),
    #[error("a {0} request is already in progress")]
    RequestPending(&'static str),
}

/// A failed call to the service, as seen by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    pub status: Option<u16>,
    pub detail: String,
}

impl ApiFailure {
    pub fn new(status: Option<u16>, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(code) => write!(f, "{} (HTTP {code})", self.detail),
            None => f.write_str(&self.detail),
        }
    }
}

/// What the user sees when something went wrong.
///
/// The three kinds render differently: fix the input, try again later, or
/// the generation itself failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiError {
    Validation(String),
    Transport(String),
    JobFailure(String),
}

impl UiError {
    pub fn marker(&self) -> &'static str {
        match self {
            UiError::Validation(_) => "[input]",
            UiError::Transport(_) => "[connection]",
            UiError::JobFailure(_) => "[job failed]",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            UiError::Validation(msg) | UiError::Transport(msg) | UiError::JobFailure(msg) => msg,
        }
    }
}

impl fmt::Display for UiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.marker(), self.message())
    }
}

impl From<ValidationError> for UiError {
    fn from(err: ValidationError) -> Self {
        UiError::Validation(err.to_string())
    }
}

impl From<ApiFailure> for UiError {
    fn from(err: ApiFailure) -> Self {
        UiError::Transport(err.to_string())
    }
}
