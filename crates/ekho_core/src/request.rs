//! Submissions the user can make, with the local checks that run before any
//! network call.

use std::fmt;
use std::path::PathBuf;

use crate::error::ValidationError;

pub const MIN_FACE_CAPTURES: usize = 3;
pub const MAX_FACE_CAPTURES: usize = 5;
pub const MIN_AGE_YEARS: u32 = 3;
pub const MAX_AGE_YEARS: u32 = 10;
pub const DEFAULT_AGE_YEARS: u32 = 5;
pub const MAX_CHAT_CHARS: usize = 2000;
pub const MIN_PROMPT_CHARS: usize = 10;
pub const MAX_PROMPT_CHARS: usize = 1000;
pub const MIN_VIDEO_SECONDS: u32 = 5;
pub const MAX_VIDEO_SECONDS: u32 = 30;
pub const DEFAULT_VIDEO_SECONDS: u32 = 10;
pub const MAX_REFERENCE_IMAGES: usize = 5;

/// Face captures are already encoded (base64) by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarRequest {
    pub face_captures: Vec<String>,
    pub age_years: u32,
}

impl AvatarRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let got = self.face_captures.len();
        if got < MIN_FACE_CAPTURES {
            return Err(ValidationError::TooFewCaptures {
                min: MIN_FACE_CAPTURES,
                got,
            });
        }
        if got > MAX_FACE_CAPTURES {
            return Err(ValidationError::TooManyCaptures {
                max: MAX_FACE_CAPTURES,
                got,
            });
        }
        if !(MIN_AGE_YEARS..=MAX_AGE_YEARS).contains(&self.age_years) {
            return Err(ValidationError::AgeOutOfRange {
                min: MIN_AGE_YEARS,
                max: MAX_AGE_YEARS,
                got: self.age_years,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
    pub make_video: bool,
}

impl ChatRequest {
    /// Returns the trimmed message on success.
    pub fn validate(&self) -> Result<String, ValidationError> {
        let message = self.message.trim();
        if message.is_empty() {
            return Err(ValidationError::EmptyMessage);
        }
        let len = message.chars().count();
        if len > MAX_CHAT_CHARS {
            return Err(ValidationError::MessageTooLong {
                len,
                max: MAX_CHAT_CHARS,
            });
        }
        Ok(message.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoStyle {
    Cinematic,
    Documentary,
    #[default]
    Conversational,
    Emotional,
}

impl VideoStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            VideoStyle::Cinematic => "cinematic",
            VideoStyle::Documentary => "documentary",
            VideoStyle::Conversational => "conversational",
            VideoStyle::Emotional => "emotional",
        }
    }
}

impl fmt::Display for VideoStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRequest {
    pub prompt: String,
    pub duration_secs: u32,
    pub reference_images: Vec<String>,
    pub style: VideoStyle,
}

impl VideoRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let len = self.prompt.trim().chars().count();
        if !(MIN_PROMPT_CHARS..=MAX_PROMPT_CHARS).contains(&len) {
            return Err(ValidationError::PromptLength {
                min: MIN_PROMPT_CHARS,
                max: MAX_PROMPT_CHARS,
                len,
            });
        }
        if !(MIN_VIDEO_SECONDS..=MAX_VIDEO_SECONDS).contains(&self.duration_secs) {
            return Err(ValidationError::DurationOutOfRange {
                min: MIN_VIDEO_SECONDS,
                max: MAX_VIDEO_SECONDS,
                got: self.duration_secs,
            });
        }
        if self.reference_images.len() > MAX_REFERENCE_IMAGES {
            return Err(ValidationError::TooManyReferenceImages {
                max: MAX_REFERENCE_IMAGES,
                got: self.reference_images.len(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceCloneRequest {
    pub audio_path: PathBuf,
}

impl VoiceCloneRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.audio_path.as_os_str().is_empty() {
            return Err(ValidationError::MissingAudio);
        }
        Ok(())
    }
}
