use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use ekho_logging::{ekho_debug, ekho_warn};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use url::Url;

use crate::types::{
    extract_detail, ApiError, AvatarJobBody, ChatBody, ChatReplyBody, CreationReply, FailureKind,
    HealthReply, JobListReply, StatusReply, VideoJobBody, VoiceCloneReply, VoiceUpload,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const API_PREFIX: [&str; 2] = ["api", "v1"];

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Chat with `make_video` waits on the generation kick-off, so keep this generous.
    pub request_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Operations offered by the Ekho service.
#[async_trait]
pub trait EkhoApi: Send + Sync {
    async fn create_avatar_job(&self, body: &AvatarJobBody) -> Result<CreationReply, ApiError>;
    async fn create_video_job(&self, body: &VideoJobBody) -> Result<CreationReply, ApiError>;
    async fn job_status(&self, job_id: &str) -> Result<StatusReply, ApiError>;
    async fn send_chat(&self, body: &ChatBody) -> Result<ChatReplyBody, ApiError>;
    async fn clone_voice(
        &self,
        user_id: &str,
        upload: VoiceUpload,
    ) -> Result<VoiceCloneReply, ApiError>;
    async fn health(&self) -> Result<HealthReply, ApiError>;
    async fn user_jobs(&self, user_id: &str) -> Result<JobListReply, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestClient {
    base_url: Url,
    http: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(settings: ClientSettings) -> Result<Self, ApiError> {
        let base_url = Url::parse(&settings.base_url)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::new(
                FailureKind::InvalidUrl,
                format!("{} cannot be used as a base url", settings.base_url),
            ));
        }
        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { base_url, http })
    }

    /// `{base}/api/v1/{segments...}`, each segment percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::new(FailureKind::InvalidUrl, "base url cannot be a base"))?
            .pop_if_empty()
            .extend(API_PREFIX.iter().chain(segments.iter()));
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        ekho_debug!("GET {}", url);
        let response = self.http.get(url).send().await.map_err(map_reqwest_error)?;
        read_json(response).await
    }

    async fn post_json<B, T>(&self, segments: &[&str], body: &B) -> Result<T, ApiError>
    where
        B: serde::Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;
        ekho_debug!("POST {}", url);
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(response).await
    }
}

#[async_trait]
impl EkhoApi for ReqwestClient {
    async fn create_avatar_job(&self, body: &AvatarJobBody) -> Result<CreationReply, ApiError> {
        self.post_json(&["generate-avatar"], body).await
    }

    async fn create_video_job(&self, body: &VideoJobBody) -> Result<CreationReply, ApiError> {
        self.post_json(&["generate-video"], body).await
    }

    async fn job_status(&self, job_id: &str) -> Result<StatusReply, ApiError> {
        self.get(&["video-status", job_id]).await
    }

    async fn send_chat(&self, body: &ChatBody) -> Result<ChatReplyBody, ApiError> {
        self.post_json(&["chat_full"], body).await
    }

    async fn clone_voice(
        &self,
        user_id: &str,
        upload: VoiceUpload,
    ) -> Result<VoiceCloneReply, ApiError> {
        let url = self.endpoint(&["clone-voice"])?;
        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(upload.mime)
            .map_err(|err| ApiError::new(FailureKind::InvalidRequest, err.to_string()))?;
        let form = Form::new()
            .text("user_id", user_id.to_string())
            .part("audio_file", part);
        ekho_debug!("POST {} (multipart)", url);
        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(response).await
    }

    async fn health(&self) -> Result<HealthReply, ApiError> {
        self.get(&["health"]).await
    }

    async fn user_jobs(&self, user_id: &str) -> Result<JobListReply, ApiError> {
        self.get(&["user", user_id, "jobs"]).await
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().await.map_err(map_reqwest_error)?;
    if !status.is_success() {
        let detail = extract_detail(status.as_u16(), &body);
        ekho_warn!("service answered {}: {}", status, detail);
        return Err(ApiError::new(FailureKind::HttpStatus(status.as_u16()), detail));
    }
    serde_json::from_str(&body).map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return ApiError::new(FailureKind::Decode, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}

/// Read an audio sample from disk for upload.
pub async fn load_voice_sample(path: &Path) -> Result<VoiceUpload, ApiError> {
    let bytes = tokio::fs::read(path).await.map_err(|err| {
        ApiError::new(FailureKind::Io, format!("{}: {err}", path.display()))
    })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sample".to_string());
    Ok(VoiceUpload {
        mime: audio_mime(path),
        file_name,
        bytes,
    })
}

fn audio_mime(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("ogg") => "audio/ogg",
        Some("webm") => "audio/webm",
        Some("flac") => "audio/flac",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ReqwestClient {
        ReqwestClient::new(ClientSettings {
            base_url: base.to_string(),
            ..ClientSettings::default()
        })
        .unwrap()
    }

    #[test]
    fn endpoint_tolerates_trailing_slash_and_encodes_ids() {
        let url = client("http://localhost:8000/").endpoint(&["video-status", "a b/c"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/api/v1/video-status/a%20b%2Fc"
        );
        let url = client("http://host/proxy").endpoint(&["health"]).unwrap();
        assert_eq!(url.as_str(), "http://host/proxy/api/v1/health");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = ReqwestClient::new(ClientSettings {
            base_url: "not a url".to_string(),
            ..ClientSettings::default()
        })
        .unwrap_err();
        assert_eq!(err.kind, FailureKind::InvalidUrl);

        let err = ReqwestClient::new(ClientSettings {
            base_url: "mailto:ekho@example.com".to_string(),
            ..ClientSettings::default()
        })
        .unwrap_err();
        assert_eq!(err.kind, FailureKind::InvalidUrl);
    }

    #[tokio::test]
    async fn malformed_upload_mime_is_an_invalid_request() {
        let upload = VoiceUpload {
            file_name: "sample.wav".to_string(),
            mime: "not a mime type",
            bytes: vec![0; 4],
        };
        let err = client("http://127.0.0.1:9")
            .clone_voice("user_42", upload)
            .await
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::InvalidRequest);
    }

    #[test]
    fn mime_follows_extension() {
        assert_eq!(audio_mime(Path::new("voice.WAV")), "audio/wav");
        assert_eq!(audio_mime(Path::new("voice.mp3")), "audio/mpeg");
        assert_eq!(audio_mime(Path::new("voice")), "application/octet-stream");
    }
}
