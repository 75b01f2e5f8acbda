use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use url::Url;

use crate::{CandidateImage, JobId};

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_download_bytes: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_download_bytes: 50 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Success,
    Error,
    #[serde(other)]
    Unknown,
}

/// Reply body of `POST /api/upload`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadEnvelope {
    pub status: EnvelopeStatus,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Reply body of `GET /api/status/{job_id}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusEnvelope {
    pub status: EnvelopeStatus,
    #[serde(default)]
    pub job_status: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Error body some download failures are reported with.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct MessageEnvelope {
    #[serde(default)]
    pub(crate) message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    pub kind: ServiceFailure,
    pub message: String,
}

impl ServiceError {
    pub fn new(kind: ServiceFailure, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ServiceError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceFailure {
    InvalidUrl,
    InvalidRequest,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    InvalidBody,
    Network,
}

impl fmt::Display for ServiceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceFailure::InvalidUrl => write!(f, "invalid url"),
            ServiceFailure::InvalidRequest => write!(f, "invalid request"),
            ServiceFailure::HttpStatus(code) => write!(f, "http status {code}"),
            ServiceFailure::Timeout => write!(f, "timeout"),
            ServiceFailure::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            ServiceFailure::InvalidBody => write!(f, "unreadable response body"),
            ServiceFailure::Network => write!(f, "network error"),
        }
    }
}

/// The remote processing service, one method per endpoint.
#[async_trait::async_trait]
pub trait ProcessingService: Send + Sync {
    async fn upload(&self, image: &CandidateImage) -> Result<UploadEnvelope, ServiceError>;

    async fn status(&self, job_id: &JobId) -> Result<StatusEnvelope, ServiceError>;

    async fn download(&self, job_id: &JobId) -> Result<Download, ServiceError>;

    async fn health(&self) -> Result<(), ServiceError> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ReqwestService {
    settings: ServiceSettings,
    base: Url,
    client: reqwest::Client,
}

impl ReqwestService {
    pub fn new(settings: ServiceSettings) -> Result<Self, ServiceError> {
        let base = Url::parse(&settings.base_url)
            .map_err(|err| ServiceError::new(ServiceFailure::InvalidUrl, err.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ServiceError::new(
                ServiceFailure::InvalidUrl,
                format!("{base} cannot be used as a base url"),
            ));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ServiceError::new(ServiceFailure::Network, err.to_string()))?;
        Ok(Self {
            settings,
            base,
            client,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn read_envelope<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, ServiceError> {
        let status = response.status();
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        serde_json::from_slice(&body).map_err(|err| {
            // The service answers errors with a JSON envelope; anything else
            // is reported by its HTTP status when that is informative.
            if status.is_success() {
                ServiceError::new(ServiceFailure::InvalidBody, err.to_string())
            } else {
                ServiceError::new(ServiceFailure::HttpStatus(status.as_u16()), status.to_string())
            }
        })
    }
}

#[async_trait::async_trait]
impl ProcessingService for ReqwestService {
    async fn upload(&self, image: &CandidateImage) -> Result<UploadEnvelope, ServiceError> {
        let part = Part::bytes(image.bytes().to_vec())
            .file_name(image.file_name().to_string())
            .mime_str(image.mime())
            .map_err(|err| ServiceError::new(ServiceFailure::InvalidRequest, err.to_string()))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint(&["api", "upload"]))
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Self::read_envelope(response).await
    }

    async fn status(&self, job_id: &JobId) -> Result<StatusEnvelope, ServiceError> {
        let response = self
            .client
            .get(self.endpoint(&["api", "status", job_id.as_str()]))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Self::read_envelope(response).await
    }

    async fn download(&self, job_id: &JobId) -> Result<Download, ServiceError> {
        let response = self
            .client
            .get(self.endpoint(&["api", "download", job_id.as_str()]))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::new(
                ServiceFailure::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let max_bytes = self.settings.max_download_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(ServiceError::new(
                    ServiceFailure::TooLarge {
                        max_bytes,
                        actual: Some(content_len),
                    },
                    "artifact too large",
                ));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(ServiceError::new(
                    ServiceFailure::TooLarge {
                        max_bytes,
                        actual: Some(next_len),
                    },
                    "artifact too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(Download {
            bytes: Bytes::from(bytes),
            content_type,
        })
    }

    async fn health(&self) -> Result<(), ServiceError> {
        let response = self
            .client
            .get(self.endpoint(&["health"]))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ServiceError::new(
                ServiceFailure::HttpStatus(status.as_u16()),
                status.to_string(),
            ))
        }
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ServiceError {
    if err.is_timeout() {
        return ServiceError::new(ServiceFailure::Timeout, err.to_string());
    }
    ServiceError::new(ServiceFailure::Network, err.to_string())
}
