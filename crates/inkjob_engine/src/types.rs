use std::fmt;
use std::path::Path;
use std::time::Duration;

use bytes::Bytes;

use crate::job::JobStatus;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Image encodings the service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or(mime).trim();
        if essence.eq_ignore_ascii_case("image/jpeg") || essence.eq_ignore_ascii_case("image/jpg")
        {
            Some(ImageKind::Jpeg)
        } else if essence.eq_ignore_ascii_case("image/png") {
            Some(ImageKind::Png)
        } else {
            None
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
        }
    }

    pub(crate) fn format(self) -> image::ImageFormat {
        match self {
            ImageKind::Jpeg => image::ImageFormat::Jpeg,
            ImageKind::Png => image::ImageFormat::Png,
        }
    }
}

/// Declared MIME type for a file, judged by its extension only.
pub fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{}", self.width, self.height)
    }
}

/// An image offered for submission.
///
/// Never mutated: validation and resizing each hand back a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateImage {
    file_name: String,
    mime: String,
    bytes: Bytes,
    dimensions: Option<Dimensions>,
}

impl CandidateImage {
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
            dimensions: None,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn byte_len(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Decoded size; `None` until the image has been validated.
    pub fn dimensions(&self) -> Option<Dimensions> {
        self.dimensions
    }

    pub(crate) fn with_dimensions(self, dimensions: Dimensions) -> Self {
        Self {
            dimensions: Some(dimensions),
            ..self
        }
    }

    pub(crate) fn reencoded(&self, bytes: Vec<u8>, dimensions: Dimensions) -> Self {
        Self {
            file_name: self.file_name.clone(),
            mime: self.mime.clone(),
            bytes: Bytes::from(bytes),
            dimensions: Some(dimensions),
        }
    }
}

/// One status answer for a job, forwarded to whoever displays progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobProgress {
    pub job_id: JobId,
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
}

pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: JobProgress);
}

/// Every way a submission attempt can end early. None of these are retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    #[error("Only JPG and PNG images are supported (got {mime})")]
    UnsupportedType { mime: String },
    #[error("File size must be under {max_bytes} bytes (got {actual})")]
    OversizeBytes { actual: u64, max_bytes: u64 },
    #[error("Image dimensions must be within {max_width}×{max_height}px (got {actual})")]
    OversizeDimensions {
        actual: Dimensions,
        max_width: u32,
        max_height: u32,
    },
    #[error("Failed to load image: {0}")]
    DecodeError(String),
    #[error("Resized image is {actual} bytes, still over the {max_bytes} byte limit")]
    ResizeInsufficient { actual: u64, max_bytes: u64 },
    #[error("{0}")]
    SubmissionRejected(String),
    #[error("{0}")]
    ProcessingFailed(String),
    #[error("Failed to download processed image: {0}")]
    DownloadError(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Processing did not finish within {}s", .waited.as_secs())]
    JobTimedOut { waited: Duration },
}
