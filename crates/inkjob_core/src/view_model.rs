use crate::{BannerId, JobStatus, Screen, Stage};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub screen: Screen,
    pub uploading: bool,
    /// Local reference to the submitted image.
    pub source: Option<String>,
    pub job: Option<JobRowView>,
    /// Local reference to the processed artifact.
    pub artifact: Option<String>,
    pub saved_to: Option<String>,
    pub error: Option<ErrorBannerView>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRowView {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorBannerView {
    pub id: BannerId,
    pub stage: Stage,
    pub message: String,
}
