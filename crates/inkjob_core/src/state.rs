use std::fmt;
use std::time::Duration;

use crate::view_model::{AppViewModel, ErrorBannerView, JobRowView};

/// How long an error banner stays up before the session reverts to upload.
pub const ERROR_DISPLAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Upload,
    Processing,
    Comparison,
    ThankYou,
}

/// Server-side job status as last reported by a poll.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Pending,
    Started,
    Success,
    Failed,
    /// Any other status label; never terminal.
    Other(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => f.write_str("PENDING"),
            JobStatus::Started => f.write_str("STARTED"),
            JobStatus::Success => f.write_str("SUCCESS"),
            JobStatus::Failed => f.write_str("FAILED"),
            JobStatus::Other(label) => f.write_str(label),
        }
    }
}

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Admission,
    Upload,
    Processing,
    Download,
    Save,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BannerId(pub u64);

/// Identifies one admission-and-upload attempt; replies carry it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UploadId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ErrorBanner {
    pub(crate) id: BannerId,
    pub(crate) stage: Stage,
    pub(crate) message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct JobEntry {
    pub(crate) job_id: String,
    pub(crate) status: JobStatus,
    pub(crate) progress: u8,
    pub(crate) message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    screen: Screen,
    /// Attempt still waiting for admission and upload, if any.
    upload: Option<UploadId>,
    next_upload: u64,
    source: Option<String>,
    job: Option<JobEntry>,
    artifact: Option<String>,
    saved_to: Option<String>,
    banner: Option<ErrorBanner>,
    next_banner: u64,
    error_display: Duration,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            screen: Screen::Upload,
            upload: None,
            next_upload: 1,
            source: None,
            job: None,
            artifact: None,
            saved_to: None,
            banner: None,
            next_banner: 1,
            error_display: ERROR_DISPLAY,
            dirty: false,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same as [`AppState::new`] with a custom banner display time.
    pub fn with_error_display(error_display: Duration) -> Self {
        Self {
            error_display,
            ..Self::default()
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn current_job_id(&self) -> Option<&str> {
        self.job.as_ref().map(|job| job.job_id.as_str())
    }

    pub fn holds_artifact(&self) -> bool {
        self.artifact.is_some()
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            screen: self.screen,
            uploading: self.upload.is_some(),
            source: self.source.clone(),
            job: self.job.as_ref().map(|job| JobRowView {
                job_id: job.job_id.clone(),
                status: job.status.clone(),
                progress: job.progress,
                message: job.message.clone(),
            }),
            artifact: self.artifact.clone(),
            saved_to: self.saved_to.clone(),
            error: self.banner.as_ref().map(|banner| ErrorBannerView {
                id: banner.id,
                stage: banner.stage,
                message: banner.message.clone(),
            }),
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn is_uploading(&self) -> bool {
        self.upload.is_some()
    }

    pub(crate) fn is_current_upload(&self, upload: UploadId) -> bool {
        self.upload == Some(upload)
    }

    pub(crate) fn begin_upload(&mut self, path: String) -> UploadId {
        let id = UploadId(self.next_upload);
        self.next_upload += 1;
        self.upload = Some(id);
        self.source = Some(path);
        self.mark_dirty();
        id
    }

    pub(crate) fn enter_processing(&mut self, job_id: String, preview: String) {
        self.upload = None;
        self.screen = Screen::Processing;
        self.source = Some(preview);
        self.job = Some(JobEntry {
            job_id,
            status: JobStatus::Pending,
            progress: 0,
            message: String::new(),
        });
        self.mark_dirty();
    }

    pub(crate) fn is_current_job(&self, job_id: &str) -> bool {
        self.current_job_id() == Some(job_id)
    }

    pub(crate) fn apply_progress(
        &mut self,
        status: JobStatus,
        progress: u8,
        message: String,
    ) {
        if let Some(job) = self.job.as_mut() {
            job.status = status;
            job.progress = progress.min(100);
            job.message = message;
            self.mark_dirty();
        }
    }

    pub(crate) fn enter_comparison(&mut self, uri: String) {
        self.screen = Screen::Comparison;
        self.artifact = Some(uri);
        if let Some(job) = self.job.as_mut() {
            job.status = JobStatus::Success;
            job.progress = 100;
        }
        self.mark_dirty();
    }

    pub(crate) fn enter_thank_you(&mut self) {
        self.screen = Screen::ThankYou;
        self.mark_dirty();
    }

    pub(crate) fn record_saved(&mut self, path: String) {
        self.saved_to = Some(path);
        self.mark_dirty();
    }

    pub(crate) fn raise_banner(&mut self, stage: Stage, message: String) -> BannerId {
        let id = BannerId(self.next_banner);
        self.next_banner += 1;
        self.upload = None;
        self.banner = Some(ErrorBanner { id, stage, message });
        self.mark_dirty();
        id
    }

    pub(crate) fn error_display(&self) -> Duration {
        self.error_display
    }

    pub(crate) fn clear_banner_if(&mut self, id: BannerId) {
        if self.banner.as_ref().is_some_and(|banner| banner.id == id) {
            self.banner = None;
            self.mark_dirty();
        }
    }

    pub(crate) fn clear_banner(&mut self) {
        if self.banner.take().is_some() {
            self.mark_dirty();
        }
    }

    /// Drops job, image and artifact state and returns to the upload screen.
    /// Returns whether an artifact reference was held.
    pub(crate) fn reset_to_upload(&mut self) -> bool {
        let held = self.artifact.take().is_some();
        self.screen = Screen::Upload;
        self.source = None;
        self.job = None;
        self.saved_to = None;
        self.mark_dirty();
        held
    }

    /// Forgets the in-flight attempt so its reply will be ignored.
    pub(crate) fn abandon_upload(&mut self) -> Option<UploadId> {
        self.upload.take()
    }
}
