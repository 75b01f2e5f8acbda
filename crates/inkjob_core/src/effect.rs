use std::time::Duration;

use crate::{BannerId, UploadId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Validate, resize if needed, and upload the image at `path`.
    AdmitAndSubmit { upload: UploadId, path: String },
    /// Abandon the in-flight admission and upload.
    CancelSubmission,
    /// Begin polling `job_id`, replacing any poller that is still alive.
    StartPolling { job_id: String },
    /// Stop the active poller immediately.
    CancelPolling,
    /// Deliver `Msg::ErrorExpired { banner }` after `after` has elapsed.
    ScheduleErrorClear { banner: BannerId, after: Duration },
    /// Take ownership of the artifact fetched for `job_id`.
    AcceptArtifact { job_id: String },
    /// Release an artifact that arrived for a job no longer on screen.
    DiscardArtifact { job_id: String },
    /// Release the artifact currently held by the session.
    ReleaseArtifact,
    /// Write the held artifact to `destination` (or the configured default).
    SaveArtifact { destination: Option<String> },
}
