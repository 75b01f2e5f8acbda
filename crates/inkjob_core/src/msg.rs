use crate::{BannerId, JobStatus, Stage, UploadId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User picked an image to submit.
    FileChosen { path: String },
    /// The service accepted the upload and created a job.
    UploadAccepted {
        upload: UploadId,
        job_id: String,
        preview: String,
    },
    /// Admission or upload of attempt `upload` failed.
    UploadFailed {
        upload: UploadId,
        stage: Stage,
        message: String,
    },
    /// A status poll answered for a job.
    JobProgress {
        job_id: String,
        status: JobStatus,
        progress: u8,
        message: String,
    },
    /// The processed artifact for a job is available locally at `uri`.
    ArtifactReady { job_id: String, uri: String },
    /// A job or the save of its artifact failed; `job_id` is `None` for saves.
    StageFailed {
        job_id: Option<String>,
        stage: Stage,
        message: String,
    },
    /// The display timer for an error banner ran out.
    ErrorExpired { banner: BannerId },
    /// User asked to download the result.
    DownloadClicked { destination: Option<String> },
    /// The artifact was written to `path`.
    ArtifactSaved { path: String },
    /// User asked to start over.
    StartOverClicked,
}
