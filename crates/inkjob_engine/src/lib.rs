//! Inkjob engine: admission, the service client and the job pipeline.
mod admission;
mod artifact;
mod engine;
mod job;
mod persist;
mod poll;
mod resize;
mod retrieve;
mod service;
mod submit;
mod types;

pub use admission::{admit, validate, AdmissionPolicy, Verdict};
pub use artifact::{ArtifactError, ArtifactHandle, ArtifactStore};
pub use engine::{Engine, EngineConfig};
pub use job::{Job, JobStatus, Observation, StatusReport, Terminal};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use poll::{PollOutcome, PollSettings, StatusPoller};
pub use resize::{fit_within, resize_to_fit, ResizeSettings};
pub use retrieve::retrieve;
pub use service::{
    Download, EnvelopeStatus, ProcessingService, ReqwestService, ServiceError, ServiceFailure,
    ServiceSettings, StatusEnvelope, UploadEnvelope,
};
pub use submit::submit;
pub use types::{
    guess_mime, CandidateImage, Dimensions, ImageKind, JobId, JobProgress, PipelineError,
    ProgressSink,
};
pub use image::imageops::FilterType;
