use inkjob_logging::{ink_info, ink_warn};

use crate::service::{EnvelopeStatus, ProcessingService};
use crate::{CandidateImage, Job, JobId, PipelineError};

const DEFAULT_REJECTION: &str = "Upload failed";

/// Uploads an admitted image once and returns the job the service created.
pub async fn submit(
    service: &dyn ProcessingService,
    image: &CandidateImage,
) -> Result<Job, PipelineError> {
    let envelope = service.upload(image).await.map_err(|err| {
        ink_warn!("Upload of {} failed: {}", image.file_name(), err);
        PipelineError::NetworkError(err.to_string())
    })?;

    match (envelope.status, envelope.job_id) {
        (EnvelopeStatus::Success, Some(job_id)) if !job_id.is_empty() => {
            ink_info!(
                "Upload of {} ({} bytes) accepted as job {}",
                image.file_name(),
                image.byte_len(),
                job_id
            );
            Ok(Job::new(JobId::new(job_id)))
        }
        (status, _) => {
            let message = envelope
                .message
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| DEFAULT_REJECTION.to_string());
            ink_warn!("Upload rejected ({:?}): {}", status, message);
            Err(PipelineError::SubmissionRejected(message))
        }
    }
}
