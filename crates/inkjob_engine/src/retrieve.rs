use inkjob_logging::{ink_info, ink_warn};

use crate::artifact::{ArtifactHandle, ArtifactStore};
use crate::service::{MessageEnvelope, ProcessingService};
use crate::{Job, PipelineError};

const DEFAULT_DOWNLOAD_ERROR: &str = "Failed to download processed image";

/// Fetches the artifact of a succeeded job into a locally scoped handle.
///
/// Only one fetch is ever issued per job; a second call fails without
/// touching the network.
pub async fn retrieve(
    service: &dyn ProcessingService,
    store: &ArtifactStore,
    job: &mut Job,
) -> Result<ArtifactHandle, PipelineError> {
    if !job.claim_download() {
        return Err(PipelineError::DownloadError(format!(
            "job {} has no pending download",
            job.id()
        )));
    }
    let job_id = job.id().clone();

    let download = service.download(&job_id).await.map_err(|err| {
        ink_warn!("Download for job {} failed: {}", job_id, err);
        PipelineError::DownloadError(err.to_string())
    })?;

    // Some failures arrive as a 2xx JSON envelope rather than an image.
    let is_json = download
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.trim_start().starts_with("application/json"));
    if is_json {
        let message = serde_json::from_slice::<MessageEnvelope>(&download.bytes)
            .ok()
            .and_then(|envelope| envelope.message)
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| DEFAULT_DOWNLOAD_ERROR.to_string());
        ink_warn!("Download for job {} returned an error body: {}", job_id, message);
        return Err(PipelineError::DownloadError(message));
    }
    if download.bytes.is_empty() {
        return Err(PipelineError::DownloadError("empty response body".to_string()));
    }

    let handle = store
        .create(&job_id, &download.bytes, download.content_type)
        .map_err(|err| PipelineError::DownloadError(err.to_string()))?;
    ink_info!(
        "Fetched artifact for job {} ({} bytes)",
        job_id,
        handle.byte_len()
    );
    Ok(handle)
}
