use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::admission::{admit, AdmissionPolicy};
use crate::artifact::{ArtifactHandle, ArtifactStore};
use crate::poll::{PollOutcome, PollSettings, StatusPoller};
use crate::resize::ResizeSettings;
use crate::retrieve::retrieve;
use crate::service::{ProcessingService, ServiceError, ServiceSettings};
use crate::submit::submit;
use crate::{CandidateImage, Job, PipelineError, ProgressSink};

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub policy: AdmissionPolicy,
    pub resize: ResizeSettings,
    pub service: ServiceSettings,
    pub poll: PollSettings,
}

/// Runs the pipeline stages against one processing service.
///
/// Cheap to clone; clones share the service client and the artifact store.
#[derive(Clone)]
pub struct Engine {
    service: Arc<dyn ProcessingService>,
    policy: AdmissionPolicy,
    resize: ResizeSettings,
    poll: PollSettings,
    artifacts: ArtifactStore,
}

impl Engine {
    pub fn with_service(
        config: EngineConfig,
        service: Arc<dyn ProcessingService>,
        artifacts: ArtifactStore,
    ) -> Self {
        Self {
            service,
            policy: config.policy,
            resize: config.resize,
            poll: config.poll,
            artifacts,
        }
    }

    pub fn policy(&self) -> &AdmissionPolicy {
        &self.policy
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    pub async fn admit(&self, candidate: CandidateImage) -> Result<CandidateImage, PipelineError> {
        admit(&self.policy, &self.resize, candidate).await
    }

    pub async fn submit(&self, image: &CandidateImage) -> Result<Job, PipelineError> {
        submit(self.service.as_ref(), image).await
    }

    /// Polls `job` to completion and fetches its artifact.
    ///
    /// Returns `Ok(None)` when `cancel` fired first; no artifact is fetched then.
    pub async fn track(
        &self,
        mut job: Job,
        cancel: &CancellationToken,
        sink: &dyn ProgressSink,
    ) -> Result<Option<ArtifactHandle>, PipelineError> {
        let poller = StatusPoller::new(self.service.as_ref(), self.poll);
        match poller.run(&mut job, cancel, sink).await? {
            PollOutcome::Aborted => Ok(None),
            PollOutcome::Succeeded if cancel.is_cancelled() => Ok(None),
            PollOutcome::Succeeded => {
                retrieve(self.service.as_ref(), &self.artifacts, &mut job)
                    .await
                    .map(Some)
            }
        }
    }

    pub async fn health(&self) -> Result<(), ServiceError> {
        self.service.health().await
    }
}
