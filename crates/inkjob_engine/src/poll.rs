use std::time::Duration;

use inkjob_logging::{ink_debug, ink_info, ink_warn};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::job::{Observation, StatusReport, Terminal};
use crate::service::{EnvelopeStatus, ProcessingService, StatusEnvelope};
use crate::{Job, JobProgress, JobStatus, PipelineError, ProgressSink};

const DEFAULT_STATUS_ERROR: &str = "Failed to get status";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// Pause between observing success and handing off to retrieval.
    pub settle_delay: Duration,
    /// Client-side limit on the whole job; `None` polls until the service decides.
    pub max_duration: Option<Duration>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            settle_delay: Duration::from_millis(500),
            max_duration: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The job succeeded and the settle delay has passed.
    Succeeded,
    /// The cancellation token fired first.
    Aborted,
}

/// Queries one job's status until it is terminal or the token is cancelled.
pub struct StatusPoller<'a> {
    service: &'a dyn ProcessingService,
    settings: PollSettings,
}

impl<'a> StatusPoller<'a> {
    pub fn new(service: &'a dyn ProcessingService, settings: PollSettings) -> Self {
        Self { service, settings }
    }

    pub async fn run(
        &self,
        job: &mut Job,
        cancel: &CancellationToken,
        sink: &dyn ProgressSink,
    ) -> Result<PollOutcome, PipelineError> {
        let job_id = job.id().clone();
        let started = Instant::now();
        // The first tick completes immediately.
        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    ink_info!("Polling for job {} cancelled", job_id);
                    return Ok(PollOutcome::Aborted);
                }
                _ = ticker.tick() => {}
            }

            if let Some(limit) = self.settings.max_duration {
                let waited = started.elapsed();
                if waited >= limit {
                    ink_warn!("Job {} still not finished after {:?}", job_id, waited);
                    return Err(PipelineError::JobTimedOut { waited });
                }
            }

            let reply = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    ink_info!("Polling for job {} cancelled mid-query", job_id);
                    return Ok(PollOutcome::Aborted);
                }
                reply = self.service.status(&job_id) => reply,
            };
            let envelope = reply.map_err(|err| {
                ink_warn!("Status query for job {} failed: {}", job_id, err);
                PipelineError::NetworkError(err.to_string())
            })?;
            let report = into_report(envelope)?;

            // A cancellation may have landed while the response was in flight.
            if cancel.is_cancelled() {
                ink_info!("Dropping late status for cancelled job {}", job_id);
                return Ok(PollOutcome::Aborted);
            }

            ink_debug!(
                "Job {} is {} ({}%): {}",
                job_id,
                report.status,
                report.progress,
                report.message
            );
            let observation = job.observe(report);
            if observation != Observation::Ignored {
                sink.report(JobProgress {
                    job_id: job_id.clone(),
                    status: job.status().clone(),
                    progress: job.progress(),
                    message: job.message().to_string(),
                });
            }

            match observation {
                Observation::Progress | Observation::Ignored => {}
                Observation::Terminal(Terminal::Failed { message }) => {
                    drop(ticker);
                    ink_warn!("Job {} failed: {}", job_id, message);
                    return Err(PipelineError::ProcessingFailed(message));
                }
                Observation::Terminal(Terminal::Succeeded) => {
                    drop(ticker);
                    ink_info!("Job {} succeeded", job_id);
                    return self.settle(cancel).await;
                }
            }
        }
    }

    async fn settle(&self, cancel: &CancellationToken) -> Result<PollOutcome, PipelineError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(PollOutcome::Aborted),
            _ = tokio::time::sleep(self.settings.settle_delay) => Ok(PollOutcome::Succeeded),
        }
    }
}

fn into_report(envelope: StatusEnvelope) -> Result<StatusReport, PipelineError> {
    if envelope.status != EnvelopeStatus::Success {
        let message = envelope
            .message
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| DEFAULT_STATUS_ERROR.to_string());
        return Err(PipelineError::ProcessingFailed(message));
    }

    let status = envelope
        .job_status
        .as_deref()
        .map(JobStatus::parse)
        .unwrap_or_else(|| JobStatus::Other("UNKNOWN".to_string()));
    let progress = envelope
        .progress
        .filter(|value| value.is_finite())
        .map(|value| value.round().clamp(0.0, 100.0) as u8)
        .unwrap_or(0);
    Ok(StatusReport {
        status,
        progress,
        message: envelope.message.unwrap_or_default(),
    })
}
