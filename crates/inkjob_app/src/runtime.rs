//! Session runtime: owns the state machine and carries out its effects.
//!
//! Pipeline stages run as tokio tasks and report back over one channel, so
//! `AppState` and the held artifact are only ever touched from the runtime.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use inkjob_core::{update, AppState, AppViewModel, Effect, JobStatus, Msg, Stage, UploadId};
use inkjob_engine::{
    guess_mime, ArtifactHandle, AtomicFileWriter, CandidateImage, Engine, Job, JobId,
    JobProgress, PipelineError, ProgressSink,
};
use inkjob_logging::{ink_debug, ink_error, ink_info, ink_warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Something a background task hands back to the runtime.
#[derive(Debug)]
pub enum Inbound {
    Msg(Msg),
    Artifact { job_id: String, handle: ArtifactHandle },
}

struct ActivePoll {
    job_id: String,
    cancel: CancellationToken,
}

struct ActiveSubmission {
    upload: UploadId,
    cancel: CancellationToken,
}

pub struct SessionRuntime {
    state: AppState,
    engine: Engine,
    output: PathBuf,
    tx: mpsc::UnboundedSender<Inbound>,
    rx: mpsc::UnboundedReceiver<Inbound>,
    poll: Option<ActivePoll>,
    submission: Option<ActiveSubmission>,
    /// Artifacts handed over by a poller but not yet accepted by the state machine.
    pending: HashMap<String, ArtifactHandle>,
    held: Option<ArtifactHandle>,
}

impl SessionRuntime {
    pub fn new(engine: Engine, output: PathBuf) -> Self {
        Self::with_state(engine, output, AppState::new())
    }

    /// Like [`SessionRuntime::new`] with a custom error banner display time.
    pub fn with_error_display(engine: Engine, output: PathBuf, error_display: Duration) -> Self {
        Self::with_state(engine, output, AppState::with_error_display(error_display))
    }

    fn with_state(engine: Engine, output: PathBuf, state: AppState) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            state,
            engine,
            output,
            tx,
            rx,
            poll: None,
            submission: None,
            pending: HashMap::new(),
            held: None,
        }
    }

    pub fn view(&self) -> AppViewModel {
        self.state.view()
    }

    /// The view, if anything changed since the last call.
    pub fn take_render(&mut self) -> Option<AppViewModel> {
        let view = self.state.view();
        self.state.consume_dirty().then_some(view)
    }

    /// The artifact currently held by the session, if any.
    pub fn artifact(&self) -> Option<&ArtifactHandle> {
        self.held.as_ref()
    }

    /// Applies one message and runs the effects it produces.
    pub fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        for effect in effects {
            self.run_effect(effect);
        }
    }

    /// Waits for the next report from a background task and applies it.
    pub async fn step(&mut self) {
        // `self.tx` keeps the channel open, so `recv` only yields `Some`.
        if let Some(inbound) = self.rx.recv().await {
            self.handle_inbound(inbound);
        }
    }

    fn handle_inbound(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Msg(msg) => self.dispatch(msg),
            Inbound::Artifact { job_id, handle } => {
                let uri = handle.uri().to_string();
                if let Some(previous) = self.pending.insert(job_id.clone(), handle) {
                    release(previous);
                }
                self.dispatch(Msg::ArtifactReady { job_id, uri });
            }
        }
    }

    fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::AdmitAndSubmit { upload, path } => self.spawn_submission(upload, path),
            Effect::CancelSubmission => self.cancel_submission(),
            Effect::StartPolling { job_id } => self.start_polling(job_id),
            Effect::CancelPolling => self.cancel_polling(),
            Effect::ScheduleErrorClear { banner, after } => {
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = tx.send(Inbound::Msg(Msg::ErrorExpired { banner }));
                });
            }
            Effect::AcceptArtifact { job_id } => {
                if let Some(handle) = self.pending.remove(&job_id) {
                    if let Some(previous) = self.held.replace(handle) {
                        release(previous);
                    }
                }
            }
            Effect::DiscardArtifact { job_id } => {
                if let Some(handle) = self.pending.remove(&job_id) {
                    ink_info!("Discarding late artifact for job {}", job_id);
                    release(handle);
                }
            }
            Effect::ReleaseArtifact => {
                if let Some(handle) = self.held.take() {
                    release(handle);
                }
            }
            Effect::SaveArtifact { destination } => {
                let destination = destination.map(PathBuf::from).unwrap_or_else(|| self.output.clone());
                let msg = match self.save_held(&destination) {
                    Ok(path) => Msg::ArtifactSaved {
                        path: path.display().to_string(),
                    },
                    Err(message) => Msg::StageFailed {
                        job_id: None,
                        stage: Stage::Save,
                        message,
                    },
                };
                let _ = self.tx.send(Inbound::Msg(msg));
            }
        }
    }

    fn spawn_submission(&mut self, upload: UploadId, path: String) {
        self.cancel_submission();
        let cancel = CancellationToken::new();
        self.submission = Some(ActiveSubmission {
            upload,
            cancel: cancel.clone(),
        });

        let engine = self.engine.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                result = admit_and_submit(&engine, &path) => result,
            };
            let msg = match result {
                Ok(job) => Msg::UploadAccepted {
                    upload,
                    job_id: job.id().to_string(),
                    preview: path,
                },
                Err((stage, err)) => Msg::UploadFailed {
                    upload,
                    stage,
                    message: err.to_string(),
                },
            };
            let _ = tx.send(Inbound::Msg(msg));
        });
    }

    fn cancel_submission(&mut self) {
        if let Some(submission) = self.submission.take() {
            ink_debug!("Cancelling submission {:?}", submission.upload);
            submission.cancel.cancel();
        }
    }

    fn start_polling(&mut self, job_id: String) {
        self.cancel_polling();
        let cancel = CancellationToken::new();
        self.poll = Some(ActivePoll {
            job_id: job_id.clone(),
            cancel: cancel.clone(),
        });

        let engine = self.engine.clone();
        let tx = self.tx.clone();
        ink_debug!("Polling job {}", job_id);
        tokio::spawn(async move {
            let sink = ChannelSink { tx: tx.clone() };
            let job = Job::new(JobId::new(job_id.clone()));
            match engine.track(job, &cancel, &sink).await {
                Ok(Some(handle)) => {
                    let _ = tx.send(Inbound::Artifact { job_id, handle });
                }
                Ok(None) => {}
                Err(err) => {
                    let stage = match err {
                        PipelineError::DownloadError(_) => Stage::Download,
                        _ => Stage::Processing,
                    };
                    let _ = tx.send(Inbound::Msg(Msg::StageFailed {
                        job_id: Some(job_id),
                        stage,
                        message: err.to_string(),
                    }));
                }
            }
        });
    }

    fn cancel_polling(&mut self) {
        if let Some(poll) = self.poll.take() {
            ink_debug!("Cancelling poller for job {}", poll.job_id);
            poll.cancel.cancel();
        }
    }

    fn save_held(&self, destination: &Path) -> Result<PathBuf, String> {
        let handle = self
            .held
            .as_ref()
            .ok_or_else(|| "No processed image to save".to_string())?;
        let bytes = handle.read().map_err(|err| err.to_string())?;
        let (writer, filename) = AtomicFileWriter::for_path(destination).map_err(|err| err.to_string())?;
        let path = writer.write(&filename, &bytes).map_err(|err| {
            ink_error!("Failed to save artifact to {:?}: {}", destination, err);
            format!("Failed to save image: {err}")
        })?;
        ink_info!("Saved artifact for job {} to {:?}", handle.job_id(), path);
        Ok(path)
    }

    /// Stops background work and releases every artifact still owned.
    pub fn shutdown(&mut self) {
        self.cancel_submission();
        self.cancel_polling();
        for (_, handle) in self.pending.drain() {
            release(handle);
        }
        if let Some(handle) = self.held.take() {
            release(handle);
        }
    }
}

impl Drop for SessionRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn admit_and_submit(engine: &Engine, path: &str) -> Result<Job, (Stage, PipelineError)> {
    let file_path = Path::new(path);
    let bytes = tokio::fs::read(file_path).await.map_err(|err| {
        (
            Stage::Admission,
            PipelineError::DecodeError(format!("cannot read {path}: {err}")),
        )
    })?;
    let file_name = file_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());
    let candidate = CandidateImage::new(file_name, guess_mime(file_path), bytes);

    let admitted = engine
        .admit(candidate)
        .await
        .map_err(|err| (Stage::Admission, err))?;
    engine
        .submit(&admitted)
        .await
        .map_err(|err| (Stage::Upload, err))
}

fn release(handle: ArtifactHandle) {
    let job_id = handle.job_id().clone();
    if let Err(err) = handle.release() {
        ink_warn!("Failed to release artifact for job {}: {}", job_id, err);
    }
}

struct ChannelSink {
    tx: mpsc::UnboundedSender<Inbound>,
}

impl ProgressSink for ChannelSink {
    fn report(&self, progress: JobProgress) {
        let _ = self.tx.send(Inbound::Msg(Msg::JobProgress {
            job_id: progress.job_id.to_string(),
            status: map_status(progress.status),
            progress: progress.progress,
            message: progress.message,
        }));
    }
}

fn map_status(status: inkjob_engine::JobStatus) -> JobStatus {
    match status {
        inkjob_engine::JobStatus::Pending => JobStatus::Pending,
        inkjob_engine::JobStatus::Started => JobStatus::Started,
        inkjob_engine::JobStatus::Success => JobStatus::Success,
        inkjob_engine::JobStatus::Failed => JobStatus::Failed,
        inkjob_engine::JobStatus::Other(label) => JobStatus::Other(label),
    }
}
