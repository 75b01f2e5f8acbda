use crate::{AppState, Effect, Msg, Screen};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::FileChosen { path } => {
            // One submission at a time, and only from the upload screen.
            if state.screen() != Screen::Upload || state.is_uploading() {
                return (state, Vec::new());
            }
            let upload = state.begin_upload(path.clone());
            vec![Effect::AdmitAndSubmit { upload, path }]
        }
        Msg::UploadAccepted {
            upload,
            job_id,
            preview,
        } => {
            // Replies from an abandoned attempt must not resurrect it.
            if state.screen() != Screen::Upload || !state.is_current_upload(upload) {
                return (state, Vec::new());
            }
            state.enter_processing(job_id.clone(), preview);
            vec![Effect::StartPolling { job_id }]
        }
        Msg::UploadFailed {
            upload,
            stage,
            message,
        } => {
            if state.screen() != Screen::Upload || !state.is_current_upload(upload) {
                return (state, Vec::new());
            }
            let banner = state.raise_banner(stage, message);
            vec![Effect::ScheduleErrorClear {
                banner,
                after: state.error_display(),
            }]
        }
        Msg::JobProgress {
            job_id,
            status,
            progress,
            message,
        } => {
            if state.screen() == Screen::Processing && state.is_current_job(&job_id) {
                state.apply_progress(status, progress, message);
            }
            Vec::new()
        }
        Msg::ArtifactReady { job_id, uri } => {
            let live = state.screen() == Screen::Processing
                && state.is_current_job(&job_id)
                && !state.holds_artifact();
            if live {
                state.enter_comparison(uri);
                vec![Effect::AcceptArtifact { job_id }]
            } else {
                vec![Effect::DiscardArtifact { job_id }]
            }
        }
        Msg::StageFailed {
            job_id,
            stage,
            message,
        } => {
            // A report from a job or download that is no longer on screen is stale.
            let live = match job_id.as_deref() {
                Some(job_id) => {
                    state.is_current_job(job_id) && state.screen() == Screen::Processing
                }
                None => state.screen() == Screen::ThankYou,
            };
            if !live {
                return (state, Vec::new());
            }
            let polling = state.screen() == Screen::Processing;
            let banner = state.raise_banner(stage, message);
            let mut effects = Vec::with_capacity(2);
            if polling {
                effects.push(Effect::CancelPolling);
            }
            effects.push(Effect::ScheduleErrorClear {
                banner,
                after: state.error_display(),
            });
            effects
        }
        Msg::ErrorExpired { banner } => {
            // The revert is unconditional: it applies wherever the user is now.
            state.clear_banner_if(banner);
            reset_effects(&mut state)
        }
        Msg::DownloadClicked { destination } => {
            if state.screen() != Screen::Comparison {
                return (state, Vec::new());
            }
            state.enter_thank_you();
            vec![Effect::SaveArtifact { destination }]
        }
        Msg::ArtifactSaved { path } => {
            state.record_saved(path);
            Vec::new()
        }
        Msg::StartOverClicked => {
            state.clear_banner();
            let abandoned = state.abandon_upload();
            let mut effects = reset_effects(&mut state);
            if abandoned.is_some() {
                effects.insert(0, Effect::CancelSubmission);
            }
            effects
        }
    };

    (state, effects)
}

fn reset_effects(state: &mut AppState) -> Vec<Effect> {
    let polling = state.screen() == Screen::Processing;
    let held_artifact = state.reset_to_upload();
    let mut effects = Vec::with_capacity(2);
    if polling {
        effects.push(Effect::CancelPolling);
    }
    if held_artifact {
        effects.push(Effect::ReleaseArtifact);
    }
    effects
}
