use inkjob_core::{update, AppState, Effect, JobStatus, Msg, Screen, UploadId};
use pretty_assertions::assert_eq;

fn init_logging() {
    inkjob_logging::initialize_for_tests();
}

fn progress(job_id: &str, status: JobStatus, progress: u8, message: &str) -> Msg {
    Msg::JobProgress {
        job_id: job_id.to_string(),
        status,
        progress,
        message: message.to_string(),
    }
}

/// Drives a fresh session to the processing screen for job `job_id`.
fn processing(job_id: &str) -> AppState {
    let (state, _) = update(
        AppState::new(),
        Msg::FileChosen {
            path: "sketch.png".to_string(),
        },
    );
    let (state, _) = update(
        state,
        Msg::UploadAccepted {
            upload: UploadId(1),
            job_id: job_id.to_string(),
            preview: "file:///tmp/sketch.png".to_string(),
        },
    );
    state
}

fn comparison(job_id: &str) -> AppState {
    let (state, _) = update(
        processing(job_id),
        Msg::ArtifactReady {
            job_id: job_id.to_string(),
            uri: "file:///tmp/result.png".to_string(),
        },
    );
    state
}

#[test]
fn file_chosen_starts_admission_once() {
    init_logging();
    let (mut state, effects) = update(
        AppState::new(),
        Msg::FileChosen {
            path: "sketch.png".to_string(),
        },
    );

    assert_eq!(
        effects,
        vec![Effect::AdmitAndSubmit {
            upload: UploadId(1),
            path: "sketch.png".to_string()
        }]
    );
    assert!(state.view().uploading);
    assert!(state.consume_dirty());

    // A second pick while the first upload is in flight is ignored.
    let (state, effects) = update(
        state,
        Msg::FileChosen {
            path: "other.png".to_string(),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.view().source.as_deref(), Some("sketch.png"));
}

#[test]
fn scenario_a_reaches_comparison() {
    init_logging();
    let (state, _) = update(
        AppState::new(),
        Msg::FileChosen {
            path: "sketch.png".to_string(),
        },
    );
    let (state, effects) = update(
        state,
        Msg::UploadAccepted {
            upload: UploadId(1),
            job_id: "abc".to_string(),
            preview: "file:///tmp/sketch.png".to_string(),
        },
    );
    assert_eq!(state.screen(), Screen::Processing);
    assert_eq!(
        effects,
        vec![Effect::StartPolling {
            job_id: "abc".to_string()
        }]
    );

    let (state, _) = update(state, progress("abc", JobStatus::Pending, 0, "Initializing..."));
    let (state, _) = update(state, progress("abc", JobStatus::Started, 40, "Processing..."));
    let job = state.view().job.unwrap();
    assert_eq!(job.status, JobStatus::Started);
    assert_eq!(job.progress, 40);
    assert_eq!(job.message, "Processing...");

    let (state, _) = update(state, progress("abc", JobStatus::Success, 100, "Completed!"));
    let (state, effects) = update(
        state,
        Msg::ArtifactReady {
            job_id: "abc".to_string(),
            uri: "file:///tmp/result.png".to_string(),
        },
    );
    assert_eq!(state.screen(), Screen::Comparison);
    assert_eq!(
        effects,
        vec![Effect::AcceptArtifact {
            job_id: "abc".to_string()
        }]
    );
    let view = state.view();
    assert_eq!(view.artifact.as_deref(), Some("file:///tmp/result.png"));
    assert_eq!(view.source.as_deref(), Some("file:///tmp/sketch.png"));
}

#[test]
fn progress_is_last_value_wins() {
    init_logging();
    let (state, _) = update(processing("abc"), progress("abc", JobStatus::Started, 70, "a"));
    let (state, _) = update(state, progress("abc", JobStatus::Started, 30, "b"));

    let job = state.view().job.unwrap();
    assert_eq!(job.progress, 30);
    assert_eq!(job.message, "b");
}

#[test]
fn unknown_status_labels_are_shown_verbatim() {
    init_logging();
    let (state, _) = update(
        processing("abc"),
        progress("abc", JobStatus::Other("WAITING".to_string()), 10, "Waiting..."),
    );

    let job = state.view().job.unwrap();
    assert_eq!(job.status.to_string(), "WAITING");
    assert!(!job.status.is_terminal());
}

#[test]
fn progress_for_another_job_is_ignored() {
    init_logging();
    let state = processing("abc");
    let before = state.view().job;

    let (state, effects) = update(state, progress("old", JobStatus::Started, 90, "late"));
    assert!(effects.is_empty());
    assert_eq!(state.view().job, before);
}

#[test]
fn stale_artifact_is_discarded() {
    init_logging();
    let (state, effects) = update(
        processing("abc"),
        Msg::ArtifactReady {
            job_id: "old".to_string(),
            uri: "file:///tmp/old.png".to_string(),
        },
    );

    assert_eq!(state.screen(), Screen::Processing);
    assert_eq!(
        effects,
        vec![Effect::DiscardArtifact {
            job_id: "old".to_string()
        }]
    );
}

#[test]
fn second_artifact_for_same_job_is_discarded() {
    init_logging();
    let (state, effects) = update(
        comparison("abc"),
        Msg::ArtifactReady {
            job_id: "abc".to_string(),
            uri: "file:///tmp/again.png".to_string(),
        },
    );

    assert_eq!(
        effects,
        vec![Effect::DiscardArtifact {
            job_id: "abc".to_string()
        }]
    );
    assert_eq!(
        state.view().artifact.as_deref(),
        Some("file:///tmp/result.png")
    );
}

#[test]
fn download_moves_to_thank_you_and_keeps_artifact() {
    init_logging();
    let (state, effects) = update(
        comparison("abc"),
        Msg::DownloadClicked {
            destination: Some("out.png".to_string()),
        },
    );

    assert_eq!(state.screen(), Screen::ThankYou);
    assert_eq!(
        effects,
        vec![Effect::SaveArtifact {
            destination: Some("out.png".to_string())
        }]
    );
    assert!(state.holds_artifact());

    let (state, _) = update(
        state,
        Msg::ArtifactSaved {
            path: "out.png".to_string(),
        },
    );
    assert_eq!(state.view().saved_to.as_deref(), Some("out.png"));
}

#[test]
fn download_outside_comparison_is_ignored() {
    init_logging();
    let (state, effects) = update(
        processing("abc"),
        Msg::DownloadClicked { destination: None },
    );
    assert!(effects.is_empty());
    assert_eq!(state.screen(), Screen::Processing);
}

#[test]
fn start_over_from_comparison_releases_artifact() {
    init_logging();
    let (state, effects) = update(comparison("abc"), Msg::StartOverClicked);

    assert_eq!(state.screen(), Screen::Upload);
    assert_eq!(effects, vec![Effect::ReleaseArtifact]);
    let view = state.view();
    assert_eq!(view.job, None);
    assert_eq!(view.artifact, None);
    assert_eq!(view.source, None);
}

#[test]
fn start_over_from_thank_you_releases_artifact_once() {
    init_logging();
    let (state, _) = update(
        comparison("abc"),
        Msg::DownloadClicked { destination: None },
    );
    let (state, effects) = update(state, Msg::StartOverClicked);
    assert_eq!(effects, vec![Effect::ReleaseArtifact]);

    // Nothing left to release on a second reset.
    let (state, effects) = update(state, Msg::StartOverClicked);
    assert!(effects.is_empty());
    assert_eq!(state.screen(), Screen::Upload);
}

#[test]
fn start_over_while_processing_cancels_polling() {
    init_logging();
    let (state, effects) = update(processing("abc"), Msg::StartOverClicked);

    assert_eq!(state.screen(), Screen::Upload);
    assert_eq!(effects, vec![Effect::CancelPolling]);

    // The cancelled job's artifact can no longer be adopted.
    let (_state, effects) = update(
        state,
        Msg::ArtifactReady {
            job_id: "abc".to_string(),
            uri: "file:///tmp/late.png".to_string(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::DiscardArtifact {
            job_id: "abc".to_string()
        }]
    );
}

#[test]
fn repeated_sessions_start_clean() {
    init_logging();
    let (state, _) = update(comparison("first"), Msg::StartOverClicked);
    let (state, _) = update(
        state,
        Msg::FileChosen {
            path: "second.png".to_string(),
        },
    );
    let (state, effects) = update(
        state,
        Msg::UploadAccepted {
            upload: UploadId(2),
            job_id: "second".to_string(),
            preview: "file:///tmp/second.png".to_string(),
        },
    );

    assert_eq!(
        effects,
        vec![Effect::StartPolling {
            job_id: "second".to_string()
        }]
    );
    let job = state.view().job.unwrap();
    assert_eq!(job.job_id, "second");
    assert_eq!(job.progress, 0);
    assert_eq!(state.view().artifact, None);
}
