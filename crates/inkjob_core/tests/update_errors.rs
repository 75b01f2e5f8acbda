use std::time::Duration;

use inkjob_core::{
    update, AppState, BannerId, Effect, JobStatus, Msg, Screen, Stage, UploadId, ERROR_DISPLAY,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    inkjob_logging::initialize_for_tests();
}

fn choose_file(state: AppState) -> AppState {
    update(
        state,
        Msg::FileChosen {
            path: "sketch.png".to_string(),
        },
    )
    .0
}

fn processing(job_id: &str) -> AppState {
    let (state, _) = update(
        choose_file(AppState::new()),
        Msg::UploadAccepted {
            upload: UploadId(1),
            job_id: job_id.to_string(),
            preview: "sketch.png".to_string(),
        },
    );
    state
}

fn upload_failure(upload: u64, stage: Stage, message: &str) -> Msg {
    Msg::UploadFailed {
        upload: UploadId(upload),
        stage,
        message: message.to_string(),
    }
}

fn failure(job_id: Option<&str>, stage: Stage, message: &str) -> Msg {
    Msg::StageFailed {
        job_id: job_id.map(str::to_string),
        stage,
        message: message.to_string(),
    }
}

#[test]
fn admission_failure_shows_banner_for_five_seconds() {
    init_logging();
    let (state, effects) = update(
        choose_file(AppState::new()),
        upload_failure(1, Stage::Admission, "Only JPG and PNG images are supported"),
    );

    assert_eq!(
        effects,
        vec![Effect::ScheduleErrorClear {
            banner: BannerId(1),
            after: ERROR_DISPLAY,
        }]
    );
    assert_eq!(ERROR_DISPLAY, Duration::from_secs(5));
    let view = state.view();
    assert!(!view.uploading);
    let banner = view.error.unwrap();
    assert_eq!(banner.message, "Only JPG and PNG images are supported");
    assert_eq!(banner.stage, Stage::Admission);

    let (state, effects) = update(state, Msg::ErrorExpired { banner: BannerId(1) });
    assert!(effects.is_empty());
    assert_eq!(state.view().error, None);
    assert_eq!(state.screen(), Screen::Upload);
}

#[test]
fn scenario_d_processing_failure_reverts_to_upload() {
    init_logging();
    let (state, _) = update(
        processing("abc"),
        Msg::JobProgress {
            job_id: "abc".to_string(),
            status: JobStatus::Failed,
            progress: 0,
            message: "corrupt input".to_string(),
        },
    );
    let (state, effects) = update(
        state,
        failure(Some("abc"), Stage::Processing, "corrupt input"),
    );

    assert_eq!(
        effects,
        vec![
            Effect::CancelPolling,
            Effect::ScheduleErrorClear {
                banner: BannerId(1),
                after: ERROR_DISPLAY,
            },
        ]
    );
    // The processing screen stays up underneath the banner until it expires.
    assert_eq!(state.screen(), Screen::Processing);
    assert_eq!(state.view().error.unwrap().message, "corrupt input");

    let (state, effects) = update(state, Msg::ErrorExpired { banner: BannerId(1) });
    assert_eq!(effects, vec![Effect::CancelPolling]);
    assert_eq!(state.screen(), Screen::Upload);
    assert_eq!(state.view().error, None);
    assert_eq!(state.view().job, None);
}

#[test]
fn stale_job_failure_is_ignored() {
    init_logging();
    let state = processing("abc");
    let (state, effects) = update(state, failure(Some("old"), Stage::Processing, "late"));

    assert!(effects.is_empty());
    assert_eq!(state.view().error, None);
    assert_eq!(state.screen(), Screen::Processing);
}

#[test]
fn failure_after_reset_is_ignored() {
    init_logging();
    let (state, _) = update(processing("abc"), Msg::StartOverClicked);
    let (state, effects) = update(state, failure(Some("abc"), Stage::Processing, "late"));

    assert!(effects.is_empty());
    assert_eq!(state.view().error, None);
}

#[test]
fn expiry_forces_upload_even_after_navigation() {
    init_logging();
    // Save failure raised on the thank-you screen.
    let (state, _) = update(
        processing("abc"),
        Msg::ArtifactReady {
            job_id: "abc".to_string(),
            uri: "file:///tmp/result.png".to_string(),
        },
    );
    let (state, _) = update(state, Msg::DownloadClicked { destination: None });
    let (state, effects) = update(state, failure(None, Stage::Save, "disk full"));
    assert_eq!(
        effects,
        vec![Effect::ScheduleErrorClear {
            banner: BannerId(1),
            after: ERROR_DISPLAY,
        }]
    );
    assert_eq!(state.screen(), Screen::ThankYou);

    let (state, effects) = update(state, Msg::ErrorExpired { banner: BannerId(1) });
    assert_eq!(state.screen(), Screen::Upload);
    assert_eq!(effects, vec![Effect::ReleaseArtifact]);
}

#[test]
fn newer_banner_survives_older_expiry() {
    init_logging();
    let (state, _) = update(
        choose_file(AppState::new()),
        upload_failure(1, Stage::Upload, "first"),
    );
    let (state, _) = update(
        choose_file(state),
        upload_failure(2, Stage::Upload, "second"),
    );

    let (state, _) = update(state, Msg::ErrorExpired { banner: BannerId(1) });
    let banner = state.view().error.unwrap();
    assert_eq!(banner.id, BannerId(2));
    assert_eq!(banner.message, "second");

    let (state, _) = update(state, Msg::ErrorExpired { banner: BannerId(2) });
    assert_eq!(state.view().error, None);
}

#[test]
fn custom_error_display_is_carried_by_the_timer_effect() {
    init_logging();
    let state = choose_file(AppState::with_error_display(Duration::from_millis(50)));
    let (_state, effects) = update(state, upload_failure(1, Stage::Upload, "Network error"));

    assert_eq!(
        effects,
        vec![Effect::ScheduleErrorClear {
            banner: BannerId(1),
            after: Duration::from_millis(50),
        }]
    );
}

#[test]
fn start_over_clears_banner() {
    init_logging();
    let (state, _) = update(
        choose_file(AppState::new()),
        upload_failure(1, Stage::Upload, "Upload failed"),
    );
    let (state, _) = update(state, Msg::StartOverClicked);
    assert_eq!(state.view().error, None);
}

#[test]
fn save_failure_after_reset_is_ignored() {
    init_logging();
    let (state, _) = update(
        processing("abc"),
        Msg::ArtifactReady {
            job_id: "abc".to_string(),
            uri: "file:///tmp/result.png".to_string(),
        },
    );
    let (state, _) = update(state, Msg::DownloadClicked { destination: None });
    let (state, _) = update(state, Msg::StartOverClicked);
    let (state, effects) = update(state, failure(None, Stage::Save, "disk full"));

    assert!(effects.is_empty());
    assert_eq!(state.view().error, None);
    assert_eq!(state.screen(), Screen::Upload);
}
