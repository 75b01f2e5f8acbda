use inkjob_core::{AppViewModel, Screen, Stage};

/// Turns the view model into the lines shown to the user.
pub fn render(view: &AppViewModel) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(error) = &view.error {
        lines.push(format!("[error:{}] {}", stage_label(error.stage), error.message));
    }

    match view.screen {
        Screen::Upload if view.uploading => {
            let source = view.source.as_deref().unwrap_or("image");
            lines.push(format!("Uploading {source}..."));
        }
        Screen::Upload => lines.push("Ready: choose an image to upload.".to_string()),
        Screen::Processing => {
            if let Some(job) = &view.job {
                lines.push(format!(
                    "Job {} {} {:>3}% {}",
                    job.job_id,
                    job.status,
                    job.progress,
                    progress_bar(job.progress)
                ));
                if !job.message.is_empty() {
                    lines.push(format!("  {}", job.message));
                }
            }
        }
        Screen::Comparison => {
            if let Some(source) = &view.source {
                lines.push(format!("Original:  {source}"));
            }
            if let Some(artifact) = &view.artifact {
                lines.push(format!("Processed: {artifact}"));
            }
        }
        Screen::ThankYou => match &view.saved_to {
            Some(path) => lines.push(format!("Saved to {path}. Thank you!")),
            None => lines.push("Saving...".to_string()),
        },
    }

    lines
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Admission => "admission",
        Stage::Upload => "upload",
        Stage::Processing => "processing",
        Stage::Download => "download",
        Stage::Save => "save",
    }
}

fn progress_bar(progress: u8) -> String {
    const WIDTH: usize = 20;
    let filled = (progress.min(100) as usize * WIDTH) / 100;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(WIDTH - filled))
}
