//! Drivers that feed user intent into a [`SessionRuntime`] and print its view.

use std::path::Path;

use anyhow::{anyhow, Result};
use inkjob_core::{Msg, Screen};
use inkjob_logging::ink_info;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::command::{Command, HELP};
use crate::render::render;
use crate::runtime::SessionRuntime;

/// Outcome of a one-shot submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The result was written to this path.
    Saved(String),
    /// The result was fetched but not saved.
    Fetched,
}

/// Runs one full session for `image`, then resets it.
///
/// Any stage error ends the session early and is returned.
pub async fn run_submit(
    runtime: &mut SessionRuntime,
    image: &Path,
    output: Option<&Path>,
    download: bool,
) -> Result<SubmitOutcome> {
    runtime.dispatch(Msg::FileChosen {
        path: image.display().to_string(),
    });
    let destination = output.map(|path| path.display().to_string());

    loop {
        print_changes(runtime);
        let view = runtime.view();

        if let Some(error) = view.error {
            // No screen to revert here, so reset now instead of waiting out the banner.
            runtime.dispatch(Msg::StartOverClicked);
            return Err(anyhow!(error.message));
        }
        match view.screen {
            Screen::Comparison if !download => {
                runtime.dispatch(Msg::StartOverClicked);
                return Ok(SubmitOutcome::Fetched);
            }
            Screen::Comparison => {
                runtime.dispatch(Msg::DownloadClicked {
                    destination: destination.clone(),
                });
                continue;
            }
            Screen::ThankYou => {
                if let Some(path) = view.saved_to {
                    runtime.dispatch(Msg::StartOverClicked);
                    return Ok(SubmitOutcome::Saved(path));
                }
            }
            Screen::Upload | Screen::Processing => {}
        }

        runtime.step().await;
    }
}

/// Line-oriented session on stdin until `quit` or end of input.
pub async fn run_interactive(runtime: &mut SessionRuntime) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{HELP}");
    print_view(runtime);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match Command::parse(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => apply(runtime, command),
                    Err(message) => println!("{message}"),
                }
            }
            _ = runtime.step() => {}
        }
        print_changes(runtime);
    }

    ink_info!("Interactive session ended");
    runtime.shutdown();
    Ok(())
}

fn apply(runtime: &mut SessionRuntime, command: Command) {
    match command {
        Command::Upload(path) => {
            if runtime.view().screen != Screen::Upload {
                println!("finish or reset the current session first");
                return;
            }
            runtime.dispatch(Msg::FileChosen { path });
        }
        Command::Download(destination) => {
            if runtime.view().screen != Screen::Comparison {
                println!("nothing to download yet");
                return;
            }
            runtime.dispatch(Msg::DownloadClicked { destination });
        }
        Command::Reset => runtime.dispatch(Msg::StartOverClicked),
        Command::Status => print_view(runtime),
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
}

fn print_changes(runtime: &mut SessionRuntime) {
    if let Some(view) = runtime.take_render() {
        for line in render(&view) {
            println!("{line}");
        }
    }
}

fn print_view(runtime: &SessionRuntime) {
    for line in render(&runtime.view()) {
        println!("{line}");
    }
}
