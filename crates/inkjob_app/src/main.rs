use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inkjob_app::{run_interactive, run_submit, ClientConfig, SessionRuntime, SubmitOutcome};
use inkjob_engine::{ArtifactStore, Engine, ReqwestService};
use inkjob_logging::{ink_info, LogDestination};
use log::LevelFilter;

#[derive(Debug, Parser)]
#[command(name = "inkjob", version, about = "Submit images for remote inking and fetch the results")]
struct Cli {
    /// RON config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the processing service (overrides the config file).
    #[arg(long, global = true)]
    server: Option<String>,

    /// Also write logs to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Log only to `--log-file`, keeping the terminal for session output.
    #[arg(long, global = true, requires = "log_file")]
    log_only: bool,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Submit one image, wait for the result and save it.
    Submit {
        image: PathBuf,
        /// Where to save the result.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Stop once the result is fetched, without saving it.
        #[arg(long)]
        no_download: bool,
    },
    /// Line-oriented session reading commands from stdin.
    Interactive,
    /// Check that the processing service is reachable.
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let destination = match &cli.log_file {
        Some(path) if cli.log_only => LogDestination::File(path.clone()),
        Some(path) => LogDestination::Both(path.clone()),
        None => LogDestination::Terminal,
    };
    inkjob_logging::initialize(destination, level);

    let mut config = ClientConfig::load(cli.config.as_deref())?;
    if let Some(server) = cli.server {
        config.server_url = server;
    }
    config.validate()?;

    let engine_config = config.to_engine_config();
    let service = ReqwestService::new(engine_config.service.clone())
        .with_context(|| format!("cannot use server url {}", config.server_url))?;
    let artifacts = match &config.artifact_dir {
        Some(dir) => ArtifactStore::in_dir(dir),
        None => ArtifactStore::new(),
    };
    let engine = Engine::with_service(engine_config, Arc::new(service), artifacts);
    ink_info!("Using processing service at {}", config.server_url);

    match cli.command {
        Command::Submit {
            image,
            output,
            no_download,
        } => {
            let mut runtime = SessionRuntime::new(engine, config.output.clone());
            let outcome = run_submit(&mut runtime, &image, output.as_deref(), !no_download).await;
            runtime.shutdown();
            match outcome? {
                SubmitOutcome::Saved(path) => println!("Saved {path}"),
                SubmitOutcome::Fetched => println!("Processing finished"),
            }
        }
        Command::Interactive => {
            let mut runtime = SessionRuntime::new(engine, config.output.clone());
            run_interactive(&mut runtime).await?;
        }
        Command::Check => {
            engine
                .health()
                .await
                .with_context(|| format!("{} is not reachable", config.server_url))?;
            println!("{} is reachable", config.server_url);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_only_needs_a_log_file() {
        assert!(Cli::try_parse_from(["inkjob", "--log-only", "check"]).is_err());

        let cli = Cli::try_parse_from(["inkjob", "--log-file", "ink.log", "--log-only", "check"])
            .unwrap();
        assert!(cli.log_only);
        assert_eq!(cli.log_file, Some(PathBuf::from("ink.log")));
    }
}
