//! Inkjob client: configuration, the session runtime and its terminal front end.
pub mod command;
pub mod config;
pub mod render;
pub mod runtime;
pub mod session;

pub use config::{ClientConfig, ConfigError};
pub use runtime::SessionRuntime;
pub use session::{run_interactive, run_submit, SubmitOutcome};
