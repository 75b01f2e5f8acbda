//! Inkjob core: pure session state machine and view-model helpers.
mod effect;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use state::{AppState, BannerId, JobStatus, Screen, Stage, UploadId, ERROR_DISPLAY};
pub use update::update;
pub use view_model::{AppViewModel, ErrorBannerView, JobRowView};
