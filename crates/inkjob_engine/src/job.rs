use std::cell::OnceCell;
use std::fmt;

use crate::JobId;

const DEFAULT_FAILURE_MESSAGE: &str = "Processing failed";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Pending,
    Started,
    Success,
    Failed,
    /// Intermediate labels such as `WAITING` or `RUNNING`.
    Other(String),
}

impl JobStatus {
    pub fn parse(label: &str) -> Self {
        match label {
            "PENDING" => JobStatus::Pending,
            "STARTED" => JobStatus::Started,
            "SUCCESS" => JobStatus::Success,
            "FAILED" => JobStatus::Failed,
            other => JobStatus::Other(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => f.write_str("PENDING"),
            JobStatus::Started => f.write_str("STARTED"),
            JobStatus::Success => f.write_str("SUCCESS"),
            JobStatus::Failed => f.write_str("FAILED"),
            JobStatus::Other(label) => f.write_str(label),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    Succeeded,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Still running; display fields were updated.
    Progress,
    /// The job just became terminal. Returned at most once per job.
    Terminal(Terminal),
    /// The job was already terminal; the report was dropped.
    Ignored,
}

/// Client-side view of a server job.
///
/// The terminal outcome is write-once, so completion handling can only ever
/// be triggered by a single report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    id: JobId,
    status: JobStatus,
    progress: u8,
    message: String,
    terminal: OnceCell<Terminal>,
    download_claimed: bool,
}

impl Job {
    pub fn new(id: JobId) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            progress: 0,
            message: String::new(),
            terminal: OnceCell::new(),
            download_claimed: false,
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn status(&self) -> &JobStatus {
        &self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn terminal(&self) -> Option<&Terminal> {
        self.terminal.get()
    }

    pub fn observe(&mut self, report: StatusReport) -> Observation {
        if self.terminal.get().is_some() {
            return Observation::Ignored;
        }

        self.status = report.status;
        self.progress = report.progress.min(100);
        self.message = report.message;

        let outcome = match self.status {
            JobStatus::Success => Terminal::Succeeded,
            JobStatus::Failed => Terminal::Failed {
                message: if self.message.is_empty() {
                    DEFAULT_FAILURE_MESSAGE.to_string()
                } else {
                    self.message.clone()
                },
            },
            _ => return Observation::Progress,
        };
        match self.terminal.set(outcome.clone()) {
            Ok(()) => Observation::Terminal(outcome),
            Err(_) => Observation::Ignored,
        }
    }

    /// Grants the single download allowed for a succeeded job.
    pub(crate) fn claim_download(&mut self) -> bool {
        if self.terminal.get() != Some(&Terminal::Succeeded) || self.download_claimed {
            return false;
        }
        self.download_claimed = true;
        true
    }
}
