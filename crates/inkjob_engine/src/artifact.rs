//! Local, scoped storage for downloaded artifacts.
//!
//! Each artifact lives in its own temporary file and is addressed by that
//! file's `file://` URI. The handle must be given back through
//! [`ArtifactHandle::release`]; dropping it unreleased still removes the file
//! but is logged as a leak.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use inkjob_logging::{ink_debug, ink_warn};
use tempfile::NamedTempFile;
use url::Url;

use crate::JobId;

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("artifact path {0:?} has no file uri")]
    Uri(PathBuf),
    #[error("artifact was already released")]
    Released,
}

#[derive(Debug, Clone, Default)]
pub struct ArtifactStore {
    dir: Option<PathBuf>,
    live: Arc<AtomicUsize>,
}

impl ArtifactStore {
    /// A store backed by the system temp directory.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of handles created by this store and not yet released or dropped.
    pub fn live_count(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn create(
        &self,
        job_id: &JobId,
        bytes: &[u8],
        content_type: Option<String>,
    ) -> Result<ArtifactHandle, ArtifactError> {
        let suffix = match content_type.as_deref().map(essence) {
            Some("image/jpeg") => ".jpg",
            Some("image/png") | None => ".png",
            Some(_) => ".bin",
        };
        let mut builder = tempfile::Builder::new();
        builder.prefix("inkjob-").suffix(suffix);
        let mut file = match &self.dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        io::Write::write_all(&mut file, bytes)?;
        io::Write::flush(&mut file)?;

        let uri = Url::from_file_path(file.path())
            .map_err(|()| ArtifactError::Uri(file.path().to_path_buf()))?;
        self.live.fetch_add(1, Ordering::SeqCst);
        ink_debug!("Stored artifact for job {} at {}", job_id, uri);

        Ok(ArtifactHandle {
            job_id: job_id.clone(),
            file: Some(file),
            uri,
            content_type,
            byte_len: bytes.len() as u64,
            live: self.live.clone(),
        })
    }
}

fn essence(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or(content_type).trim()
}

/// Owned reference to one downloaded artifact.
#[derive(Debug)]
pub struct ArtifactHandle {
    job_id: JobId,
    file: Option<NamedTempFile>,
    uri: Url,
    content_type: Option<String>,
    byte_len: u64,
    live: Arc<AtomicUsize>,
}

impl ArtifactHandle {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn byte_len(&self) -> u64 {
        self.byte_len
    }

    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(|file| file.path())
    }

    pub fn read(&self) -> Result<Vec<u8>, ArtifactError> {
        let path = self.path().ok_or(ArtifactError::Released)?;
        Ok(std::fs::read(path)?)
    }

    /// Deletes the backing file. Consumes the handle so it cannot run twice.
    pub fn release(mut self) -> Result<(), ArtifactError> {
        let file = self.file.take().ok_or(ArtifactError::Released)?;
        self.live.fetch_sub(1, Ordering::SeqCst);
        ink_debug!("Released artifact for job {} ({})", self.job_id, self.uri);
        file.close()?;
        Ok(())
    }
}

impl Drop for ArtifactHandle {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            ink_warn!(
                "Artifact for job {} dropped without release; removing {}",
                self.job_id,
                self.uri
            );
            self.live.fetch_sub(1, Ordering::SeqCst);
            drop(file);
        }
    }
}
