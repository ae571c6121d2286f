//! Scratch-file lifecycle for in-flight uploads.
//!
//! A [`StagingScope`] is opened per ingestion. Every path that may appear on
//! disk is registered with the scope *before* the operation that could create
//! it, and the scope removes all registered paths in reverse order when it is
//! cleaned up or dropped. Drop covers early returns, panics and a cancelled
//! request future alike.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

const STAGED_PREFIX: &str = "tubely-upload-";
const STAGED_SUFFIX: &str = ".mp4";
const COPY_BUF_SIZE: usize = 64 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    /// The upload stream itself failed mid-read.
    #[error("failed to read upload: {0}")]
    Read(#[source] io::Error),

    /// The scratch filesystem failed.
    #[error("failed to write staged file: {0}")]
    Write(#[source] io::Error),

    #[error("upload exceeds {limit} bytes")]
    TooLarge { limit: u64 },
}

/// The process-wide scratch area.
#[derive(Debug, Clone)]
pub struct StagingArea {
    scratch_dir: PathBuf,
}

impl StagingArea {
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Open a cleanup scope for one unit of work.
    pub fn scope(&self) -> StagingScope {
        StagingScope {
            scratch_dir: self.scratch_dir.clone(),
            registered: Vec::new(),
        }
    }
}

/// Registration list of scratch paths owned by one ingestion.
#[derive(Debug)]
pub struct StagingScope {
    scratch_dir: PathBuf,
    registered: Vec<PathBuf>,
}

/// A staged upload with its write handle still open.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    file: File,
    size: u64,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Make the contents durable and close the handle, so a subprocess
    /// reading by path sees the complete file.
    pub async fn flush(mut self) -> Result<PathBuf, StagingError> {
        self.file.flush().await.map_err(StagingError::Write)?;
        self.file.sync_all().await.map_err(StagingError::Write)?;
        Ok(self.path)
    }
}

impl StagingScope {
    /// Schedule `path` for removal when the scope ends.
    pub fn register(&mut self, path: PathBuf) {
        tracing::trace!(path = %path.display(), "registered scratch path");
        self.registered.push(path);
    }

    pub fn registered(&self) -> &[PathBuf] {
        &self.registered
    }

    /// Write `prefix` followed by the rest of `rest` into a new uniquely named
    /// scratch file. At most `max_bytes` in total are accepted.
    pub async fn stage<R>(
        &mut self,
        prefix: &[u8],
        rest: &mut R,
        max_bytes: u64,
    ) -> Result<StagedFile, StagingError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let (std_file, path) = tempfile::Builder::new()
            .prefix(STAGED_PREFIX)
            .suffix(STAGED_SUFFIX)
            .tempfile_in(&self.scratch_dir)
            .and_then(|named| named.keep().map_err(|e| e.error))
            .map_err(StagingError::Write)?;
        self.register(path.clone());

        let mut file = File::from_std(std_file);

        if prefix.len() as u64 > max_bytes {
            return Err(StagingError::TooLarge { limit: max_bytes });
        }
        file.write_all(prefix).await.map_err(StagingError::Write)?;
        let mut size = prefix.len() as u64;

        let mut buf = vec![0u8; COPY_BUF_SIZE];
        loop {
            let n = rest.read(&mut buf).await.map_err(StagingError::Read)?;
            if n == 0 {
                break;
            }
            size += n as u64;
            if size > max_bytes {
                return Err(StagingError::TooLarge { limit: max_bytes });
            }
            file.write_all(&buf[..n])
                .await
                .map_err(StagingError::Write)?;
        }

        tracing::debug!(path = %path.display(), size_bytes = size, "upload staged");

        Ok(StagedFile { path, file, size })
    }

    /// Remove every registered path, newest first. Safe to call repeatedly.
    pub async fn release(&mut self) {
        while let Some(path) = self.registered.pop() {
            log_removal(&path, tokio::fs::remove_file(&path).await);
        }
    }

    /// Blocking form of [`release`](Self::release), for `Drop`.
    pub fn cleanup(&mut self) {
        while let Some(path) = self.registered.pop() {
            log_removal(&path, std::fs::remove_file(&path));
        }
    }
}

fn log_removal(path: &Path, result: io::Result<()>) {
    match result {
        Ok(()) => tracing::debug!(path = %path.display(), "removed scratch file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            "failed to remove scratch file"
        ),
    }
}

impl Drop for StagingScope {
    fn drop(&mut self) {
        self.cleanup();
    }
}
