//! Fast-start container rewriting via ffmpeg stream copy.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;

use super::{diagnostic_suffix, diagnostic_text, validate_tool_path};

const OUTPUT_SUFFIX: &str = ".processing";

#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error("invalid ffmpeg executable: {0}")]
    InvalidExecutable(String),

    #[error("failed to run ffmpeg: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("ffmpeg exited with {status}{}", diagnostic_suffix(.stderr))]
    ExecutionFailed {
        status: ExitStatus,
        stderr: Option<String>,
    },
}

/// Where [`ContainerRewriter::rewrite`] writes its output for `input`.
pub fn output_path_for(input: &Path) -> PathBuf {
    let mut name: OsString = input.as_os_str().to_owned();
    name.push(OUTPUT_SUFFIX);
    PathBuf::from(name)
}

/// Moves the `moov` atom to the front of an MP4 without re-encoding.
pub struct ContainerRewriter {
    ffmpeg_path: String,
}

impl ContainerRewriter {
    pub fn new(ffmpeg_path: String) -> Result<Self, RewriteError> {
        validate_tool_path(&ffmpeg_path).map_err(RewriteError::InvalidExecutable)?;
        Ok(Self { ffmpeg_path })
    }

    /// Remux `input_path` into `<input_path>.processing`. The input is left
    /// in place; a zero exit status is taken as success.
    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffmpeg",
        process.executable.path = %self.ffmpeg_path,
        ffmpeg.operation = "faststart"
    ))]
    pub async fn rewrite(&self, input_path: &Path) -> Result<PathBuf, RewriteError> {
        let start = std::time::Instant::now();
        let output_path = output_path_for(input_path);

        let output = Command::new(&self.ffmpeg_path)
            .arg("-y")
            .arg("-i")
            .arg(input_path)
            .args(["-c", "copy", "-movflags", "faststart", "-f", "mp4"])
            .arg(&output_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(RewriteError::Spawn)?;

        if !output.status.success() {
            return Err(RewriteError::ExecutionFailed {
                status: output.status,
                stderr: diagnostic_text(&output.stderr),
            });
        }

        tracing::info!(
            duration_ms = start.elapsed().as_millis() as u64,
            output = %output_path.display(),
            "Fast-start rewrite completed"
        );

        Ok(output_path)
    }
}
