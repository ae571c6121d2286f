//! Media prober - geometry extraction via ffprobe and aspect classification

use serde::Deserialize;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;

use super::{diagnostic_suffix, diagnostic_text, validate_tool_path};

const LANDSCAPE_RATIO: f64 = 16.0 / 9.0;
const PORTRAIT_RATIO: f64 = 9.0 / 16.0;
const ASPECT_TOLERANCE: f64 = 0.02;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("invalid ffprobe executable: {0}")]
    InvalidExecutable(String),

    #[error("failed to run ffprobe: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("ffprobe exited with {status}{}", diagnostic_suffix(.stderr))]
    ExecutionFailed {
        status: ExitStatus,
        stderr: Option<String>,
    },

    #[error("could not decode ffprobe output: {0}")]
    UnparseableOutput(#[source] serde_json::Error),

    #[error("no video stream with positive dimensions")]
    NoVideoStream,
}

/// Width and height of the first usable video stream. Both are positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaGeometry {
    pub width: u32,
    pub height: u32,
}

impl MediaGeometry {
    pub fn aspect_class(&self) -> AspectClass {
        AspectClass::classify(self.width, self.height)
    }
}

/// Coarse orientation bucket, always derived from geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectClass {
    Landscape,
    Portrait,
    Other,
}

impl AspectClass {
    /// 16:9 and 9:16 within a fixed tolerance of 0.02 (inclusive); anything
    /// else is `Other`.
    pub fn classify(width: u32, height: u32) -> Self {
        if width == 0 || height == 0 {
            return AspectClass::Other;
        }
        let ratio = f64::from(width) / f64::from(height);
        if (ratio - LANDSCAPE_RATIO).abs() <= ASPECT_TOLERANCE {
            AspectClass::Landscape
        } else if (ratio - PORTRAIT_RATIO).abs() <= ASPECT_TOLERANCE {
            AspectClass::Portrait
        } else {
            AspectClass::Other
        }
    }

    /// Object-store folder for this class.
    pub fn folder(&self) -> &'static str {
        match self {
            AspectClass::Landscape => "landscape",
            AspectClass::Portrait => "portrait",
            AspectClass::Other => "other",
        }
    }
}

impl std::fmt::Display for AspectClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.folder())
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    codec_type: String,
    #[serde(default)]
    width: i64,
    #[serde(default)]
    height: i64,
}

/// First stream that is a video stream with both dimensions positive.
fn select_geometry(stdout: &[u8]) -> Result<MediaGeometry, ProbeError> {
    let output: ProbeOutput =
        serde_json::from_slice(stdout).map_err(ProbeError::UnparseableOutput)?;

    output
        .streams
        .iter()
        .filter(|s| s.codec_type == "video")
        .find_map(|s| {
            let width = u32::try_from(s.width).ok().filter(|w| *w > 0)?;
            let height = u32::try_from(s.height).ok().filter(|h| *h > 0)?;
            Some(MediaGeometry { width, height })
        })
        .ok_or(ProbeError::NoVideoStream)
}

pub struct MediaProber {
    ffprobe_path: String,
}

impl MediaProber {
    pub fn new(ffprobe_path: String) -> Result<Self, ProbeError> {
        validate_tool_path(&ffprobe_path).map_err(ProbeError::InvalidExecutable)?;
        Ok(Self { ffprobe_path })
    }

    /// Geometry of the first video stream in the file at `video_path`.
    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffprobe",
        process.executable.path = %self.ffprobe_path,
        ffmpeg.operation = "probe"
    ))]
    pub async fn probe_geometry(&self, video_path: &Path) -> Result<MediaGeometry, ProbeError> {
        let start = std::time::Instant::now();

        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "error", "-print_format", "json", "-show_streams"])
            .arg(video_path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(ProbeError::Spawn)?;

        if !output.status.success() {
            return Err(ProbeError::ExecutionFailed {
                status: output.status,
                stderr: diagnostic_text(&output.stderr),
            });
        }

        let geometry = select_geometry(&output.stdout)?;

        tracing::info!(
            duration_ms = start.elapsed().as_millis() as u64,
            width = geometry.width,
            height = geometry.height,
            "Video probe completed"
        );

        Ok(geometry)
    }

    /// Aspect class of the file at `video_path`.
    pub async fn probe(&self, video_path: &Path) -> Result<AspectClass, ProbeError> {
        Ok(self.probe_geometry(video_path).await?.aspect_class())
    }
}
