//! Video ingestion: probing, fast-start rewriting and the orchestrator that
//! sequences them.

pub mod ingest;
pub mod prober;
pub mod rewriter;

pub use ingest::{ErrorClass, IngestError, IngestSettings, IngestStage, VideoIngestPipeline};
pub use prober::{AspectClass, MediaGeometry, MediaProber, ProbeError};
pub use rewriter::{ContainerRewriter, RewriteError};

/// Validate that an executable path doesn't contain shell metacharacters or
/// traversal sequences.
pub(crate) fn validate_tool_path(path: &str) -> Result<(), String> {
    let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if path.trim().is_empty() {
        return Err("executable path is empty".to_string());
    }
    if path.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err(format!("path contains dangerous characters: {}", path));
    }
    if path.contains("..") {
        return Err(format!("path contains directory traversal: {}", path));
    }
    Ok(())
}

/// Captured stderr, or `None` when the tool wrote nothing useful.
pub(crate) fn diagnostic_text(stderr: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(stderr).trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// Render an optional diagnostic as a `: <text>` suffix for error messages.
pub(crate) fn diagnostic_suffix(stderr: &Option<String>) -> String {
    stderr
        .as_deref()
        .map(|text| format!(": {}", text))
        .unwrap_or_default()
}
