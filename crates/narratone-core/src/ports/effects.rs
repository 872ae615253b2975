//! Effects collaborator port — the external DSP tool behind a trait.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::ProcessingChain;

/// Result of a successful effects run.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectsOutput {
    /// Where the tool wrote the processed audio.
    pub output_path: PathBuf,

    /// Duration of the processed audio, when the tool reports it.
    pub duration_secs: Option<f64>,

    /// Size of the output file, when the tool reports it.
    pub file_size_bytes: Option<u64>,
}

/// Errors from the effects collaborator.
///
/// Unlike synthesis errors these are never fatal to a preview: the
/// orchestrator falls back to the unprocessed audio and downgrades the
/// failure to a warning event.
#[derive(Debug, thiserror::Error)]
pub enum EffectsError {
    /// The configured tool binary does not exist.
    #[error("Effects tool not found at {0}")]
    ToolNotFound(PathBuf),

    /// The tool ran but exited non-zero.
    #[error("Effects tool exited with {status}: {stderr}")]
    ToolFailed { status: i32, stderr: String },

    /// The tool claimed success but produced no usable output file.
    #[error("Effects tool produced no output at {0}")]
    MissingOutput(PathBuf),

    /// Failed to launch the tool or touch its input/output files.
    #[error("Effects I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Applies a processing chain to an audio file via an external DSP tool.
///
/// `output_key` is the content-derived cache token the result will be
/// stored under; implementations must be idempotent for identical keys
/// (re-running with the same key may reuse the previous output).
#[async_trait]
pub trait EffectsProcessor: Send + Sync {
    async fn apply(
        &self,
        input: &Path,
        chain: &ProcessingChain,
        output_key: &str,
    ) -> Result<EffectsOutput, EffectsError>;
}
