//! Effects processing via an external DSP tool subprocess.
//!
//! The tool is invoked as
//! `<binary> --input <wav> --chain <json> --output <wav>` and may print a
//! JSON report on stdout. Outputs are named by the content-derived cache
//! token, so a pre-existing output file for the same token is simply
//! reused instead of re-running the tool.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use narratone_core::domain::ProcessingChain;
use narratone_core::{EffectsError, EffectsOutput, EffectsProcessor};

/// Runs the configured effects binary in a scratch directory.
pub struct ProcessToolEffects {
    binary: PathBuf,
    work_dir: PathBuf,
}

/// Optional report the tool prints on stdout.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolReport {
    duration_secs: Option<f64>,
    file_size_bytes: Option<u64>,
}

impl ProcessToolEffects {
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            work_dir: work_dir.into(),
        }
    }

    async fn output_metadata(&self, output_path: PathBuf) -> Result<EffectsOutput, EffectsError> {
        let size = tokio::fs::metadata(&output_path).await?.len();
        Ok(EffectsOutput {
            output_path,
            duration_secs: None,
            file_size_bytes: Some(size),
        })
    }
}

#[async_trait]
impl EffectsProcessor for ProcessToolEffects {
    async fn apply(
        &self,
        input: &Path,
        chain: &ProcessingChain,
        output_key: &str,
    ) -> Result<EffectsOutput, EffectsError> {
        if !self.binary.exists() {
            return Err(EffectsError::ToolNotFound(self.binary.clone()));
        }

        tokio::fs::create_dir_all(&self.work_dir).await?;
        let output_path = self.work_dir.join(format!("{output_key}.wav"));

        // The token is content-derived; an existing output is this exact run.
        if tokio::fs::try_exists(&output_path).await.unwrap_or(false) {
            tracing::debug!(key = output_key, "Reusing existing effects output");
            return self.output_metadata(output_path).await;
        }

        let chain_path = self.work_dir.join(format!("{output_key}.chain.json"));
        // Serialization of the closed chain struct cannot fail.
        let chain_json = serde_json::to_vec_pretty(chain).expect("chain serializes");
        tokio::fs::write(&chain_path, chain_json).await?;

        tracing::debug!(
            binary = %self.binary.display(),
            input = %input.display(),
            key = output_key,
            "Running effects tool"
        );
        let output = Command::new(&self.binary)
            .arg("--input")
            .arg(input)
            .arg("--chain")
            .arg(&chain_path)
            .arg("--output")
            .arg(&output_path)
            .output()
            .await?;

        if !output.status.success() {
            return Err(EffectsError::ToolFailed {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if !tokio::fs::try_exists(&output_path).await.unwrap_or(false) {
            return Err(EffectsError::MissingOutput(output_path));
        }

        let mut result = self.output_metadata(output_path).await?;
        if let Ok(report) = serde_json::from_slice::<ToolReport>(&output.stdout) {
            result.duration_secs = report.duration_secs;
            if report.file_size_bytes.is_some() {
                result.file_size_bytes = report.file_size_bytes;
            }
        }
        Ok(result)
    }
}
