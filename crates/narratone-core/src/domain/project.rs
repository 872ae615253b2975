//! Project-level configuration consumed read-only by the pipeline.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::chain::ProcessingChain;

/// Settings for the cloud synthesis service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisSettings {
    /// Base URL of the synthesis endpoint.
    pub endpoint: String,

    /// API key, when the service requires one. Never logged.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Provider model name, when selectable.
    #[serde(default)]
    pub model: Option<String>,
}

/// Per-project configuration the preview pipeline reads.
///
/// Persistence of the surrounding project document is out of scope; the
/// caller hands this in with every request and the pipeline never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Project-wide default processing chain; per-segment overrides are
    /// merged onto this.
    #[serde(default)]
    pub default_chain: ProcessingChain,

    /// Project-local cache directory. When set, the pipeline roots its
    /// cache tiers here for this project's requests; `None` uses the
    /// global cache location.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Synthesis service settings.
    pub synthesis: SynthesisSettings,
}
