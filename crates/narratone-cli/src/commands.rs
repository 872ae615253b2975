//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Audio narration preview tool.
#[derive(Parser)]
#[command(name = "narratone", version, about = "Preview narration audio: synthesize, process, cache, play")]
pub struct Cli {
    /// Cache root directory (defaults to the platform cache directory)
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show resolved cache and scratch directories
    Paths,

    /// Inspect and manage the audio caches
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },

    /// Derive the cache keys for a text + voice (+ optional chain override)
    DeriveKey {
        /// Text to derive keys for
        text: String,
        /// Voice identifier
        #[arg(short, long)]
        voice: String,
        /// JSON file with a processing chain override
        #[arg(long)]
        chain: Option<PathBuf>,
    },

    /// Synthesize, process, and play a piece of text
    Preview(PreviewArgs),
}

#[derive(Subcommand)]
pub enum CacheCommand {
    /// List entries in both cache tiers
    List,
    /// Print the payload path for a cache key
    Path {
        /// 32-hex cache key
        key: String,
    },
    /// Delete one entry by key
    Delete {
        /// 32-hex cache key
        key: String,
    },
    /// Delete every cached entry
    Clear,
    /// Evict entries whose expiry has passed
    Sweep,
}

#[derive(Args)]
pub struct PreviewArgs {
    /// Text to preview
    pub text: String,

    /// Voice identifier
    #[arg(short, long)]
    pub voice: String,

    /// Synthesis service base URL
    #[arg(long, env = "NARRATONE_ENDPOINT")]
    pub endpoint: String,

    /// Synthesis service API key
    #[arg(long, env = "NARRATONE_API_KEY")]
    pub api_key: Option<String>,

    /// Synthesis model name
    #[arg(long)]
    pub model: Option<String>,

    /// Path to the effects tool binary (a missing tool falls back to
    /// playing the raw take)
    #[arg(long, default_value = "narratone-fx")]
    pub effects_tool: PathBuf,

    /// Play with every effect enabled at an extreme setting
    #[arg(long)]
    pub exaggerated: bool,

    /// Start playback this many seconds into the audio
    #[arg(long)]
    pub offset: Option<f64>,

    /// Play at most this many seconds
    #[arg(long)]
    pub duration: Option<f64>,
}
