//! Synthesis collaborator port — cloud text-to-speech behind a trait.

use async_trait::async_trait;

use crate::domain::{StyleParams, VoiceParams};

/// Errors from the synthesis collaborator.
///
/// All variants are fatal to the current preview request: without raw
/// audio there is nothing to fall back to. They are surfaced to the caller
/// verbatim and nothing is cached.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    /// The service rejected the request.
    #[error("Synthesis service returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Transport-level failure (connection, timeout, DNS).
    #[error("Synthesis request failed: {0}")]
    Transport(String),

    /// The service answered but the payload was unusable.
    #[error("Synthesis response invalid: {0}")]
    InvalidResponse(String),
}

/// Produces raw synthesized speech for a voice + text + style.
///
/// Implementations are asynchronous I/O-bound calls that may suspend for
/// seconds; callers must keep a `loading` state observable for the wait.
/// The collaborator is independently cached by the orchestrator under a
/// key over (voice, text, style) only — the processing chain plays no part.
#[async_trait]
pub trait SynthesisProvider: Send + Sync {
    /// Synthesize `text` with the given voice and optional style.
    ///
    /// Returns encoded audio bytes (WAV) suitable for caching and decoding.
    async fn synthesize(
        &self,
        voice: &VoiceParams,
        text: &str,
        style: Option<&StyleParams>,
    ) -> Result<Vec<u8>, SynthesisError>;
}
