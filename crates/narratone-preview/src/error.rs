//! Preview and playback error types.
//!
//! The taxonomy follows how each failure propagates: configuration,
//! synthesis, decode, and playback errors reject the request; effects
//! failures are absorbed by the orchestrator's fallback branch and never
//! appear here.

use narratone_cache::CacheError;
use narratone_core::SynthesisError;

use crate::audio::DecodeError;

/// Errors from the playback controller and the output primitive.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    /// No usable audio output device.
    #[error("No audio output device available: {0}")]
    OutputDevice(String),

    /// The output stream failed while starting or playing.
    #[error("Output stream error: {0}")]
    Stream(String),

    /// A start was attempted with a request token that is no longer
    /// current — a newer preview or an explicit stop superseded it.
    #[error("Playback request superseded")]
    Superseded,

    /// `pause` called while nothing is playing.
    #[error("Nothing is playing")]
    NotPlaying,

    /// `resume` called while playback is not paused.
    #[error("Playback is not paused")]
    NotPaused,
}

/// Errors that reject a preview request.
#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    /// Configuration error: the character has no voice assignment.
    /// Detected before any external call; nothing is cached.
    #[error("No voice assigned to character '{character}' (segment {segment_id})")]
    MissingVoice { character: String, segment_id: u64 },

    /// Configuration error: the segment carries no synthesizable text.
    #[error("Segment {0} has no text to synthesize")]
    EmptySegment(u64),

    /// The synthesis collaborator failed — fatal, surfaced verbatim.
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    /// Cached or fetched audio bytes could not be decoded. The corrupt
    /// cache entry is left in place; evicting it requires an explicit
    /// `delete`/`clear`.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Cache store failure.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Output device/stream failure; the controller has reset to idle.
    #[error(transparent)]
    Playback(PlaybackError),

    /// The request was superseded (new preview or stop) before its audio
    /// could start playing; the stale result was discarded.
    #[error("Preview superseded before playback could start")]
    Cancelled,
}

impl From<PlaybackError> for PreviewError {
    fn from(e: PlaybackError) -> Self {
        match e {
            PlaybackError::Superseded => Self::Cancelled,
            other => Self::Playback(other),
        }
    }
}
