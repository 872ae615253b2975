//! Audio preview pipeline — synthesis, effects, caching, and playback.
//!
//! The entry point is [`PreviewService`]: hand it a segment, a cast
//! character, and the project config, and it resolves audio through two
//! cache tiers (processed, then raw synthesis), applies the effects chain
//! with graceful fallback, and plays the result through the shared
//! [`PlaybackController`].
//!
//! Playback is strictly single-stream: starting any preview stops the
//! previous one, and a stop while a request is still resolving discards
//! the stale result instead of playing it.

pub mod adapters;
pub mod audio;
pub mod error;
pub mod playback;
pub mod playlist;
pub mod preview;
pub mod sink;

pub use adapters::{HttpSynthesisProvider, ProcessToolEffects};
pub use audio::{DecodeError, DecodedAudio};
pub use error::{PlaybackError, PreviewError};
pub use playback::{
    EndReason, PlaybackController, PlaybackPhase, PlaybackState, RequestToken, Subscription,
};
pub use playlist::{PlaylistItem, PlaylistProgress, PlaylistSummary};
pub use preview::{CacheOutcome, PreviewOutcome, PreviewRequest, PreviewService};
pub use sink::{AudioSink, CompletionCallback, RodioSink};
