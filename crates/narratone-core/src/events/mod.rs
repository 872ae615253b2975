//! Pipeline observability events.
//!
//! Every cache lookup and every synthesis/processing outcome is reported
//! as a [`PipelineEvent`] through a [`PipelineEventSink`]. The pipeline
//! emits these for external cost/usage accounting; it never interprets
//! them itself.

use std::sync::Arc;
use std::time::Duration;

// ── Event types ────────────────────────────────────────────────────

/// Which of the two caches an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    /// Raw synthesized audio, keyed by (voice, text, style).
    Synthesis,
    /// Effects-processed audio, keyed by (voice, text, style, chain).
    Processed,
}

impl CacheKind {
    /// Stable label for logs and accounting.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Synthesis => "synthesis",
            Self::Processed => "processed",
        }
    }
}

/// An observability event emitted by the preview pipeline.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// A cache lookup found an entry.
    CacheHit {
        kind: CacheKind,
        key: String,
        elapsed: Duration,
    },

    /// A cache lookup found nothing.
    CacheMiss {
        kind: CacheKind,
        key: String,
        elapsed: Duration,
    },

    /// Cloud synthesis produced audio.
    SynthesisSucceeded {
        key: String,
        elapsed: Duration,
        bytes: u64,
    },

    /// Cloud synthesis failed — fatal to the request.
    SynthesisFailed {
        key: String,
        elapsed: Duration,
        error: String,
    },

    /// The effects tool produced processed audio.
    ProcessingSucceeded { key: String, elapsed: Duration },

    /// The effects tool failed and the preview fell back to raw audio.
    ///
    /// This is the pipeline's only warning-level event: the user still
    /// hears the take, just unprocessed.
    ProcessingFellBack {
        key: String,
        elapsed: Duration,
        error: String,
    },
}

// ── Sink port ──────────────────────────────────────────────────────

/// Receiver for pipeline events.
///
/// Implementations must be cheap and non-blocking; the orchestrator calls
/// `emit` inline on its own task.
pub trait PipelineEventSink: Send + Sync {
    fn emit(&self, event: PipelineEvent);
}

/// Forwarding to a shared sink.
impl PipelineEventSink for Arc<dyn PipelineEventSink> {
    fn emit(&self, event: PipelineEvent) {
        self.as_ref().emit(event);
    }
}

/// Default sink: structured `tracing` records.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl PipelineEventSink for TracingEventSink {
    fn emit(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::CacheHit { kind, key, elapsed } => {
                tracing::debug!(
                    cache = kind.label(),
                    %key,
                    elapsed_ms = elapsed.as_millis(),
                    "Cache hit"
                );
            }
            PipelineEvent::CacheMiss { kind, key, elapsed } => {
                tracing::debug!(
                    cache = kind.label(),
                    %key,
                    elapsed_ms = elapsed.as_millis(),
                    "Cache miss"
                );
            }
            PipelineEvent::SynthesisSucceeded { key, elapsed, bytes } => {
                tracing::info!(%key, elapsed_ms = elapsed.as_millis(), bytes, "Synthesis succeeded");
            }
            PipelineEvent::SynthesisFailed { key, elapsed, error } => {
                tracing::error!(%key, elapsed_ms = elapsed.as_millis(), %error, "Synthesis failed");
            }
            PipelineEvent::ProcessingSucceeded { key, elapsed } => {
                tracing::info!(%key, elapsed_ms = elapsed.as_millis(), "Effects processing succeeded");
            }
            PipelineEvent::ProcessingFellBack { key, elapsed, error } => {
                tracing::warn!(
                    %key,
                    elapsed_ms = elapsed.as_millis(),
                    %error,
                    "Effects processing failed — playing unprocessed audio"
                );
            }
        }
    }
}
