//! Sequential playback of multiple segments.
//!
//! The playlist is a thin loop over the single-segment preview: each item
//! is resolved, played, and awaited before the next begins, so the
//! single-active-stream invariant holds throughout. A stop (or a newer
//! preview) during any item cancels the remainder of the sequence.

use std::time::Duration;

use narratone_core::domain::{ChainOverride, Character, ProjectConfig, Segment};

use crate::error::PreviewError;
use crate::playback::EndReason;
use crate::preview::{PreviewRequest, PreviewService};

/// One entry in a playback sequence.
pub struct PlaylistItem<'a> {
    pub segment: &'a Segment,
    pub character: &'a Character,
    /// Per-segment chain override, merged onto the project default.
    pub chain_override: Option<&'a ChainOverride>,
}

/// Progress report delivered as each item starts playing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaylistProgress {
    /// Zero-based index of the item now playing.
    pub index: usize,
    pub total: usize,
    pub segment_id: u64,
    /// Duration of this item's audio.
    pub audio_duration: Duration,
}

/// Result of a playlist run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaylistSummary {
    /// Items that played to their natural end.
    pub completed: usize,
    pub total: usize,
    /// `true` when a stop or a newer preview cut the sequence short.
    pub cancelled: bool,
    /// Total audio duration of the completed items.
    pub total_audio: Duration,
}

impl PreviewService {
    /// Play `items` in order, awaiting each item's natural end before
    /// starting the next.
    ///
    /// `on_progress` fires once per item as it starts. Cancellation (an
    /// explicit stop, or any new preview started elsewhere) ends the run
    /// early with `cancelled: true` rather than an error; real pipeline
    /// failures still propagate.
    pub async fn play_sequence(
        &self,
        project: &ProjectConfig,
        items: &[PlaylistItem<'_>],
        mut on_progress: impl FnMut(PlaylistProgress),
    ) -> Result<PlaylistSummary, PreviewError> {
        let total = items.len();
        let mut completed = 0;
        let mut total_audio = Duration::ZERO;

        for (index, item) in items.iter().enumerate() {
            let request = PreviewRequest {
                segment: item.segment,
                character: item.character,
                project,
                chain_override: item.chain_override,
                start_offset: None,
                duration: None,
            };

            let outcome = match self.preview(&request).await {
                Ok(outcome) => outcome,
                Err(PreviewError::Cancelled) => {
                    tracing::info!(index, total, "Playlist cancelled while loading");
                    return Ok(PlaylistSummary {
                        completed,
                        total,
                        cancelled: true,
                        total_audio,
                    });
                }
                Err(e) => return Err(e),
            };

            on_progress(PlaylistProgress {
                index,
                total,
                segment_id: item.segment.id,
                audio_duration: outcome.audio_duration,
            });

            if self.playback().wait_for_end(outcome.token).await == EndReason::Stopped {
                tracing::info!(index, total, "Playlist cancelled during playback");
                return Ok(PlaylistSummary {
                    completed,
                    total,
                    cancelled: true,
                    total_audio,
                });
            }

            completed += 1;
            total_audio += outcome.audio_duration;
        }

        tracing::info!(completed, total, "Playlist finished");
        Ok(PlaylistSummary {
            completed,
            total,
            cancelled: false,
            total_audio,
        })
    }
}
