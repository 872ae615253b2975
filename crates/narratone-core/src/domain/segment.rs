//! Narration segments — the immutable text units the pipeline consumes.

use serde::{Deserialize, Serialize};

/// An atomic unit of narration.
///
/// Segments are produced upstream by the chunk planner and consumed
/// read-only here: the pipeline never mutates them. Offsets refer to the
/// manuscript's source text; `text` is the raw span between them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    /// Stable numeric segment id within the project.
    pub id: u64,

    /// Byte offset of the segment start in the source text.
    pub start: usize,

    /// Byte offset one past the segment end in the source text.
    pub end: usize,

    /// The delimiter that closed this segment (e.g. `"."`, `"\n\n"`).
    pub delimiter: String,

    /// The raw segment text to synthesize.
    pub text: String,

    /// Optional voice label assigned by the casting editor.
    ///
    /// Resolution of label → character happens upstream; the pipeline only
    /// sees the resolved [`Character`](super::Character).
    pub voice_label: Option<String>,
}

impl Segment {
    /// Construct a segment from its text span.
    #[must_use]
    pub fn new(id: u64, start: usize, text: impl Into<String>, delimiter: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            id,
            start,
            end: start + text.len(),
            delimiter: delimiter.into(),
            text,
            voice_label: None,
        }
    }

    /// Length of the segment text in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether the segment carries no text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
