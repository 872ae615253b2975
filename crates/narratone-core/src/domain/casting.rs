//! Voice casting — characters and their voice/style assignments.

use serde::{Deserialize, Serialize};

/// Parameters identifying a synthesis voice.
///
/// These feed both the synthesis request and cache-key derivation: any
/// change here invalidates previously cached audio for the segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceParams {
    /// Provider-specific voice identifier.
    pub voice_id: String,

    /// Synthesis engine/model name, when the provider offers several.
    pub engine: Option<String>,

    /// Voice stability (0.0–1.0); lower is more expressive.
    pub stability: f32,

    /// Similarity to the reference voice (0.0–1.0).
    pub similarity: f32,
}

impl VoiceParams {
    /// A voice with provider defaults for the tuning knobs.
    #[must_use]
    pub fn new(voice_id: impl Into<String>) -> Self {
        Self {
            voice_id: voice_id.into(),
            engine: None,
            stability: 0.5,
            similarity: 0.75,
        }
    }
}

/// Delivery-style parameters, independent of the voice identity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleParams {
    /// Speaking pace multiplier (1.0 = neutral).
    pub pace: f32,

    /// Pitch shift in semitones (0.0 = neutral).
    pub pitch: f32,

    /// Expressive intensity (0.0–1.0).
    pub intensity: f32,
}

impl Default for StyleParams {
    fn default() -> Self {
        Self {
            pace: 1.0,
            pitch: 0.0,
            intensity: 0.3,
        }
    }
}

/// A cast character: a name plus its (optional) voice assignment and style.
///
/// A character without a voice assignment cannot be previewed — the
/// orchestrator rejects the request before any external call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    /// Display name (also the casting-editor key).
    pub name: String,

    /// Assigned synthesis voice, if cast.
    pub voice: Option<VoiceParams>,

    /// Delivery style for this character.
    #[serde(default)]
    pub style: StyleParams,
}

impl Character {
    /// A cast character with the given voice and default style.
    #[must_use]
    pub fn cast(name: impl Into<String>, voice: VoiceParams) -> Self {
        Self {
            name: name.into(),
            voice: Some(voice),
            style: StyleParams::default(),
        }
    }

    /// An uncast character (no voice assigned yet).
    #[must_use]
    pub fn uncast(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            voice: None,
            style: StyleParams::default(),
        }
    }
}
