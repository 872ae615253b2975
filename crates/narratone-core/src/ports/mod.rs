//! Port traits for the external collaborators.
//!
//! The preview orchestrator depends only on these traits; concrete
//! adapters (HTTP synthesis client, subprocess DSP tool) live in
//! `narratone-preview::adapters` and tests substitute struct mocks.

pub mod effects;
pub mod synthesis;

pub use effects::{EffectsError, EffectsOutput, EffectsProcessor};
pub use synthesis::{SynthesisError, SynthesisProvider};
