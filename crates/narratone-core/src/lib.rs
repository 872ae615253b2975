//! Core domain types and port definitions for narratone.
//!
//! This crate holds the pure data model of the preview pipeline — segments,
//! voice casting, project configuration, and the five-stage processing
//! chain with its merge algebra — plus the port traits that abstract the
//! external collaborators (cloud synthesis, the DSP tool, the event sink).
//!
//! No I/O happens here. Adapters live in `narratone-preview`; the
//! content-addressed cache lives in `narratone-cache`.

pub mod domain;
pub mod events;
pub mod ports;

// Re-export commonly used types for convenience
pub use domain::{
    BitDepth, ChainOverride, Character, CompressionRatio, Compressor, DeClick, DeClickIntensity,
    Dither, Dynamics, DynamicsOverride, EqBand, EqBandOverride, EqShaping, EqShapingOverride,
    HighPass, HighPassFrequency, Limiter, Mastering, MasteringOverride, NoiseCleanup,
    NoiseCleanupOverride, Normalization, PeakLimit, ProcessingChain, ProjectConfig, Reverb,
    RoomType, Segment, Spatial, SpatialOverride, StereoEnhancer, StyleParams, SynthesisSettings,
    VoiceParams,
};
pub use events::{CacheKind, PipelineEvent, PipelineEventSink, TracingEventSink};
pub use ports::{
    EffectsError, EffectsOutput, EffectsProcessor, SynthesisError, SynthesisProvider,
};
