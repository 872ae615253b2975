//! Domain model — segments, voice casting, project config, processing chain.

pub mod casting;
pub mod chain;
pub mod project;
pub mod segment;

pub use casting::{Character, StyleParams, VoiceParams};
pub use chain::{
    BitDepth, ChainOverride, CompressionRatio, Compressor, CompressorOverride, DeClick,
    DeClickIntensity, DeClickOverride, Dither, DitherOverride, Dynamics, DynamicsOverride, EqBand,
    EqBandOverride, EqShaping, EqShapingOverride, HighPass, HighPassFrequency, HighPassOverride,
    Limiter, LimiterOverride, Mastering, MasteringOverride, NoiseCleanup, NoiseCleanupOverride,
    Normalization, NormalizationOverride, PeakLimit, PeakLimitOverride, ProcessingChain, Reverb,
    ReverbOverride, RoomType, Spatial, SpatialOverride, StereoEnhancer, StereoEnhancerOverride,
};
pub use project::{ProjectConfig, SynthesisSettings};
pub use segment::Segment;
