//! Processing chain — the five-stage effects configuration and its merge algebra.
//!
//! A [`ProcessingChain`] describes how raw synthesized narration is shaped
//! into release-ready audio: noise cleanup, dynamics, EQ, spatial
//! enhancement, and mastering. Every effect node carries its own `enabled`
//! flag; a disabled node keeps its parameters (they still participate in
//! cache-key derivation) but must not be applied by the DSP tool.
//!
//! Projects carry a default chain; individual segments may carry a partial
//! [`ChainOverride`]. The effective chain is produced by
//! [`ProcessingChain::merged`], which overlays the override field-by-field —
//! an unset override leaf always preserves the base value, never a
//! whole-object replace.

use serde::{Deserialize, Serialize};

// ── Parameter enums ────────────────────────────────────────────────

/// High-pass filter corner frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HighPassFrequency {
    /// 70 Hz — gentlest rumble removal.
    Hz70,
    /// 80 Hz — the house default for spoken voice.
    Hz80,
    /// 90 Hz — aggressive, for noisy source rooms.
    Hz90,
}

/// De-click / de-ess intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeClickIntensity {
    Light,
    Medium,
    Heavy,
}

/// Compressor ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionRatio {
    /// 2:1
    #[serde(rename = "2:1")]
    R2_0,
    /// 2.5:1
    #[serde(rename = "2.5:1")]
    R2_5,
    /// 3:1
    #[serde(rename = "3:1")]
    R3_0,
}

/// Reverb room character (room type implies the decay profile).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoomType {
    /// Dry vocal booth.
    Booth,
    /// Small studio room.
    Studio,
    /// Medium chamber.
    Chamber,
    /// Large hall.
    Hall,
}

/// Dither target bit depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BitDepth {
    #[serde(rename = "16")]
    B16,
    #[serde(rename = "24")]
    B24,
}

// ── Stage 1: noise cleanup ─────────────────────────────────────────

/// High-pass filter node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighPass {
    pub enabled: bool,
    pub frequency: HighPassFrequency,
}

/// De-click / de-ess node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeClick {
    pub enabled: bool,
    pub intensity: DeClickIntensity,
}

/// Stage 1 — noise cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoiseCleanup {
    pub high_pass: HighPass,
    pub de_click: DeClick,
}

// ── Stage 2: dynamic control ───────────────────────────────────────

/// Compressor node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compressor {
    pub enabled: bool,
    pub ratio: CompressionRatio,
    pub threshold_db: f32,
}

/// Limiter node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Limiter {
    pub enabled: bool,
    pub ceiling_db: f32,
}

/// Stage 2 — dynamic control.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dynamics {
    pub compressor: Compressor,
    pub limiter: Limiter,
}

// ── Stage 3: EQ shaping ────────────────────────────────────────────

/// A single parametric EQ band (used for low-mid cut, presence, air).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EqBand {
    pub enabled: bool,
    pub frequency_hz: f32,
    pub gain_db: f32,
}

/// Stage 3 — EQ shaping. Each band is independently toggleable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EqShaping {
    pub low_mid_cut: EqBand,
    pub presence_boost: EqBand,
    pub air_lift: EqBand,
}

// ── Stage 4: spatial enhancement ───────────────────────────────────

/// Reverb node. `wet_mix` is 0–100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reverb {
    pub enabled: bool,
    pub room: RoomType,
    pub wet_mix: u8,
}

/// Stereo enhancer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StereoEnhancer {
    pub enabled: bool,
    pub width: u8,
}

/// Stage 4 — spatial enhancement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spatial {
    pub reverb: Reverb,
    pub stereo_enhancer: StereoEnhancer,
}

// ── Stage 5: mastering ─────────────────────────────────────────────

/// Loudness normalization node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Normalization {
    pub enabled: bool,
    pub target_lufs: f32,
}

/// Peak limiting node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeakLimit {
    pub enabled: bool,
    pub max_peak_db: f32,
}

/// Dithering node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dither {
    pub enabled: bool,
    pub bit_depth: BitDepth,
}

/// Stage 5 — mastering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mastering {
    pub normalization: Normalization,
    pub peak_limit: PeakLimit,
    pub dither: Dither,
}

// ── The chain ──────────────────────────────────────────────────────

/// The full five-stage processing chain.
///
/// Stages are applied in declaration order by the DSP tool. The chain is a
/// pure value: cheap to copy, comparable, and serializable — its canonical
/// JSON rendering participates in cache-key derivation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingChain {
    pub noise_cleanup: NoiseCleanup,
    pub dynamics: Dynamics,
    pub eq: EqShaping,
    pub spatial: Spatial,
    pub mastering: Mastering,
}

impl Default for ProcessingChain {
    /// The studio house chain: conservative cleanup and dynamics, presence
    /// boost, mastering to common audiobook delivery targets.
    fn default() -> Self {
        Self {
            noise_cleanup: NoiseCleanup {
                high_pass: HighPass {
                    enabled: true,
                    frequency: HighPassFrequency::Hz80,
                },
                de_click: DeClick {
                    enabled: true,
                    intensity: DeClickIntensity::Medium,
                },
            },
            dynamics: Dynamics {
                compressor: Compressor {
                    enabled: true,
                    ratio: CompressionRatio::R2_5,
                    threshold_db: -18.0,
                },
                limiter: Limiter {
                    enabled: true,
                    ceiling_db: -1.0,
                },
            },
            eq: EqShaping {
                low_mid_cut: EqBand {
                    enabled: false,
                    frequency_hz: 250.0,
                    gain_db: -2.0,
                },
                presence_boost: EqBand {
                    enabled: true,
                    frequency_hz: 4_000.0,
                    gain_db: 2.0,
                },
                air_lift: EqBand {
                    enabled: false,
                    frequency_hz: 12_000.0,
                    gain_db: 1.5,
                },
            },
            spatial: Spatial {
                reverb: Reverb {
                    enabled: false,
                    room: RoomType::Booth,
                    wet_mix: 12,
                },
                stereo_enhancer: StereoEnhancer {
                    enabled: false,
                    width: 20,
                },
            },
            mastering: Mastering {
                normalization: Normalization {
                    enabled: true,
                    target_lufs: -19.0,
                },
                peak_limit: PeakLimit {
                    enabled: true,
                    max_peak_db: -3.0,
                },
                dither: Dither {
                    enabled: true,
                    bit_depth: BitDepth::B16,
                },
            },
        }
    }
}

impl ProcessingChain {
    /// Fixed, intentionally extreme chain used by the exaggerated preview.
    ///
    /// Every node is enabled with parameters well past the house defaults so
    /// the audible difference between raw and processed audio is obvious.
    /// Because cache keys cover the full chain, exaggerated previews never
    /// collide with normal-chain cache entries.
    #[must_use]
    pub fn exaggerated() -> Self {
        Self {
            noise_cleanup: NoiseCleanup {
                high_pass: HighPass {
                    enabled: true,
                    frequency: HighPassFrequency::Hz90,
                },
                de_click: DeClick {
                    enabled: true,
                    intensity: DeClickIntensity::Heavy,
                },
            },
            dynamics: Dynamics {
                compressor: Compressor {
                    enabled: true,
                    ratio: CompressionRatio::R3_0,
                    threshold_db: -35.0,
                },
                limiter: Limiter {
                    enabled: true,
                    ceiling_db: -6.0,
                },
            },
            eq: EqShaping {
                low_mid_cut: EqBand {
                    enabled: true,
                    frequency_hz: 300.0,
                    gain_db: -9.0,
                },
                presence_boost: EqBand {
                    enabled: true,
                    frequency_hz: 4_000.0,
                    gain_db: 9.0,
                },
                air_lift: EqBand {
                    enabled: true,
                    frequency_hz: 12_000.0,
                    gain_db: 6.0,
                },
            },
            spatial: Spatial {
                reverb: Reverb {
                    enabled: true,
                    room: RoomType::Hall,
                    wet_mix: 65,
                },
                stereo_enhancer: StereoEnhancer {
                    enabled: true,
                    width: 90,
                },
            },
            mastering: Mastering {
                normalization: Normalization {
                    enabled: true,
                    target_lufs: -14.0,
                },
                peak_limit: PeakLimit {
                    enabled: true,
                    max_peak_db: -1.0,
                },
                dither: Dither {
                    enabled: true,
                    bit_depth: BitDepth::B16,
                },
            },
        }
    }

    /// Overlay a partial override onto this chain, leaf by leaf.
    ///
    /// Every leaf the override defines wins; every leaf it leaves unset
    /// keeps the base value. The operation is pure and idempotent:
    /// merging an empty override returns the chain unchanged.
    #[must_use]
    pub fn merged(&self, ov: &ChainOverride) -> Self {
        Self {
            noise_cleanup: merge_stage(self.noise_cleanup, ov.noise_cleanup.as_ref()),
            dynamics: merge_stage(self.dynamics, ov.dynamics.as_ref()),
            eq: merge_stage(self.eq, ov.eq.as_ref()),
            spatial: merge_stage(self.spatial, ov.spatial.as_ref()),
            mastering: merge_stage(self.mastering, ov.mastering.as_ref()),
        }
    }
}

// ── Merge machinery ────────────────────────────────────────────────

/// A base value that can absorb a partial override of type `O`.
trait MergeWith<O> {
    fn merge_with(self, ov: &O) -> Self;
}

fn merge_stage<T: MergeWith<O> + Copy, O>(base: T, ov: Option<&O>) -> T {
    match ov {
        Some(ov) => base.merge_with(ov),
        None => base,
    }
}

/// Deep-merge two optional overrides: later leaves win, absent sides pass through.
fn overlay_opt<O: Overlay>(first: Option<O>, second: Option<O>) -> Option<O> {
    match (first, second) {
        (Some(a), Some(b)) => Some(a.overlay(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// A partial override that can be combined with another; `other` wins per leaf.
trait Overlay {
    fn overlay(self, other: Self) -> Self;
}

// ── Override types ─────────────────────────────────────────────────
//
// Overrides mirror the chain with Option at every stage, node, and leaf.
// serde(default) lets project JSON specify only the paths it changes.

/// Partial override for [`HighPass`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HighPassOverride {
    pub enabled: Option<bool>,
    pub frequency: Option<HighPassFrequency>,
}

/// Partial override for [`DeClick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeClickOverride {
    pub enabled: Option<bool>,
    pub intensity: Option<DeClickIntensity>,
}

/// Partial override for [`NoiseCleanup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NoiseCleanupOverride {
    pub high_pass: Option<HighPassOverride>,
    pub de_click: Option<DeClickOverride>,
}

/// Partial override for [`Compressor`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompressorOverride {
    pub enabled: Option<bool>,
    pub ratio: Option<CompressionRatio>,
    pub threshold_db: Option<f32>,
}

/// Partial override for [`Limiter`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LimiterOverride {
    pub enabled: Option<bool>,
    pub ceiling_db: Option<f32>,
}

/// Partial override for [`Dynamics`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DynamicsOverride {
    pub compressor: Option<CompressorOverride>,
    pub limiter: Option<LimiterOverride>,
}

/// Partial override for a single [`EqBand`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EqBandOverride {
    pub enabled: Option<bool>,
    pub frequency_hz: Option<f32>,
    pub gain_db: Option<f32>,
}

/// Partial override for [`EqShaping`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EqShapingOverride {
    pub low_mid_cut: Option<EqBandOverride>,
    pub presence_boost: Option<EqBandOverride>,
    pub air_lift: Option<EqBandOverride>,
}

/// Partial override for [`Reverb`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReverbOverride {
    pub enabled: Option<bool>,
    pub room: Option<RoomType>,
    pub wet_mix: Option<u8>,
}

/// Partial override for [`StereoEnhancer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StereoEnhancerOverride {
    pub enabled: Option<bool>,
    pub width: Option<u8>,
}

/// Partial override for [`Spatial`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpatialOverride {
    pub reverb: Option<ReverbOverride>,
    pub stereo_enhancer: Option<StereoEnhancerOverride>,
}

/// Partial override for [`Normalization`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NormalizationOverride {
    pub enabled: Option<bool>,
    pub target_lufs: Option<f32>,
}

/// Partial override for [`PeakLimit`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PeakLimitOverride {
    pub enabled: Option<bool>,
    pub max_peak_db: Option<f32>,
}

/// Partial override for [`Dither`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DitherOverride {
    pub enabled: Option<bool>,
    pub bit_depth: Option<BitDepth>,
}

/// Partial override for [`Mastering`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MasteringOverride {
    pub normalization: Option<NormalizationOverride>,
    pub peak_limit: Option<PeakLimitOverride>,
    pub dither: Option<DitherOverride>,
}

/// Partial override for a whole [`ProcessingChain`].
///
/// `ChainOverride::default()` is the empty override — merging it is the
/// identity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChainOverride {
    pub noise_cleanup: Option<NoiseCleanupOverride>,
    pub dynamics: Option<DynamicsOverride>,
    pub eq: Option<EqShapingOverride>,
    pub spatial: Option<SpatialOverride>,
    pub mastering: Option<MasteringOverride>,
}

impl ChainOverride {
    /// Deep-merge two partial overrides: for every leaf both define,
    /// `other` wins; leaves only one side defines pass through.
    ///
    /// For non-conflicting paths the operation is order-independent, so
    /// `base.merged(&a).merged(&b) == base.merged(&a.overlay(b))`.
    #[must_use]
    pub fn overlay(self, other: Self) -> Self {
        Self {
            noise_cleanup: overlay_opt(self.noise_cleanup, other.noise_cleanup),
            dynamics: overlay_opt(self.dynamics, other.dynamics),
            eq: overlay_opt(self.eq, other.eq),
            spatial: overlay_opt(self.spatial, other.spatial),
            mastering: overlay_opt(self.mastering, other.mastering),
        }
    }
}

// ── MergeWith impls (override leaf wins, unset keeps base) ─────────

impl MergeWith<HighPassOverride> for HighPass {
    fn merge_with(self, ov: &HighPassOverride) -> Self {
        Self {
            enabled: ov.enabled.unwrap_or(self.enabled),
            frequency: ov.frequency.unwrap_or(self.frequency),
        }
    }
}

impl MergeWith<DeClickOverride> for DeClick {
    fn merge_with(self, ov: &DeClickOverride) -> Self {
        Self {
            enabled: ov.enabled.unwrap_or(self.enabled),
            intensity: ov.intensity.unwrap_or(self.intensity),
        }
    }
}

impl MergeWith<NoiseCleanupOverride> for NoiseCleanup {
    fn merge_with(self, ov: &NoiseCleanupOverride) -> Self {
        Self {
            high_pass: merge_stage(self.high_pass, ov.high_pass.as_ref()),
            de_click: merge_stage(self.de_click, ov.de_click.as_ref()),
        }
    }
}

impl MergeWith<CompressorOverride> for Compressor {
    fn merge_with(self, ov: &CompressorOverride) -> Self {
        Self {
            enabled: ov.enabled.unwrap_or(self.enabled),
            ratio: ov.ratio.unwrap_or(self.ratio),
            threshold_db: ov.threshold_db.unwrap_or(self.threshold_db),
        }
    }
}

impl MergeWith<LimiterOverride> for Limiter {
    fn merge_with(self, ov: &LimiterOverride) -> Self {
        Self {
            enabled: ov.enabled.unwrap_or(self.enabled),
            ceiling_db: ov.ceiling_db.unwrap_or(self.ceiling_db),
        }
    }
}

impl MergeWith<DynamicsOverride> for Dynamics {
    fn merge_with(self, ov: &DynamicsOverride) -> Self {
        Self {
            compressor: merge_stage(self.compressor, ov.compressor.as_ref()),
            limiter: merge_stage(self.limiter, ov.limiter.as_ref()),
        }
    }
}

impl MergeWith<EqBandOverride> for EqBand {
    fn merge_with(self, ov: &EqBandOverride) -> Self {
        Self {
            enabled: ov.enabled.unwrap_or(self.enabled),
            frequency_hz: ov.frequency_hz.unwrap_or(self.frequency_hz),
            gain_db: ov.gain_db.unwrap_or(self.gain_db),
        }
    }
}

impl MergeWith<EqShapingOverride> for EqShaping {
    fn merge_with(self, ov: &EqShapingOverride) -> Self {
        Self {
            low_mid_cut: merge_stage(self.low_mid_cut, ov.low_mid_cut.as_ref()),
            presence_boost: merge_stage(self.presence_boost, ov.presence_boost.as_ref()),
            air_lift: merge_stage(self.air_lift, ov.air_lift.as_ref()),
        }
    }
}

impl MergeWith<ReverbOverride> for Reverb {
    fn merge_with(self, ov: &ReverbOverride) -> Self {
        Self {
            enabled: ov.enabled.unwrap_or(self.enabled),
            room: ov.room.unwrap_or(self.room),
            wet_mix: ov.wet_mix.unwrap_or(self.wet_mix),
        }
    }
}

impl MergeWith<StereoEnhancerOverride> for StereoEnhancer {
    fn merge_with(self, ov: &StereoEnhancerOverride) -> Self {
        Self {
            enabled: ov.enabled.unwrap_or(self.enabled),
            width: ov.width.unwrap_or(self.width),
        }
    }
}

impl MergeWith<SpatialOverride> for Spatial {
    fn merge_with(self, ov: &SpatialOverride) -> Self {
        Self {
            reverb: merge_stage(self.reverb, ov.reverb.as_ref()),
            stereo_enhancer: merge_stage(self.stereo_enhancer, ov.stereo_enhancer.as_ref()),
        }
    }
}

impl MergeWith<NormalizationOverride> for Normalization {
    fn merge_with(self, ov: &NormalizationOverride) -> Self {
        Self {
            enabled: ov.enabled.unwrap_or(self.enabled),
            target_lufs: ov.target_lufs.unwrap_or(self.target_lufs),
        }
    }
}

impl MergeWith<PeakLimitOverride> for PeakLimit {
    fn merge_with(self, ov: &PeakLimitOverride) -> Self {
        Self {
            enabled: ov.enabled.unwrap_or(self.enabled),
            max_peak_db: ov.max_peak_db.unwrap_or(self.max_peak_db),
        }
    }
}

impl MergeWith<DitherOverride> for Dither {
    fn merge_with(self, ov: &DitherOverride) -> Self {
        Self {
            enabled: ov.enabled.unwrap_or(self.enabled),
            bit_depth: ov.bit_depth.unwrap_or(self.bit_depth),
        }
    }
}

impl MergeWith<MasteringOverride> for Mastering {
    fn merge_with(self, ov: &MasteringOverride) -> Self {
        Self {
            normalization: merge_stage(self.normalization, ov.normalization.as_ref()),
            peak_limit: merge_stage(self.peak_limit, ov.peak_limit.as_ref()),
            dither: merge_stage(self.dither, ov.dither.as_ref()),
        }
    }
}

// ── Overlay impls (second override wins per leaf) ──────────────────

impl Overlay for HighPassOverride {
    fn overlay(self, other: Self) -> Self {
        Self {
            enabled: other.enabled.or(self.enabled),
            frequency: other.frequency.or(self.frequency),
        }
    }
}

impl Overlay for DeClickOverride {
    fn overlay(self, other: Self) -> Self {
        Self {
            enabled: other.enabled.or(self.enabled),
            intensity: other.intensity.or(self.intensity),
        }
    }
}

impl Overlay for NoiseCleanupOverride {
    fn overlay(self, other: Self) -> Self {
        Self {
            high_pass: overlay_opt(self.high_pass, other.high_pass),
            de_click: overlay_opt(self.de_click, other.de_click),
        }
    }
}

impl Overlay for CompressorOverride {
    fn overlay(self, other: Self) -> Self {
        Self {
            enabled: other.enabled.or(self.enabled),
            ratio: other.ratio.or(self.ratio),
            threshold_db: other.threshold_db.or(self.threshold_db),
        }
    }
}

impl Overlay for LimiterOverride {
    fn overlay(self, other: Self) -> Self {
        Self {
            enabled: other.enabled.or(self.enabled),
            ceiling_db: other.ceiling_db.or(self.ceiling_db),
        }
    }
}

impl Overlay for DynamicsOverride {
    fn overlay(self, other: Self) -> Self {
        Self {
            compressor: overlay_opt(self.compressor, other.compressor),
            limiter: overlay_opt(self.limiter, other.limiter),
        }
    }
}

impl Overlay for EqBandOverride {
    fn overlay(self, other: Self) -> Self {
        Self {
            enabled: other.enabled.or(self.enabled),
            frequency_hz: other.frequency_hz.or(self.frequency_hz),
            gain_db: other.gain_db.or(self.gain_db),
        }
    }
}

impl Overlay for EqShapingOverride {
    fn overlay(self, other: Self) -> Self {
        Self {
            low_mid_cut: overlay_opt(self.low_mid_cut, other.low_mid_cut),
            presence_boost: overlay_opt(self.presence_boost, other.presence_boost),
            air_lift: overlay_opt(self.air_lift, other.air_lift),
        }
    }
}

impl Overlay for ReverbOverride {
    fn overlay(self, other: Self) -> Self {
        Self {
            enabled: other.enabled.or(self.enabled),
            room: other.room.or(self.room),
            wet_mix: other.wet_mix.or(self.wet_mix),
        }
    }
}

impl Overlay for StereoEnhancerOverride {
    fn overlay(self, other: Self) -> Self {
        Self {
            enabled: other.enabled.or(self.enabled),
            width: other.width.or(self.width),
        }
    }
}

impl Overlay for SpatialOverride {
    fn overlay(self, other: Self) -> Self {
        Self {
            reverb: overlay_opt(self.reverb, other.reverb),
            stereo_enhancer: overlay_opt(self.stereo_enhancer, other.stereo_enhancer),
        }
    }
}

impl Overlay for NormalizationOverride {
    fn overlay(self, other: Self) -> Self {
        Self {
            enabled: other.enabled.or(self.enabled),
            target_lufs: other.target_lufs.or(self.target_lufs),
        }
    }
}

impl Overlay for PeakLimitOverride {
    fn overlay(self, other: Self) -> Self {
        Self {
            enabled: other.enabled.or(self.enabled),
            max_peak_db: other.max_peak_db.or(self.max_peak_db),
        }
    }
}

impl Overlay for DitherOverride {
    fn overlay(self, other: Self) -> Self {
        Self {
            enabled: other.enabled.or(self.enabled),
            bit_depth: other.bit_depth.or(self.bit_depth),
        }
    }
}

impl Overlay for MasteringOverride {
    fn overlay(self, other: Self) -> Self {
        Self {
            normalization: overlay_opt(self.normalization, other.normalization),
            peak_limit: overlay_opt(self.peak_limit, other.peak_limit),
            dither: overlay_opt(self.dither, other.dither),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reverb_on(wet_mix: u8) -> ChainOverride {
        ChainOverride {
            spatial: Some(SpatialOverride {
                reverb: Some(ReverbOverride {
                    enabled: Some(true),
                    wet_mix: Some(wet_mix),
                    room: None,
                }),
                stereo_enhancer: None,
            }),
            ..ChainOverride::default()
        }
    }

    fn compressor_ratio(ratio: CompressionRatio) -> ChainOverride {
        ChainOverride {
            dynamics: Some(DynamicsOverride {
                compressor: Some(CompressorOverride {
                    ratio: Some(ratio),
                    ..CompressorOverride::default()
                }),
                limiter: None,
            }),
            ..ChainOverride::default()
        }
    }

    #[test]
    fn merging_empty_override_is_identity() {
        let base = ProcessingChain::default();
        assert_eq!(base.merged(&ChainOverride::default()), base);
    }

    #[test]
    fn override_leaf_wins_and_siblings_are_preserved() {
        let base = ProcessingChain::default();
        let merged = base.merged(&reverb_on(40));

        assert!(merged.spatial.reverb.enabled);
        assert_eq!(merged.spatial.reverb.wet_mix, 40);
        // Unset leaf on the same node keeps the base value
        assert_eq!(merged.spatial.reverb.room, base.spatial.reverb.room);
        // Sibling node untouched
        assert_eq!(merged.spatial.stereo_enhancer, base.spatial.stereo_enhancer);
        // Other stages untouched
        assert_eq!(merged.dynamics, base.dynamics);
        assert_eq!(merged.mastering, base.mastering);
    }

    #[test]
    fn non_overlapping_overlays_are_order_independent() {
        let a = reverb_on(40);
        let b = compressor_ratio(CompressionRatio::R3_0);
        let base = ProcessingChain::default();

        let ab = base.merged(&a.overlay(b));
        let ba = base.merged(&b.overlay(a));
        assert_eq!(ab, ba);

        // And sequential merging matches the deep-merged overlay
        assert_eq!(base.merged(&a).merged(&b), ab);
    }

    #[test]
    fn conflicting_overlay_later_wins() {
        let first = reverb_on(30);
        let second = reverb_on(70);
        let merged = ProcessingChain::default().merged(&first.overlay(second));
        assert_eq!(merged.spatial.reverb.wet_mix, 70);
    }

    #[test]
    fn disabled_node_retains_parameters_through_merge() {
        let base = ProcessingChain::default();
        let ov = ChainOverride {
            eq: Some(EqShapingOverride {
                air_lift: Some(EqBandOverride {
                    enabled: Some(false),
                    ..EqBandOverride::default()
                }),
                ..EqShapingOverride::default()
            }),
            ..ChainOverride::default()
        };

        let merged = base.merged(&ov);
        assert!(!merged.eq.air_lift.enabled);
        // Parameters survive the disable
        assert_eq!(merged.eq.air_lift.frequency_hz, base.eq.air_lift.frequency_hz);
        assert_eq!(merged.eq.air_lift.gain_db, base.eq.air_lift.gain_db);
    }

    #[test]
    fn exaggerated_chain_enables_every_node() {
        let c = ProcessingChain::exaggerated();
        assert!(c.noise_cleanup.high_pass.enabled);
        assert!(c.noise_cleanup.de_click.enabled);
        assert!(c.dynamics.compressor.enabled);
        assert!(c.dynamics.limiter.enabled);
        assert!(c.eq.low_mid_cut.enabled);
        assert!(c.eq.presence_boost.enabled);
        assert!(c.eq.air_lift.enabled);
        assert!(c.spatial.reverb.enabled);
        assert!(c.spatial.stereo_enhancer.enabled);
        assert!(c.mastering.normalization.enabled);
        assert!(c.mastering.peak_limit.enabled);
        assert!(c.mastering.dither.enabled);
    }

    #[test]
    fn partial_override_deserializes_from_sparse_json() {
        let ov: ChainOverride =
            serde_json::from_str(r#"{"spatial":{"reverb":{"enabled":true,"wetMix":55}}}"#).unwrap();
        let merged = ProcessingChain::default().merged(&ov);
        assert!(merged.spatial.reverb.enabled);
        assert_eq!(merged.spatial.reverb.wet_mix, 55);
    }
}
