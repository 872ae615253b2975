//! Cache key derivation.
//!
//! Keys are derived by folding the canonical JSON rendering of the full
//! structured input through xxh3-128 and formatting the digest as 32 hex
//! characters. The token becomes part of a cache file name, so it must be
//! short, filesystem-safe, and stable; it is not reversible, which is why
//! the store keeps the canonical string in entry metadata for diagnostics.
//!
//! Determinism contract: identical inputs always yield the identical key,
//! and any difference in any parameter — including parameters of a
//! *disabled* effect, since enabling it later must not collide with the
//! disabled-state entry — yields a different key with overwhelming
//! probability.

use serde::Serialize;
use xxhash_rust::xxh3::xxh3_128;

use narratone_core::domain::{ProcessingChain, StyleParams, VoiceParams};

/// A derived, filesystem-safe cache token (32 lowercase hex chars).
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// The token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse a token a user supplied (CLI arguments, file names).
    ///
    /// Accepts exactly 32 hex characters; returns `None` otherwise.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        if token.len() == 32 && token.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(Self(token.to_ascii_lowercase()))
        } else {
            None
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A key together with the canonical pre-hash input it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedKey {
    /// The short token used as the cache address.
    pub key: CacheKey,

    /// The canonical serialized input — stored as entry metadata so a
    /// token can be traced back to its parameters when debugging.
    pub canonical: String,
}

// Struct field order fixes the canonical serialization order, so the
// rendering is deterministic across runs and builds.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesisKeyInput<'a> {
    voice: &'a VoiceParams,
    text: &'a str,
    style: Option<&'a StyleParams>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessedKeyInput<'a> {
    voice: &'a VoiceParams,
    text: &'a str,
    style: Option<&'a StyleParams>,
    chain: &'a ProcessingChain,
}

/// Derive the synthesis-cache key over (voice, text, style) only.
///
/// Independent of the processing chain: the same raw synthesis serves any
/// number of chain configurations.
#[must_use]
pub fn derive_synthesis_key(
    voice: &VoiceParams,
    text: &str,
    style: Option<&StyleParams>,
) -> DerivedKey {
    hash_canonical(&SynthesisKeyInput { voice, text, style })
}

/// Derive the processed-cache key over the full (voice, text, style, chain).
///
/// The chain is serialized in full — enabled flags *and* the parameters of
/// disabled nodes — so toggling any node or nudging any parameter addresses
/// a distinct entry.
#[must_use]
pub fn derive_processed_key(
    voice: &VoiceParams,
    text: &str,
    style: Option<&StyleParams>,
    chain: &ProcessingChain,
) -> DerivedKey {
    hash_canonical(&ProcessedKeyInput {
        voice,
        text,
        style,
        chain,
    })
}

fn hash_canonical<T: Serialize>(input: &T) -> DerivedKey {
    // Serialization of these closed, non-map types cannot fail.
    let canonical = serde_json::to_string(input).expect("key input serializes");
    let digest = xxh3_128(canonical.as_bytes());
    DerivedKey {
        key: CacheKey(format!("{digest:032x}")),
        canonical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use narratone_core::domain::ChainOverride;

    fn voice() -> VoiceParams {
        VoiceParams::new("narrator-uk-f1")
    }

    #[test]
    fn same_input_same_key() {
        let style = StyleParams::default();
        let chain = ProcessingChain::default();
        let a = derive_processed_key(&voice(), "The sun rose.", Some(&style), &chain);
        let b = derive_processed_key(&voice(), "The sun rose.", Some(&style), &chain);
        assert_eq!(a.key, b.key);
        assert_eq!(a.canonical, b.canonical);
    }

    #[test]
    fn token_is_short_and_filesystem_safe() {
        let key = derive_synthesis_key(&voice(), "text", None).key;
        assert_eq!(key.as_str().len(), 32);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn text_change_changes_key() {
        let a = derive_synthesis_key(&voice(), "The sun rose.", None);
        let b = derive_synthesis_key(&voice(), "The sun rose!", None);
        assert_ne!(a.key, b.key);
    }

    #[test]
    fn voice_param_change_changes_key() {
        let mut other = voice();
        other.stability = 0.6;
        let a = derive_synthesis_key(&voice(), "text", None);
        let b = derive_synthesis_key(&other, "text", None);
        assert_ne!(a.key, b.key);
    }

    #[test]
    fn parameter_of_disabled_effect_still_changes_key() {
        let base = ProcessingChain::default();
        // air_lift is disabled in the default chain; nudge its gain only.
        let ov: ChainOverride =
            serde_json::from_str(r#"{"eq":{"airLift":{"gainDb":3.0}}}"#).unwrap();
        let nudged = base.merged(&ov);
        assert!(!nudged.eq.air_lift.enabled, "air lift must stay disabled");

        let a = derive_processed_key(&voice(), "text", None, &base);
        let b = derive_processed_key(&voice(), "text", None, &nudged);
        assert_ne!(a.key, b.key);
    }

    #[test]
    fn enabling_one_effect_changes_key() {
        let base = ProcessingChain::default();
        let ov: ChainOverride =
            serde_json::from_str(r#"{"spatial":{"reverb":{"enabled":true}}}"#).unwrap();
        let enabled = base.merged(&ov);

        let a = derive_processed_key(&voice(), "text", None, &base);
        let b = derive_processed_key(&voice(), "text", None, &enabled);
        assert_ne!(a.key, b.key);
    }

    #[test]
    fn synthesis_key_ignores_chain() {
        // Processed keys differ by chain; synthesis keys cannot see it.
        let a = derive_synthesis_key(&voice(), "text", None);
        let b = derive_synthesis_key(&voice(), "text", None);
        assert_eq!(a.key, b.key);

        let with_chain = derive_processed_key(&voice(), "text", None, &ProcessingChain::default());
        assert_ne!(a.key, with_chain.key);
    }
}
