//! Preview orchestrator — the pipeline from a text segment to playing audio.
//!
//! One request flows: validate → processed-cache lookup → synthesis-cache
//! lookup or cloud synthesis → effects processing (with fallback to the
//! raw take) → decode → playback. The two caches are consulted outermost
//! first, so a processed hit skips synthesis and effects entirely.
//!
//! Effects failures are absorbed here: the preview still plays, and the
//! failure surfaces as exactly one [`PipelineEvent::ProcessingFellBack`].
//! Synthesis failures are fatal; there is nothing to fall back to.

use std::sync::Arc;
use std::time::{Duration, Instant};

use narratone_cache::{
    derive_processed_key, derive_synthesis_key, AudioCache, CacheEntryMeta, CacheKey, DerivedKey,
};
use narratone_core::domain::{
    ChainOverride, Character, ProcessingChain, ProjectConfig, Segment, VoiceParams,
};
use narratone_core::{
    CacheKind, EffectsError, EffectsProcessor, PipelineEvent, PipelineEventSink, SynthesisProvider,
};

use crate::audio::DecodedAudio;
use crate::error::PreviewError;
use crate::playback::{PlaybackController, RequestToken};

/// Where the audio a preview played came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Fully processed audio was already cached.
    ProcessedHit,
    /// Raw synthesis was cached; only effects ran.
    SynthesisHit,
    /// Nothing was cached; the cloud synthesized a fresh take.
    Synthesized,
}

/// What a completed preview request resolved to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewOutcome {
    /// Token of the playback run this preview started. Pass to
    /// [`PlaybackController::wait_for_end`] to await completion.
    pub token: RequestToken,

    /// Which cache tier (if any) served the request.
    pub cache: CacheOutcome,

    /// `false` when the effects step failed and the raw take is playing.
    pub processed: bool,

    /// Duration of the full decoded buffer.
    pub audio_duration: Duration,
}

/// One preview request.
///
/// `start_offset` and `duration` select a play window inside the rendered
/// audio; they never affect synthesis, processing, or cache keys.
pub struct PreviewRequest<'a> {
    pub segment: &'a Segment,
    pub character: &'a Character,
    pub project: &'a ProjectConfig,
    /// Per-segment chain override, merged onto the project default.
    pub chain_override: Option<&'a ChainOverride>,
    pub start_offset: Option<Duration>,
    pub duration: Option<Duration>,
}

impl<'a> PreviewRequest<'a> {
    /// A whole-segment request with the project's default chain.
    #[must_use]
    pub fn new(segment: &'a Segment, character: &'a Character, project: &'a ProjectConfig) -> Self {
        Self {
            segment,
            character,
            project,
            chain_override: None,
            start_offset: None,
            duration: None,
        }
    }
}

/// The preview pipeline: caches, collaborators, event sink, and the
/// playback controller, wired once and shared.
pub struct PreviewService {
    synthesis_cache: AudioCache,
    processed_cache: AudioCache,
    synthesizer: Arc<dyn SynthesisProvider>,
    effects: Arc<dyn EffectsProcessor>,
    events: Arc<dyn PipelineEventSink>,
    playback: Arc<PlaybackController>,
}

impl PreviewService {
    #[must_use]
    pub fn new(
        synthesis_cache: AudioCache,
        processed_cache: AudioCache,
        synthesizer: Arc<dyn SynthesisProvider>,
        effects: Arc<dyn EffectsProcessor>,
        events: Arc<dyn PipelineEventSink>,
        playback: Arc<PlaybackController>,
    ) -> Self {
        Self {
            synthesis_cache,
            processed_cache,
            synthesizer,
            effects,
            events,
            playback,
        }
    }

    /// The shared playback controller (for pause/resume/stop/subscribe).
    #[must_use]
    pub fn playback(&self) -> &Arc<PlaybackController> {
        &self.playback
    }

    /// Cache tiers for one request. A project that pins its own cache
    /// directory gets project-local tiers; otherwise the service defaults
    /// apply.
    fn caches_for(&self, project: &ProjectConfig) -> (AudioCache, AudioCache) {
        match project.cache_dir.as_deref() {
            Some(root) => (
                AudioCache::new(root.join("synthesis")),
                AudioCache::new(root.join("processed")),
            ),
            None => (self.synthesis_cache.clone(), self.processed_cache.clone()),
        }
    }

    /// Preview a segment with the project's default chain merged with the
    /// request's per-segment override.
    pub async fn preview(&self, req: &PreviewRequest<'_>) -> Result<PreviewOutcome, PreviewError> {
        let chain = match req.chain_override {
            Some(ov) => req.project.default_chain.merged(ov),
            None => req.project.default_chain.clone(),
        };
        self.preview_with_chain(req, &chain).await
    }

    /// Preview with every effect enabled at an extreme setting, so each
    /// stage of the chain is plainly audible. Ignores any override.
    pub async fn preview_exaggerated(
        &self,
        req: &PreviewRequest<'_>,
    ) -> Result<PreviewOutcome, PreviewError> {
        self.preview_with_chain(req, &ProcessingChain::exaggerated())
            .await
    }

    async fn preview_with_chain(
        &self,
        req: &PreviewRequest<'_>,
        chain: &ProcessingChain,
    ) -> Result<PreviewOutcome, PreviewError> {
        // Implicitly stops whatever was playing and invalidates older
        // in-flight requests.
        let token = self.playback.begin(req.segment.id);
        match self.run(req, chain, token).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                // Token-guarded: a failure from a superseded request must
                // not disturb the newer request's state.
                self.playback.abandon(token);
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        req: &PreviewRequest<'_>,
        chain: &ProcessingChain,
        token: RequestToken,
    ) -> Result<PreviewOutcome, PreviewError> {
        let segment = req.segment;
        if segment.text.trim().is_empty() {
            return Err(PreviewError::EmptySegment(segment.id));
        }
        let Some(voice) = req.character.voice.as_ref() else {
            return Err(PreviewError::MissingVoice {
                character: req.character.name.clone(),
                segment_id: segment.id,
            });
        };
        let style = Some(&req.character.style);

        tracing::info!(
            segment_id = segment.id,
            character = %req.character.name,
            voice_id = %voice.voice_id,
            "Preview requested"
        );

        let (synthesis_cache, processed_cache) = self.caches_for(req.project);

        // Outermost cache first: a processed hit skips everything.
        let processed = derive_processed_key(voice, &segment.text, style, chain);
        let lookup = Instant::now();
        if let Some((bytes, _)) = processed_cache.read(&processed.key).await? {
            self.events.emit(PipelineEvent::CacheHit {
                kind: CacheKind::Processed,
                key: processed.key.to_string(),
                elapsed: lookup.elapsed(),
            });
            return self.play(token, bytes, req, CacheOutcome::ProcessedHit, true);
        }
        self.events.emit(PipelineEvent::CacheMiss {
            kind: CacheKind::Processed,
            key: processed.key.to_string(),
            elapsed: lookup.elapsed(),
        });

        // Raw synthesis tier.
        let synth = derive_synthesis_key(voice, &segment.text, style);
        let lookup = Instant::now();
        let (raw_bytes, cache) = match synthesis_cache.read(&synth.key).await? {
            Some((bytes, _)) => {
                self.events.emit(PipelineEvent::CacheHit {
                    kind: CacheKind::Synthesis,
                    key: synth.key.to_string(),
                    elapsed: lookup.elapsed(),
                });
                (bytes, CacheOutcome::SynthesisHit)
            }
            None => {
                self.events.emit(PipelineEvent::CacheMiss {
                    kind: CacheKind::Synthesis,
                    key: synth.key.to_string(),
                    elapsed: lookup.elapsed(),
                });
                let started = Instant::now();
                let bytes = match self
                    .synthesizer
                    .synthesize(voice, &segment.text, style)
                    .await
                {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        self.events.emit(PipelineEvent::SynthesisFailed {
                            key: synth.key.to_string(),
                            elapsed: started.elapsed(),
                            error: e.to_string(),
                        });
                        return Err(e.into());
                    }
                };
                self.events.emit(PipelineEvent::SynthesisSucceeded {
                    key: synth.key.to_string(),
                    elapsed: started.elapsed(),
                    bytes: bytes.len() as u64,
                });
                synthesis_cache
                    .write(
                        &synth.key,
                        &bytes,
                        CacheEntryMeta::new(Some(voice.clone()), Some(synth.canonical.clone())),
                    )
                    .await?;
                (bytes, CacheOutcome::Synthesized)
            }
        };

        // Effects tier. Any failure here downgrades to the raw take.
        let (play_bytes, applied) = self
            .apply_effects(
                &synthesis_cache,
                &processed_cache,
                voice,
                chain,
                &synth.key,
                &processed,
                raw_bytes,
            )
            .await?;

        self.play(token, play_bytes, req, cache, applied)
    }

    /// Run the effects tool over the cached raw payload. On success the
    /// result is written to the processed cache; on any failure exactly one
    /// `ProcessingFellBack` event fires and the raw bytes come back.
    #[allow(clippy::too_many_arguments)]
    async fn apply_effects(
        &self,
        synthesis_cache: &AudioCache,
        processed_cache: &AudioCache,
        voice: &VoiceParams,
        chain: &ProcessingChain,
        synth_key: &CacheKey,
        processed: &DerivedKey,
        raw_bytes: Vec<u8>,
    ) -> Result<(Vec<u8>, bool), PreviewError> {
        let started = Instant::now();

        // The tool consumes a file path; the payload we just read (or
        // wrote) is already on disk in the synthesis cache.
        let outcome = match synthesis_cache.path(synth_key).await {
            Some(input) => {
                self.effects
                    .apply(&input, chain, processed.key.as_str())
                    .await
            }
            None => Err(EffectsError::MissingOutput(
                synthesis_cache.dir().join(format!("{synth_key}.wav")),
            )),
        };

        let processed_bytes = match outcome {
            Ok(output) => match tokio::fs::read(&output.output_path).await {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    self.events.emit(PipelineEvent::ProcessingFellBack {
                        key: processed.key.to_string(),
                        elapsed: started.elapsed(),
                        error: format!("output unreadable: {e}"),
                    });
                    None
                }
            },
            Err(e) => {
                self.events.emit(PipelineEvent::ProcessingFellBack {
                    key: processed.key.to_string(),
                    elapsed: started.elapsed(),
                    error: e.to_string(),
                });
                None
            }
        };

        match processed_bytes {
            Some(bytes) => {
                processed_cache
                    .write(
                        &processed.key,
                        &bytes,
                        CacheEntryMeta::new(Some(voice.clone()), Some(processed.canonical.clone())),
                    )
                    .await?;
                self.events.emit(PipelineEvent::ProcessingSucceeded {
                    key: processed.key.to_string(),
                    elapsed: started.elapsed(),
                });
                Ok((bytes, true))
            }
            None => Ok((raw_bytes, false)),
        }
    }

    /// Decode and hand the buffer to the playback controller, unless the
    /// request was superseded while resolving.
    fn play(
        &self,
        token: RequestToken,
        bytes: Vec<u8>,
        req: &PreviewRequest<'_>,
        cache: CacheOutcome,
        processed: bool,
    ) -> Result<PreviewOutcome, PreviewError> {
        if !self.playback.is_current(token) {
            return Err(PreviewError::Cancelled);
        }
        let audio = DecodedAudio::decode(bytes)?;
        let audio_duration = audio.duration();
        self.playback.start(
            token,
            &audio,
            req.start_offset.unwrap_or(Duration::ZERO),
            req.duration,
        )?;
        Ok(PreviewOutcome {
            token,
            cache,
            processed,
            audio_duration,
        })
    }
}
