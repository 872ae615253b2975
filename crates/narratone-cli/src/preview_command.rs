//! Handlers for `narratone preview` and `narratone derive-key`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use narratone_cache::{derive_processed_key, derive_synthesis_key};
use narratone_core::domain::{
    ChainOverride, Character, ProcessingChain, ProjectConfig, Segment, StyleParams,
    SynthesisSettings, VoiceParams,
};
use narratone_core::{PipelineEventSink, TracingEventSink};
use narratone_preview::{
    CacheOutcome, HttpSynthesisProvider, PlaybackController, PreviewRequest, PreviewService,
    ProcessToolEffects, RodioSink,
};

use crate::commands::PreviewArgs;
use crate::paths::CacheLayout;

pub fn derive_key(text: &str, voice_id: &str, chain_file: Option<&Path>) -> Result<()> {
    let voice = VoiceParams::new(voice_id);
    let style = StyleParams::default();
    let chain = load_chain(chain_file)?;

    let synth = derive_synthesis_key(&voice, text, Some(&style));
    let processed = derive_processed_key(&voice, text, Some(&style), &chain);
    println!("synthesis  {}", synth.key);
    println!("processed  {}", processed.key);
    Ok(())
}

pub async fn preview(layout: CacheLayout, args: PreviewArgs) -> Result<()> {
    let settings = SynthesisSettings {
        endpoint: args.endpoint,
        api_key: args.api_key,
        model: args.model,
    };

    let sink = RodioSink::spawn().context("failed to open the audio output device")?;
    let playback = PlaybackController::new(Box::new(sink));
    let events: Arc<dyn PipelineEventSink> = Arc::new(TracingEventSink);
    let service = PreviewService::new(
        layout.synthesis,
        layout.processed,
        Arc::new(HttpSynthesisProvider::new(settings.clone())),
        Arc::new(ProcessToolEffects::new(args.effects_tool, layout.fx_work)),
        events,
        playback,
    );

    let segment = Segment::new(1, 0, args.text, "");
    let character = Character::cast("cli", VoiceParams::new(args.voice));
    let project = ProjectConfig {
        default_chain: ProcessingChain::default(),
        cache_dir: None,
        synthesis: settings,
    };

    let mut request = PreviewRequest::new(&segment, &character, &project);
    request.start_offset = args.offset.map(Duration::from_secs_f64);
    request.duration = args.duration.map(Duration::from_secs_f64);

    let outcome = if args.exaggerated {
        service.preview_exaggerated(&request).await?
    } else {
        service.preview(&request).await?
    };

    let source = match outcome.cache {
        CacheOutcome::ProcessedHit => "processed cache",
        CacheOutcome::SynthesisHit => "synthesis cache",
        CacheOutcome::Synthesized => "cloud synthesis",
    };
    println!(
        "Playing {:.2}s ({source}{})",
        outcome.audio_duration.as_secs_f64(),
        if outcome.processed { "" } else { ", unprocessed" },
    );

    service.playback().wait_for_end(outcome.token).await;
    Ok(())
}

fn load_chain(chain_file: Option<&Path>) -> Result<ProcessingChain> {
    let base = ProcessingChain::default();
    match chain_file {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("failed to read chain file {}", path.display()))?;
            let ov: ChainOverride = serde_json::from_slice(&bytes)
                .with_context(|| format!("invalid chain override in {}", path.display()))?;
            Ok(base.merged(&ov))
        }
        None => Ok(base),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_file_merges_onto_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.json");
        std::fs::write(&path, r#"{"spatial":{"reverb":{"enabled":true}}}"#).unwrap();

        let chain = load_chain(Some(&path)).unwrap();
        assert!(chain.spatial.reverb.enabled);
        // Untouched siblings keep their defaults.
        assert!(!chain.eq.air_lift.enabled);
    }

    #[test]
    fn unreadable_chain_file_is_an_error() {
        assert!(load_chain(Some(Path::new("/nonexistent/chain.json"))).is_err());
    }
}
