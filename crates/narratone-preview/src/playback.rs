//! Playback controller — the single-active-stream state machine.
//!
//! ```text
//!   Idle → Loading → Playing ⇄ Paused
//!    ▲                        │
//!    └── stop / natural end ──┘
//! ```
//!
//! Exactly one stream is ever active: beginning a new preview implicitly
//! stops the previous one. Every transition delivers a full
//! [`PlaybackState`] snapshot (never a diff) to all subscribers, in
//! transition order, so a late subscriber always observes a consistent
//! current state.
//!
//! ## Stale results
//!
//! Synthesis and processing can take seconds. [`PlaybackController::begin`]
//! hands out a [`RequestToken`] tied to the current generation; `stop` and
//! any newer `begin` bump the generation, so an in-flight preview that
//! resolves late finds its token stale and its audio never starts.
//!
//! ## Pause is stop-and-restart
//!
//! The output primitive ([`AudioSink`](crate::sink::AudioSink)) cannot
//! suspend a running stream, so `pause` records the elapsed position and
//! stops the stream, and `resume` starts a fresh stream at that offset.
//! The observable contract is indistinguishable from a true suspend.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::audio::DecodedAudio;
use crate::error::PlaybackError;
use crate::sink::AudioSink;

// ── Public state types ─────────────────────────────────────────────

/// Phase of the playback state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackPhase {
    /// Nothing loaded.
    Idle,
    /// A preview request is resolving (cache lookup, synthesis, effects).
    Loading,
    /// Audio is playing.
    Playing,
    /// Playback suspended; position is retained for resume.
    Paused,
}

/// Snapshot of the playback state — the single source of truth a UI
/// renders from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub phase: PlaybackPhase,
    pub is_playing: bool,
    /// Seconds into the loaded buffer, monotonic within a play run.
    pub position_secs: f64,
    /// Duration of the loaded buffer; fixed once decoded, 0 when idle.
    pub duration_secs: f64,
    /// Identity of the currently loaded segment, if any.
    pub segment_id: Option<u64>,
}

impl PlaybackState {
    #[must_use]
    pub const fn idle() -> Self {
        Self {
            phase: PlaybackPhase::Idle,
            is_playing: false,
            position_secs: 0.0,
            duration_secs: 0.0,
            segment_id: None,
        }
    }
}

/// Token identifying one preview request generation.
///
/// Obtained from [`PlaybackController::begin`]; stale tokens make all
/// later controller calls for that request no-ops or `Superseded` errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken(u64);

/// Why a waited-on playback run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The stream drained naturally.
    Natural,
    /// An explicit stop or a newer preview superseded the run.
    Stopped,
}

// ── Subscriptions ──────────────────────────────────────────────────

type SubscriberFn = dyn Fn(PlaybackState) + Send + Sync + 'static;
type SubscriberMap = Mutex<BTreeMap<u64, Arc<SubscriberFn>>>;

/// Handle returned by [`PlaybackController::subscribe`].
///
/// Dropping it (or calling [`unsubscribe`](Self::unsubscribe)) removes the
/// callback; no further snapshots are delivered.
pub struct Subscription {
    id: u64,
    subscribers: Weak<SubscriberMap>,
}

impl Subscription {
    /// Explicitly remove this subscription.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(map) = self.subscribers.upgrade() {
            if let Ok(mut map) = map.lock() {
                map.remove(&self.id);
            }
        }
    }
}

// ── Controller ─────────────────────────────────────────────────────

struct Inner {
    phase: PlaybackPhase,
    generation: u64,
    segment_id: Option<u64>,
    audio: Option<DecodedAudio>,
    /// Absolute position in the buffer where this run must stop.
    window_end: Option<Duration>,
    /// Position at the start of the current run (or the paused position).
    base_offset: Duration,
    /// Set while Playing.
    started_at: Option<Instant>,
}

impl Inner {
    fn position(&self) -> Duration {
        match self.phase {
            PlaybackPhase::Playing => {
                let elapsed = self.started_at.map_or(Duration::ZERO, |t| t.elapsed());
                let end = self.end_position();
                (self.base_offset + elapsed).min(end)
            }
            PlaybackPhase::Paused => self.base_offset,
            PlaybackPhase::Idle | PlaybackPhase::Loading => Duration::ZERO,
        }
    }

    fn end_position(&self) -> Duration {
        let duration = self.audio.as_ref().map_or(Duration::ZERO, DecodedAudio::duration);
        self.window_end.map_or(duration, |end| end.min(duration))
    }

    fn snapshot(&self) -> PlaybackState {
        PlaybackState {
            phase: self.phase,
            is_playing: self.phase == PlaybackPhase::Playing,
            position_secs: self.position().as_secs_f64(),
            duration_secs: self
                .audio
                .as_ref()
                .map_or(0.0, |a| a.duration().as_secs_f64()),
            segment_id: self.segment_id,
        }
    }

    fn reset_to_idle(&mut self) {
        self.phase = PlaybackPhase::Idle;
        self.segment_id = None;
        self.audio = None;
        self.window_end = None;
        self.base_offset = Duration::ZERO;
        self.started_at = None;
    }
}

/// The single-active-stream playback state machine.
///
/// Constructed once per process (an explicit context object, not a
/// singleton) and shared via `Arc` between the preview orchestrator and
/// the UI layer.
///
/// Locking: `sink_op` serializes every sink command together with the
/// token check that authorizes it, so a `begin`/`stop` can never slip
/// between a `start`'s generation check and its stream actually starting.
/// It is acquired before `inner` and never while delivering snapshots.
pub struct PlaybackController {
    sink: Box<dyn AudioSink>,
    sink_op: Mutex<()>,
    inner: Mutex<Inner>,
    subscribers: Arc<SubscriberMap>,
    next_sub_id: Mutex<u64>,
    state_tx: watch::Sender<PlaybackState>,
    /// Snapshots queued under the state lock, delivered in queue order.
    pending: Mutex<VecDeque<PlaybackState>>,
    delivering: Mutex<()>,
    /// Handle to ourselves for completion callbacks; `Weak` so a dropped
    /// controller never fires them.
    weak_self: Weak<Self>,
}

impl PlaybackController {
    /// Create a controller on top of an output sink.
    #[must_use]
    pub fn new(sink: Box<dyn AudioSink>) -> Arc<Self> {
        let (state_tx, _) = watch::channel(PlaybackState::idle());
        Arc::new_cyclic(|weak_self| Self {
            sink,
            sink_op: Mutex::new(()),
            inner: Mutex::new(Inner {
                phase: PlaybackPhase::Idle,
                generation: 0,
                segment_id: None,
                audio: None,
                window_end: None,
                base_offset: Duration::ZERO,
                started_at: None,
            }),
            subscribers: Arc::new(Mutex::new(BTreeMap::new())),
            next_sub_id: Mutex::new(0),
            state_tx,
            pending: Mutex::new(VecDeque::new()),
            delivering: Mutex::new(()),
            weak_self: weak_self.clone(),
        })
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.lock_inner().snapshot()
    }

    /// Subscribe to state snapshots. Every transition delivers the full
    /// current state, in transition order, in subscription order.
    #[must_use]
    pub fn subscribe(
        &self,
        callback: impl Fn(PlaybackState) + Send + Sync + 'static,
    ) -> Subscription {
        let id = {
            let mut next = self.next_sub_id.lock().expect("subscriber id lock");
            *next += 1;
            *next
        };
        self.subscribers
            .lock()
            .expect("subscriber map lock")
            .insert(id, Arc::new(callback));
        Subscription {
            id,
            subscribers: Arc::downgrade(&self.subscribers),
        }
    }

    /// Whether `token` still belongs to the current request generation.
    #[must_use]
    pub fn is_current(&self, token: RequestToken) -> bool {
        self.lock_inner().generation == token.0
    }

    // ── Transitions ────────────────────────────────────────────────

    /// Begin a new preview request: stop any active stream, invalidate
    /// outstanding tokens, and enter Loading for `segment_id`.
    pub fn begin(&self, segment_id: u64) -> RequestToken {
        let token = {
            let _sink_op = self.lock_sink_op();
            self.sink.stop();
            let mut inner = self.lock_inner();
            inner.reset_to_idle();
            inner.generation += 1;
            inner.phase = PlaybackPhase::Loading;
            inner.segment_id = Some(segment_id);
            self.enqueue(inner.snapshot());
            RequestToken(inner.generation)
        };
        tracing::debug!(segment_id, generation = token.0, "Preview loading");
        self.deliver_pending();
        token
    }

    /// Load a decoded buffer and start playing (autoplay on load).
    ///
    /// `start_offset` and `limit` bound the play window; both are clamped
    /// to the buffer duration. Fails with `Superseded` if `token` is stale.
    pub fn start(
        &self,
        token: RequestToken,
        audio: &DecodedAudio,
        start_offset: Duration,
        limit: Option<Duration>,
    ) -> Result<(), PlaybackError> {
        let duration = audio.duration();
        let offset = start_offset.min(duration);
        let window_end = limit.map(|l| (offset + l).min(duration));

        let started = {
            let _sink_op = self.lock_sink_op();
            {
                let mut inner = self.lock_inner();
                if inner.generation != token.0 {
                    return Err(PlaybackError::Superseded);
                }
                inner.audio = Some(audio.clone());
                inner.base_offset = offset;
                inner.window_end = window_end;
                inner.phase = PlaybackPhase::Playing;
                inner.started_at = Some(Instant::now());
                self.enqueue(inner.snapshot());
            }
            // Token still current here: a competing begin/stop blocks on
            // the sink-op lock until this stream has actually started.
            let remaining = window_end.map(|end| end.saturating_sub(offset));
            self.sink
                .start(audio, offset, remaining, self.completion_callback(token))
        };

        if let Err(e) = started {
            {
                let mut inner = self.lock_inner();
                inner.reset_to_idle();
                self.enqueue(inner.snapshot());
            }
            self.deliver_pending();
            return Err(e);
        }

        tracing::debug!(
            offset_ms = offset.as_millis(),
            duration_ms = duration.as_millis(),
            "Playback started"
        );
        self.deliver_pending();
        Ok(())
    }

    /// Pause playback, recording the elapsed position for resume.
    pub fn pause(&self) -> Result<(), PlaybackError> {
        let position_secs = {
            let _sink_op = self.lock_sink_op();
            let snapshot = {
                let mut inner = self.lock_inner();
                if inner.phase != PlaybackPhase::Playing {
                    return Err(PlaybackError::NotPlaying);
                }
                inner.base_offset = inner.position();
                inner.started_at = None;
                inner.phase = PlaybackPhase::Paused;
                let snapshot = inner.snapshot();
                self.enqueue(snapshot);
                snapshot
            };
            // The primitive cannot suspend; drop the stream, keep the offset.
            self.sink.stop();
            snapshot.position_secs
        };
        tracing::debug!(position_secs, "Playback paused");
        self.deliver_pending();
        Ok(())
    }

    /// Resume from the paused position by restarting the stream there.
    pub fn resume(&self) -> Result<(), PlaybackError> {
        let (offset, started) = {
            let _sink_op = self.lock_sink_op();
            let (token, audio, offset, remaining) = {
                let mut inner = self.lock_inner();
                if inner.phase != PlaybackPhase::Paused {
                    return Err(PlaybackError::NotPaused);
                }
                let audio = inner.audio.clone().ok_or(PlaybackError::NotPaused)?;
                let offset = inner.base_offset;
                let remaining = inner.window_end.map(|end| end.saturating_sub(offset));
                inner.phase = PlaybackPhase::Playing;
                inner.started_at = Some(Instant::now());
                self.enqueue(inner.snapshot());
                (RequestToken(inner.generation), audio, offset, remaining)
            };
            let started = self.sink.start(
                &audio,
                offset,
                remaining,
                self.completion_callback(token),
            );
            (offset, started)
        };

        if let Err(e) = started {
            {
                let mut inner = self.lock_inner();
                inner.reset_to_idle();
                self.enqueue(inner.snapshot());
            }
            self.deliver_pending();
            return Err(e);
        }

        tracing::debug!(offset_ms = offset.as_millis(), "Playback resumed");
        self.deliver_pending();
        Ok(())
    }

    /// Stop playback: release the stream and buffer, clear the segment,
    /// and invalidate all outstanding request tokens.
    pub fn stop(&self) {
        {
            let _sink_op = self.lock_sink_op();
            self.sink.stop();
            let mut inner = self.lock_inner();
            inner.generation += 1;
            inner.reset_to_idle();
            self.enqueue(inner.snapshot());
        }
        tracing::debug!("Playback stopped");
        self.deliver_pending();
    }

    /// Abandon a request that failed before playback could start.
    ///
    /// Resets to Idle only if `token` is still current; a superseded
    /// request's failure must not disturb the newer request's state.
    pub fn abandon(&self, token: RequestToken) {
        {
            let mut inner = self.lock_inner();
            if inner.generation != token.0 || inner.phase == PlaybackPhase::Idle {
                return;
            }
            inner.reset_to_idle();
            self.enqueue(inner.snapshot());
        }
        self.deliver_pending();
    }

    /// Wait until the run identified by `token` ends.
    ///
    /// Resolves `Natural` when the stream drains on its own, `Stopped`
    /// when an explicit stop or a newer preview supersedes it.
    pub async fn wait_for_end(&self, token: RequestToken) -> EndReason {
        let mut rx = self.state_tx.subscribe();
        loop {
            {
                let inner = self.lock_inner();
                if inner.generation != token.0 {
                    return EndReason::Stopped;
                }
                if inner.phase == PlaybackPhase::Idle {
                    return EndReason::Natural;
                }
            }
            if rx.changed().await.is_err() {
                return EndReason::Stopped;
            }
        }
    }

    // ── Internal ───────────────────────────────────────────────────

    fn lock_inner(&self) -> std::sync::MutexGuard<'_, Inner> {
        // The inner lock is never held across an await point and the
        // critical sections cannot panic, so poisoning is unreachable.
        self.inner.lock().expect("playback state lock")
    }

    fn lock_sink_op(&self) -> std::sync::MutexGuard<'_, ()> {
        self.sink_op.lock().expect("sink op lock")
    }

    /// Natural end-of-stream handler, guarded by the request token so a
    /// watcher from a superseded run cannot flip a newer run to Idle.
    fn completion_callback(&self, token: RequestToken) -> Box<dyn FnOnce() + Send> {
        let controller = self.weak_self.clone();
        Box::new(move || {
            if let Some(controller) = controller.upgrade() {
                controller.finish_naturally(token);
            }
        })
    }

    fn finish_naturally(&self, token: RequestToken) {
        {
            let mut inner = self.lock_inner();
            if inner.generation != token.0 || inner.phase != PlaybackPhase::Playing {
                return;
            }
            inner.reset_to_idle();
            self.enqueue(inner.snapshot());
        }
        tracing::debug!("Playback finished naturally");
        self.deliver_pending();
    }

    /// Queue a snapshot. Callers hold the state lock, so queue order is
    /// transition order.
    fn enqueue(&self, state: PlaybackState) {
        self.pending
            .lock()
            .expect("pending snapshot lock")
            .push_back(state);
    }

    /// Drain queued snapshots to the watch channel and every subscriber.
    ///
    /// Snapshots were queued in transition order; a single drainer at a
    /// time preserves that order on delivery. A caller that loses the
    /// `delivering` race returns immediately (the holder drains its
    /// snapshot), and the re-check after release catches anything queued
    /// while the holder was finishing.
    fn deliver_pending(&self) {
        loop {
            {
                let Ok(_guard) = self.delivering.try_lock() else {
                    return;
                };
                loop {
                    let next = self
                        .pending
                        .lock()
                        .expect("pending snapshot lock")
                        .pop_front();
                    let Some(state) = next else { break };
                    let _ = self.state_tx.send(state);
                    let callbacks: Vec<Arc<SubscriberFn>> = self
                        .subscribers
                        .lock()
                        .expect("subscriber map lock")
                        .values()
                        .cloned()
                        .collect();
                    for callback in callbacks {
                        callback(state);
                    }
                }
            }
            if self
                .pending
                .lock()
                .expect("pending snapshot lock")
                .is_empty()
            {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::CompletionCallback;

    // ── Fake sink ──────────────────────────────────────────────────

    #[derive(Default)]
    struct FakeSinkState {
        starts: Vec<(Duration, Option<Duration>)>,
        stops: usize,
        on_complete: Option<CompletionCallback>,
    }

    /// Hand-driven sink: playback "ends" only when the test says so.
    #[derive(Clone, Default)]
    struct FakeSink(Arc<Mutex<FakeSinkState>>);

    impl FakeSink {
        fn complete_current(&self) {
            let cb = self.0.lock().unwrap().on_complete.take();
            if let Some(cb) = cb {
                cb();
            }
        }

        fn starts(&self) -> Vec<(Duration, Option<Duration>)> {
            self.0.lock().unwrap().starts.clone()
        }

        fn stops(&self) -> usize {
            self.0.lock().unwrap().stops
        }
    }

    impl AudioSink for FakeSink {
        fn start(
            &self,
            _audio: &DecodedAudio,
            offset: Duration,
            limit: Option<Duration>,
            on_complete: CompletionCallback,
        ) -> Result<(), PlaybackError> {
            let mut state = self.0.lock().unwrap();
            state.starts.push((offset, limit));
            state.on_complete = Some(on_complete);
            Ok(())
        }

        fn stop(&self) {
            let mut state = self.0.lock().unwrap();
            state.stops += 1;
            state.on_complete = None;
        }
    }

    fn ten_seconds_mono() -> DecodedAudio {
        DecodedAudio::from_pcm(vec![0.0; 80_000], 1, 8_000)
    }

    fn controller() -> (Arc<PlaybackController>, FakeSink) {
        let sink = FakeSink::default();
        (PlaybackController::new(Box::new(sink.clone())), sink)
    }

    #[test]
    fn initial_state_is_idle() {
        let (controller, _sink) = controller();
        assert_eq!(controller.state(), PlaybackState::idle());
    }

    #[test]
    fn begin_enters_loading_with_segment() {
        let (controller, _sink) = controller();
        let _token = controller.begin(7);
        let state = controller.state();
        assert_eq!(state.phase, PlaybackPhase::Loading);
        assert_eq!(state.segment_id, Some(7));
        assert!(!state.is_playing);
    }

    #[test]
    fn start_plays_and_reports_duration() {
        let (controller, _sink) = controller();
        let token = controller.begin(1);
        controller
            .start(token, &ten_seconds_mono(), Duration::ZERO, None)
            .unwrap();

        let state = controller.state();
        assert_eq!(state.phase, PlaybackPhase::Playing);
        assert!(state.is_playing);
        assert!((state.duration_secs - 10.0).abs() < 1e-6);
        assert_eq!(state.segment_id, Some(1));
    }

    #[test]
    fn stale_token_cannot_start_playback() {
        let (controller, sink) = controller();
        let stale = controller.begin(1);
        let current = controller.begin(2);

        let err = controller
            .start(stale, &ten_seconds_mono(), Duration::ZERO, None)
            .unwrap_err();
        assert!(matches!(err, PlaybackError::Superseded));
        // The newer request is unaffected.
        assert_eq!(controller.state().segment_id, Some(2));
        assert!(sink.starts().is_empty());

        controller
            .start(current, &ten_seconds_mono(), Duration::ZERO, None)
            .unwrap();
        assert_eq!(sink.starts().len(), 1);
    }

    #[test]
    fn stop_invalidates_in_flight_token() {
        let (controller, _sink) = controller();
        let token = controller.begin(1);
        controller.stop();

        let err = controller
            .start(token, &ten_seconds_mono(), Duration::ZERO, None)
            .unwrap_err();
        assert!(matches!(err, PlaybackError::Superseded));
        assert_eq!(controller.state().phase, PlaybackPhase::Idle);
    }

    #[test]
    fn pause_records_offset_and_resume_restarts_there() {
        let (controller, sink) = controller();
        let token = controller.begin(1);
        controller
            .start(token, &ten_seconds_mono(), Duration::from_secs(2), None)
            .unwrap();

        controller.pause().unwrap();
        let paused = controller.state();
        assert_eq!(paused.phase, PlaybackPhase::Paused);
        // Started at 2s and essentially no time has elapsed.
        assert!(paused.position_secs >= 2.0 && paused.position_secs < 2.5);

        controller.resume().unwrap();
        assert_eq!(controller.state().phase, PlaybackPhase::Playing);

        let starts = sink.starts();
        assert_eq!(starts.len(), 2);
        // Resume restarted at (approximately) the paused offset.
        assert!(starts[1].0 >= Duration::from_secs(2));
        assert!(starts[1].0 < Duration::from_millis(2_500));
    }

    #[test]
    fn pause_requires_playing() {
        let (controller, _sink) = controller();
        assert!(matches!(controller.pause(), Err(PlaybackError::NotPlaying)));
        let _token = controller.begin(1);
        assert!(matches!(controller.pause(), Err(PlaybackError::NotPlaying)));
    }

    #[test]
    fn resume_requires_paused() {
        let (controller, _sink) = controller();
        assert!(matches!(controller.resume(), Err(PlaybackError::NotPaused)));
    }

    #[test]
    fn natural_end_returns_to_idle() {
        let (controller, sink) = controller();
        let token = controller.begin(1);
        controller
            .start(token, &ten_seconds_mono(), Duration::ZERO, None)
            .unwrap();

        sink.complete_current();

        let state = controller.state();
        assert_eq!(state.phase, PlaybackPhase::Idle);
        assert_eq!(state.segment_id, None);
        assert!((state.duration_secs - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn start_clamps_window_to_buffer() {
        let (controller, sink) = controller();
        let token = controller.begin(1);
        controller
            .start(
                token,
                &ten_seconds_mono(),
                Duration::from_secs(8),
                Some(Duration::from_secs(60)),
            )
            .unwrap();

        let starts = sink.starts();
        assert_eq!(starts[0].0, Duration::from_secs(8));
        // Limit clamped to the 2 seconds that actually remain.
        assert_eq!(starts[0].1, Some(Duration::from_secs(2)));
    }

    #[test]
    fn subscribers_receive_snapshots_and_unsubscribe_works() {
        let (controller, _sink) = controller();
        let seen: Arc<Mutex<Vec<PlaybackPhase>>> = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = Arc::clone(&seen);
        let subscription = controller.subscribe(move |state| {
            seen_clone.lock().unwrap().push(state.phase);
        });

        let token = controller.begin(1);
        controller
            .start(token, &ten_seconds_mono(), Duration::ZERO, None)
            .unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![PlaybackPhase::Loading, PlaybackPhase::Playing]
        );

        subscription.unsubscribe();
        controller.stop();
        // No notification after unsubscribe.
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn begin_stops_previous_stream() {
        let (controller, sink) = controller();
        let token = controller.begin(1);
        controller
            .start(token, &ten_seconds_mono(), Duration::ZERO, None)
            .unwrap();

        let stops_before = sink.stops();
        let _token2 = controller.begin(2);
        assert!(sink.stops() > stops_before);
        assert_eq!(controller.state().segment_id, Some(2));
    }

    #[tokio::test]
    async fn wait_for_end_sees_natural_completion() {
        let (controller, sink) = controller();
        let token = controller.begin(1);
        controller
            .start(token, &ten_seconds_mono(), Duration::ZERO, None)
            .unwrap();

        sink.complete_current();
        assert_eq!(controller.wait_for_end(token).await, EndReason::Natural);
    }

    #[tokio::test]
    async fn wait_for_end_sees_stop_as_cancellation() {
        let (controller, _sink) = controller();
        let token = controller.begin(1);
        controller
            .start(token, &ten_seconds_mono(), Duration::ZERO, None)
            .unwrap();

        controller.stop();
        assert_eq!(controller.wait_for_end(token).await, EndReason::Stopped);
    }

    // ── Race regressions ───────────────────────────────────────────

    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc;

    /// Sink whose `start` lingers before the stream goes live, and which
    /// signals a channel on entry so a test can interleave other calls.
    #[derive(Clone, Default)]
    struct LingeringSink {
        active: Arc<AtomicBool>,
        entered: Arc<Mutex<Option<mpsc::Sender<()>>>>,
    }

    impl AudioSink for LingeringSink {
        fn start(
            &self,
            _audio: &DecodedAudio,
            _offset: Duration,
            _limit: Option<Duration>,
            _on_complete: CompletionCallback,
        ) -> Result<(), PlaybackError> {
            if let Some(tx) = self.entered.lock().unwrap().take() {
                let _ = tx.send(());
            }
            std::thread::sleep(Duration::from_millis(50));
            self.active.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&self) {
            self.active.store(false, Ordering::SeqCst);
        }
    }

    #[test]
    fn begin_during_start_never_leaves_a_stale_stream() {
        let sink = LingeringSink::default();
        let (entered_tx, entered_rx) = mpsc::channel();
        *sink.entered.lock().unwrap() = Some(entered_tx);
        let controller = PlaybackController::new(Box::new(sink.clone()));

        let token = controller.begin(1);

        // A newer preview arrives while the stale request is mid-start.
        let racer = {
            let controller = Arc::clone(&controller);
            std::thread::spawn(move || {
                entered_rx.recv().unwrap();
                controller.begin(2);
            })
        };

        controller
            .start(token, &ten_seconds_mono(), Duration::ZERO, None)
            .unwrap();
        racer.join().unwrap();

        // The newer request owns the controller and no stream is live.
        let state = controller.state();
        assert_eq!(state.phase, PlaybackPhase::Loading);
        assert_eq!(state.segment_id, Some(2));
        assert!(!sink.active.load(Ordering::SeqCst));
    }

    /// Sink whose streams drain before `start` even returns.
    #[derive(Clone, Default)]
    struct InstantSink;

    impl AudioSink for InstantSink {
        fn start(
            &self,
            _audio: &DecodedAudio,
            _offset: Duration,
            _limit: Option<Duration>,
            on_complete: CompletionCallback,
        ) -> Result<(), PlaybackError> {
            on_complete();
            Ok(())
        }

        fn stop(&self) {}
    }

    #[test]
    fn instantly_draining_stream_notifies_in_transition_order() {
        let controller = PlaybackController::new(Box::new(InstantSink));
        let seen: Arc<Mutex<Vec<PlaybackPhase>>> = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = Arc::clone(&seen);
        let _subscription = controller.subscribe(move |state| {
            seen_clone.lock().unwrap().push(state.phase);
        });

        let token = controller.begin(1);
        controller
            .start(token, &ten_seconds_mono(), Duration::ZERO, None)
            .unwrap();

        // Playing is delivered before the natural-end Idle, and the last
        // delivered snapshot agrees with the actual state.
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                PlaybackPhase::Loading,
                PlaybackPhase::Playing,
                PlaybackPhase::Idle
            ]
        );
        assert_eq!(controller.state().phase, PlaybackPhase::Idle);
    }
}
