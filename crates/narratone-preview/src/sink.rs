//! The output primitive — a start-at-offset / stop audio sink.
//!
//! The primitive is deliberately narrow: it cannot suspend or seek a
//! running stream. Pause/resume above it is therefore implemented as
//! stop-and-restart-from-offset by the playback controller; the sink only
//! ever starts a stream at an offset and stops it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use rodio::Source;
use rodio::buffer::SamplesBuffer;

use crate::audio::DecodedAudio;
use crate::error::PlaybackError;

/// Invoked when a started stream drains naturally. Not invoked after `stop`.
pub type CompletionCallback = Box<dyn FnOnce() + Send + 'static>;

/// Single-stream audio output primitive.
///
/// `start` implicitly stops any stream the sink is already playing — the
/// sink never plays two streams at once.
pub trait AudioSink: Send + Sync {
    /// Start playing `audio` from `offset`, optionally limited to `limit`
    /// of playback time. `on_complete` fires only on natural drain.
    fn start(
        &self,
        audio: &DecodedAudio,
        offset: Duration,
        limit: Option<Duration>,
        on_complete: CompletionCallback,
    ) -> Result<(), PlaybackError>;

    /// Stop the active stream, if any. Suppresses its completion callback.
    fn stop(&self);
}

// ── rodio-backed sink ──────────────────────────────────────────────

enum SinkCommand {
    Play {
        audio: DecodedAudio,
        offset: Duration,
        limit: Option<Duration>,
        on_complete: CompletionCallback,
    },
    Stop,
    Shutdown,
}

/// Production sink: rodio output on a dedicated OS thread.
///
/// rodio's `OutputStream` is not `Send`, so the stream lives on its own
/// thread and this handle talks to it over a channel. Each `Play` spawns a
/// short-lived watcher thread that blocks on `sleep_until_end` and fires
/// the completion callback only if the stream was not stopped first.
pub struct RodioSink {
    tx: mpsc::Sender<SinkCommand>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl RodioSink {
    /// Spawn the audio thread on the default output device.
    pub fn spawn() -> Result<Self, PlaybackError> {
        let (tx, rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let thread = std::thread::Builder::new()
            .name("narratone-audio".into())
            .spawn(move || audio_thread_main(&rx, &ready_tx))
            .map_err(|e| PlaybackError::OutputDevice(e.to_string()))?;

        // Fail construction if the device could not be opened.
        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(PlaybackError::OutputDevice(
                    "audio thread exited during startup".into(),
                ));
            }
        }

        tracing::info!("Audio output initialized on default device");
        Ok(Self {
            tx,
            thread: Some(thread),
        })
    }
}

impl AudioSink for RodioSink {
    fn start(
        &self,
        audio: &DecodedAudio,
        offset: Duration,
        limit: Option<Duration>,
        on_complete: CompletionCallback,
    ) -> Result<(), PlaybackError> {
        self.tx
            .send(SinkCommand::Play {
                audio: audio.clone(),
                offset,
                limit,
                on_complete,
            })
            .map_err(|_| PlaybackError::Stream("audio thread is gone".into()))
    }

    fn stop(&self) {
        // A send failure means the thread already shut down; nothing to stop.
        let _ = self.tx.send(SinkCommand::Stop);
    }
}

impl Drop for RodioSink {
    fn drop(&mut self) {
        let _ = self.tx.send(SinkCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn audio_thread_main(
    rx: &mpsc::Receiver<SinkCommand>,
    ready_tx: &mpsc::Sender<Result<(), PlaybackError>>,
) {
    let (stream, handle) = match rodio::OutputStream::try_default() {
        Ok(pair) => {
            let _ = ready_tx.send(Ok(()));
            pair
        }
        Err(e) => {
            let _ = ready_tx.send(Err(PlaybackError::OutputDevice(e.to_string())));
            return;
        }
    };
    // Stream must stay alive for as long as sinks play through it.
    let _stream = stream;

    // Active stream: the rodio sink plus its liveness flag. Stopping swaps
    // the flag to false so the watcher knows not to fire the callback.
    let mut active: Option<(Arc<rodio::Sink>, Arc<AtomicBool>)> = None;

    while let Ok(cmd) = rx.recv() {
        match cmd {
            SinkCommand::Play {
                audio,
                offset,
                limit,
                on_complete,
            } => {
                stop_active(&mut active);

                let sink = match rodio::Sink::try_new(&handle) {
                    Ok(sink) => Arc::new(sink),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to create output sink");
                        continue;
                    }
                };

                let source = SamplesBuffer::new(
                    audio.channels,
                    audio.sample_rate,
                    audio.samples.as_slice().to_vec(),
                )
                .skip_duration(offset);
                match limit {
                    Some(limit) => sink.append(source.take_duration(limit)),
                    None => sink.append(source),
                }

                let alive = Arc::new(AtomicBool::new(true));
                active = Some((Arc::clone(&sink), Arc::clone(&alive)));

                // Watcher blocks until the queue drains or stop() drops the
                // sources, which makes sleep_until_end return immediately.
                std::thread::spawn(move || {
                    sink.sleep_until_end();
                    if alive.swap(false, Ordering::SeqCst) {
                        on_complete();
                    }
                });
            }
            SinkCommand::Stop => stop_active(&mut active),
            SinkCommand::Shutdown => {
                stop_active(&mut active);
                break;
            }
        }
    }
}

fn stop_active(active: &mut Option<(Arc<rodio::Sink>, Arc<AtomicBool>)>) {
    if let Some((sink, alive)) = active.take() {
        // Order matters: clear the flag before waking the watcher.
        alive.store(false, Ordering::SeqCst);
        sink.stop();
    }
}
