//! The production audio bridge.
//!
//! Capture runs in dedicated OS threads (NOT tokio tasks) to keep
//! real-time device I/O away from the async network side: a producer
//! thread reads one period at a time from the device and feeds a bounded
//! channel, and a dispatch thread drains it into the frame sink, checking
//! the running flag before every delivery. Playback is a lazily opened
//! stream written synchronously from whichever thread calls `output`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result, bail};
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::backend::{AudioBackend, PlaybackStream};
use super::{AudioInterface, FRAME_SAMPLES, FrameSink, bytes_to_samples, samples_to_bytes};

/// In-flight capture frames between the producer and dispatch threads.
const FRAME_QUEUE_DEPTH: usize = 8;

/// The audio bridge over a host device backend.
///
/// Owns at most one capture session (producer + dispatch threads) and at
/// most one playback stream. `stop` tears both down and is terminal: a
/// stopped bridge cannot be restarted, construct a new one instead.
pub struct DeviceAudio {
    backend: Box<dyn AudioBackend>,
    running: Arc<AtomicBool>,
    started: AtomicBool,
    torn_down: AtomicBool,
    workers: Mutex<Vec<JoinHandle<()>>>,
    playback: Mutex<Option<Box<dyn PlaybackStream>>>,
}

impl DeviceAudio {
    pub fn new(backend: Box<dyn AudioBackend>) -> Self {
        Self {
            backend,
            running: Arc::new(AtomicBool::new(false)),
            started: AtomicBool::new(false),
            torn_down: AtomicBool::new(false),
            workers: Mutex::new(Vec::new()),
            playback: Mutex::new(None),
        }
    }

    /// Whether capture is active: false before `start` and after `stop`.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl AudioInterface for DeviceAudio {
    fn start(&self, sink: FrameSink) -> Result<()> {
        if self.torn_down.load(Ordering::SeqCst) {
            bail!("audio bridge is stopped and cannot be restarted");
        }
        if self.started.swap(true, Ordering::SeqCst) {
            bail!("audio bridge is already started");
        }

        // Open here, not in the thread, so acquisition failures reach the
        // caller.
        let mut capture = self
            .backend
            .open_capture()
            .context("Failed to open capture stream")?;

        let (frame_tx, mut frame_rx) = mpsc::channel::<Bytes>(FRAME_QUEUE_DEPTH);
        self.running.store(true, Ordering::SeqCst);

        let capture_handle = {
            let running = self.running.clone();
            thread::Builder::new()
                .name("audio-capture".into())
                .spawn(move || {
                    let mut read_buf = vec![0i16; FRAME_SAMPLES];
                    while running.load(Ordering::Relaxed) {
                        match capture.read(&mut read_buf) {
                            Ok(0) => continue,
                            Ok(n) => {
                                let frame = samples_to_bytes(&read_buf[..n]);
                                if frame_tx.blocking_send(frame).is_err() {
                                    log::warn!("Frame dispatcher gone, capture exiting");
                                    break;
                                }
                            }
                            Err(e) => {
                                log::warn!("Capture error: {}, recovering...", e);
                                if let Err(e2) = capture.recover() {
                                    log::error!("Failed to recover capture stream: {}", e2);
                                    break;
                                }
                            }
                        }
                    }
                    // Dropping the stream closes the device; dropping the
                    // sender unblocks the dispatcher.
                    log::info!("Capture stopped");
                })?
        };

        let dispatch_handle = {
            let running = self.running.clone();
            thread::Builder::new()
                .name("audio-dispatch".into())
                .spawn(move || {
                    while let Some(frame) = frame_rx.blocking_recv() {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        if frame.is_empty() {
                            continue;
                        }
                        sink(frame);
                    }
                })?
        };

        let mut workers = self.workers.lock();
        workers.push(capture_handle);
        workers.push(dispatch_handle);

        log::info!("Audio bridge started");
        Ok(())
    }

    fn stop(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.running.store(false, Ordering::SeqCst);

        // Join the audio threads: teardown is synchronous at the driver
        // level, so once this returns no frame can reach the sink. The
        // capture thread notices the flag within one device period and the
        // dispatcher exits when the producer drops its sender.
        let workers = std::mem::take(&mut *self.workers.lock());
        for handle in workers {
            let _ = handle.join();
        }

        if self.playback.lock().take().is_some() {
            log::info!("Playback stream closed");
        }
        log::info!("Audio bridge stopped");
    }

    fn output(&self, frame: &[u8]) -> Result<()> {
        if self.torn_down.load(Ordering::SeqCst) {
            bail!("audio bridge is stopped, playback device released");
        }

        let mut playback = self.playback.lock();
        // Reuse the open stream when there is one, open lazily otherwise.
        let opened = match playback.take() {
            Some(stream) => stream,
            None => self
                .backend
                .open_playback()
                .context("Failed to open playback stream")?,
        };
        let stream = playback.insert(opened);

        if let Err(e) = stream.write(&bytes_to_samples(frame)) {
            // A failed write ends this playback session; the next output
            // opens a fresh stream.
            *playback = None;
            return Err(e);
        }
        Ok(())
    }

    fn interrupt(&self) -> Result<()> {
        let mut playback = self.playback.lock();
        if let Some(mut stream) = playback.take() {
            stream.discard().context("Failed to abort playback")?;
            log::info!("Playback interrupted");
        }
        Ok(())
    }
}

impl Drop for DeviceAudio {
    fn drop(&mut self) {
        self.stop();
    }
}
