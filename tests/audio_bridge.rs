//! End-to-end audio bridge scenario against a scripted device backend:
//! capture delivery, playback stream reuse, barge-in, and teardown, with
//! no audio hardware involved.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use bytes::Bytes;
use parking_lot::Mutex;

use convai_linux_rs::audio::{
    AudioBackend, AudioInterface, CaptureStream, DeviceAudio, PlaybackStream,
};

/// Everything the scripted device layer observed.
#[derive(Default)]
struct DeviceLog {
    playback_opens: usize,
    writes: Vec<usize>,
    discards: usize,
    capture_open: bool,
    playback_open: bool,
}

struct ScriptedBackend {
    log: Arc<Mutex<DeviceLog>>,
    capture_frames: Arc<Mutex<VecDeque<Vec<i16>>>>,
}

impl ScriptedBackend {
    fn new(capture_frames: Vec<Vec<i16>>) -> Self {
        Self {
            log: Arc::new(Mutex::new(DeviceLog::default())),
            capture_frames: Arc::new(Mutex::new(capture_frames.into())),
        }
    }
}

impl AudioBackend for ScriptedBackend {
    fn open_capture(&self) -> Result<Box<dyn CaptureStream>> {
        self.log.lock().capture_open = true;
        Ok(Box::new(ScriptedCapture {
            log: self.log.clone(),
            frames: self.capture_frames.clone(),
        }))
    }

    fn open_playback(&self) -> Result<Box<dyn PlaybackStream>> {
        let mut log = self.log.lock();
        log.playback_opens += 1;
        log.playback_open = true;
        Ok(Box::new(ScriptedPlayback {
            log: self.log.clone(),
        }))
    }
}

struct ScriptedCapture {
    log: Arc<Mutex<DeviceLog>>,
    frames: Arc<Mutex<VecDeque<Vec<i16>>>>,
}

impl CaptureStream for ScriptedCapture {
    fn read(&mut self, buf: &mut [i16]) -> Result<usize> {
        thread::sleep(Duration::from_millis(2));
        match self.frames.lock().pop_front() {
            Some(frame) => {
                buf[..frame.len()].copy_from_slice(&frame);
                Ok(frame.len())
            }
            None => Ok(0),
        }
    }

    fn recover(&mut self) -> Result<()> {
        Ok(())
    }
}

impl Drop for ScriptedCapture {
    fn drop(&mut self) {
        self.log.lock().capture_open = false;
    }
}

struct ScriptedPlayback {
    log: Arc<Mutex<DeviceLog>>,
}

impl PlaybackStream for ScriptedPlayback {
    fn write(&mut self, samples: &[i16]) -> Result<()> {
        self.log.lock().writes.push(samples.len());
        Ok(())
    }

    fn discard(&mut self) -> Result<()> {
        self.log.lock().discards += 1;
        Ok(())
    }
}

impl Drop for ScriptedPlayback {
    fn drop(&mut self) {
        self.log.lock().playback_open = false;
    }
}

fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn full_session_lifecycle() {
    // The driver will deliver one 2000-sample frame of 0x0201.
    let backend = ScriptedBackend::new(vec![vec![0x0201i16; 2000]]);
    let log = backend.log.clone();
    let bridge = DeviceAudio::new(Box::new(backend));

    // start(sink): the scripted frame reaches the sink exactly once, as
    // the raw little-endian bytes the driver produced.
    let received: Arc<Mutex<Vec<Bytes>>> = Arc::new(Mutex::new(Vec::new()));
    let sink_frames = received.clone();
    bridge
        .start(Box::new(move |frame| sink_frames.lock().push(frame)))
        .unwrap();
    assert!(bridge.is_running());

    assert!(wait_for(|| !received.lock().is_empty()));
    thread::sleep(Duration::from_millis(20));
    {
        let frames = received.lock();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref(), [0x01u8, 0x02].repeat(2000).as_slice());
    }

    // Two outputs share one lazily opened playback stream.
    bridge.output(&[0u8; 8000]).unwrap();
    bridge.output(&[0u8; 8000]).unwrap();
    {
        let log = log.lock();
        assert_eq!(log.playback_opens, 1);
        assert_eq!(log.writes, vec![4000, 4000]);
        assert!(log.playback_open);
    }

    // Barge-in: buffered audio is discarded and the stream is closed.
    bridge.interrupt().unwrap();
    {
        let log = log.lock();
        assert_eq!(log.discards, 1);
        assert!(!log.playback_open);
    }

    // The next output opens a fresh stream instead of reusing the old one.
    bridge.output(&[0xffu8; 8000]).unwrap();
    {
        let log = log.lock();
        assert_eq!(log.playback_opens, 2);
        assert_eq!(log.writes.len(), 3);
    }

    // stop(): both paths closed, capture gone, bridge finished.
    bridge.stop();
    {
        let log = log.lock();
        assert!(!log.capture_open);
        assert!(!log.playback_open);
    }
    assert!(!bridge.is_running());
}
