//! audio - PCM capture and playback for the conversational session.
//!
//! The duplex transport the remote session drives: microphone frames are
//! captured on a dedicated thread and pushed into a frame sink, synthesized
//! speech is written synchronously to the speaker, and an interrupt cuts
//! in-progress playback for barge-in. Uses ALSA for device I/O; audio is
//! raw PCM end to end.

mod alsa_device;
mod backend;
mod device;

pub use alsa_device::AlsaBackend;
pub use backend::{AudioBackend, CaptureStream, PlaybackStream};
pub use device::DeviceAudio;

use anyhow::Result;
use bytes::Bytes;

/// Session sample rate in Hz.
pub const SAMPLE_RATE: u32 = 16_000;
/// Mono audio on both paths.
pub const CHANNELS: u32 = 1;
/// Samples per capture frame (~250 ms at 16 kHz).
pub const FRAME_SAMPLES: usize = 4000;

/// Receives each captured audio frame as raw little-endian 16-bit PCM.
/// Invoked on the bridge's dispatch thread.
pub type FrameSink = Box<dyn Fn(Bytes) + Send + Sync>;

/// Duplex audio transport contract required by the conversational session.
///
/// One production implementation exists ([`DeviceAudio`]); an instance is
/// single-use — once stopped it cannot be started again.
pub trait AudioInterface: Send + Sync {
    /// Begin microphone capture. `sink` is invoked with every non-empty
    /// captured frame until [`stop`](AudioInterface::stop).
    fn start(&self, sink: FrameSink) -> Result<()>;

    /// End capture and playback and release the devices. Idempotent and
    /// terminal.
    fn stop(&self);

    /// Play one PCM frame. Opens the playback stream on first use, reuses
    /// it afterwards, and blocks until the device has accepted the samples.
    fn output(&self, frame: &[u8]) -> Result<()>;

    /// Abort in-progress playback, discarding buffered-but-unplayed audio.
    /// No-op when nothing is playing.
    fn interrupt(&self) -> Result<()>;
}

/// Interpret raw little-endian bytes as interleaved 16-bit samples.
/// A trailing odd byte does not form a sample and is ignored.
pub(crate) fn bytes_to_samples(frame: &[u8]) -> Vec<i16> {
    frame
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect()
}

pub(crate) fn samples_to_bytes(samples: &[i16]) -> Bytes {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }
    Bytes::from(out)
}
