//! Narrow seam over the host audio layer.
//!
//! The bridge only needs four device operations; keeping them behind
//! traits lets the lifecycle logic run against a scripted backend in
//! tests. The one production implementation is ALSA.

use anyhow::Result;

/// Opens capture and playback streams in the fixed session format
/// (mono, S16LE, 16 kHz).
pub trait AudioBackend: Send + Sync {
    fn open_capture(&self) -> Result<Box<dyn CaptureStream>>;
    fn open_playback(&self) -> Result<Box<dyn PlaybackStream>>;
}

/// A running capture stream delivering 16-bit samples.
pub trait CaptureStream: Send {
    /// Blocking read of up to one period into `buf`; returns the number
    /// of samples read.
    fn read(&mut self, buf: &mut [i16]) -> Result<usize>;

    /// Bring the stream back after an overrun.
    fn recover(&mut self) -> Result<()>;
}

/// An open playback stream accepting 16-bit samples. Dropping the stream
/// closes the device.
pub trait PlaybackStream: Send {
    /// Blocking write of all of `samples`; returns once the device has
    /// accepted them.
    fn write(&mut self, samples: &[i16]) -> Result<()>;

    /// Stop immediately, discarding buffered-but-unplayed samples.
    fn discard(&mut self) -> Result<()>;
}
