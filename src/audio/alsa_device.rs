//! ALSA PCM device backend for audio capture and playback.

use alsa::pcm::{Access, Format, HwParams, PCM};
use alsa::{Direction, ValueOr};
use anyhow::{Context, Result};

use super::backend::{AudioBackend, CaptureStream, PlaybackStream};
use super::{CHANNELS, FRAME_SAMPLES, SAMPLE_RATE};

/// Production backend over the ALSA device layer.
pub struct AlsaBackend {
    capture_device: String,
    playback_device: String,
}

impl AlsaBackend {
    /// `capture_device`/`playback_device` are ALSA device names
    /// (e.g. "default", "plughw:0,0").
    pub fn new(capture_device: &str, playback_device: &str) -> Self {
        Self {
            capture_device: capture_device.to_string(),
            playback_device: playback_device.to_string(),
        }
    }
}

impl AudioBackend for AlsaBackend {
    fn open_capture(&self) -> Result<Box<dyn CaptureStream>> {
        let pcm = open_pcm(
            &self.capture_device,
            Direction::Capture,
            Some(FRAME_SAMPLES),
            "Capture",
        )?;
        Ok(Box::new(AlsaCapture { pcm }))
    }

    fn open_playback(&self) -> Result<Box<dyn PlaybackStream>> {
        let pcm = open_pcm(&self.playback_device, Direction::Playback, None, "Playback")?;
        Ok(Box::new(AlsaPlayback { pcm }))
    }
}

struct AlsaCapture {
    pcm: PCM,
}

impl CaptureStream for AlsaCapture {
    fn read(&mut self, buf: &mut [i16]) -> Result<usize> {
        let io = self.pcm.io_i16()?;
        let frames = io.readi(buf)?;
        Ok(frames)
    }

    fn recover(&mut self) -> Result<()> {
        self.pcm.prepare().context("Failed to recover PCM capture")
    }
}

struct AlsaPlayback {
    pcm: PCM,
}

impl PlaybackStream for AlsaPlayback {
    fn write(&mut self, samples: &[i16]) -> Result<()> {
        let io = self.pcm.io_i16()?;
        // writei can accept fewer frames than offered; loop until the
        // device has taken everything. An underrun between frames puts the
        // stream into the ALSA recovery state machine; recovery attempts
        // are bounded so a device that persistently cannot keep up errors
        // out instead of looping forever.
        let mut written = 0;
        let mut retries = 0u32;
        while written < samples.len() {
            match io.writei(&samples[written..]) {
                Ok(n) => {
                    written += n;
                    retries = 0;
                }
                Err(e) => {
                    log::warn!("ALSA playback error: {}, recovering...", e);
                    retries += 1;
                    self.pcm
                        .prepare()
                        .context("Failed to recover PCM playback")?;
                    if retries >= 3 {
                        return Err(e).context("PCM playback did not recover");
                    }
                }
            }
        }
        Ok(())
    }

    fn discard(&mut self) -> Result<()> {
        // snd_pcm_drop: stop now and throw away pending frames.
        self.pcm.drop().context("Failed to abort PCM playback")
    }
}

fn open_pcm(
    device: &str,
    direction: Direction,
    period_size: Option<usize>,
    dir_name: &str,
) -> Result<PCM> {
    let pcm = PCM::new(device, direction, false)
        .with_context(|| format!("Failed to open PCM device '{}' for {}", device, dir_name))?;

    {
        let hwp = HwParams::any(&pcm).context("Failed to initialize HwParams")?;
        hwp.set_access(Access::RWInterleaved)?;
        hwp.set_format(Format::S16LE)?;
        hwp.set_channels(CHANNELS)?;
        hwp.set_rate_near(SAMPLE_RATE, ValueOr::Nearest)?;
        if let Some(ps) = period_size {
            hwp.set_period_size_near(ps as alsa::pcm::Frames, ValueOr::Nearest)?;
        }
        pcm.hw_params(&hwp)?;
    }

    // Read back actual negotiated parameters
    let (rate, period) = {
        let hwp = pcm.hw_params_current()?;
        (hwp.get_rate()?, hwp.get_period_size()? as usize)
    };

    log::info!(
        "ALSA {}: device={}, rate={}, period_size={}",
        dir_name,
        device,
        rate,
        period,
    );

    Ok(pcm)
}
