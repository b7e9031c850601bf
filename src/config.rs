//! Audio output configuration
//!
//! Read-only settings consumed by the rest of the crate: the output format
//! is fixed in practice (16-bit stereo at 44.1 kHz for the SAM), while the
//! latency multiplier and speed percentage come from user options.

use crate::{AudioError, Result};

/// Default output sample rate (44.1 kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Emulated video frame rate of the SAM Coupe (50 Hz PAL)
pub const DEFAULT_FRAMES_PER_SECOND: u32 = 50;

/// Configuration for audio output and frame pacing
#[derive(Debug, Clone, Copy)]
pub struct AudioConfig {
    /// Master sound enable; when false no device is ever opened
    pub sound: bool,

    /// Output sample rate in Hz
    pub sample_rate: u32,

    /// Bits per sample (16 in practice)
    pub bits_per_sample: u16,

    /// Number of audio channels
    pub channels: u16,

    /// Latency multiplier: larger values enlarge the device buffer,
    /// trading responsiveness for underrun resistance
    pub latency: u32,

    /// Emulation speed as a percentage (100 = normal, 200 = double)
    pub speed_percent: u32,

    /// Emulated video frames per second (before the speed option)
    pub frames_per_second: u32,
}

impl AudioConfig {
    /// Create a configuration optimized for low latency (small buffer)
    pub fn low_latency(sample_rate: u32) -> Self {
        AudioConfig {
            sample_rate,
            latency: 1,
            ..Self::default()
        }
    }

    /// Create a configuration optimized for stability (large buffer)
    pub fn stable(sample_rate: u32) -> Self {
        AudioConfig {
            sample_rate,
            latency: 9,
            ..Self::default()
        }
    }

    /// Bytes per sample frame across all channels
    pub fn block_align(&self) -> usize {
        self.channels as usize * (self.bits_per_sample as usize / 8)
    }

    /// Bytes consumed by the device per second of playback
    pub fn bytes_per_second(&self) -> usize {
        self.sample_rate as usize * self.block_align()
    }

    /// Sample frames generated per emulated video frame (rounded up)
    pub fn samples_per_frame(&self) -> usize {
        (self.sample_rate / self.frames_per_second) as usize + 1
    }

    /// Size of the circular device buffer in bytes
    ///
    /// One video frame's worth of samples, scaled by the latency multiplier.
    pub fn buffer_size_bytes(&self) -> usize {
        self.samples_per_frame() * self.block_align() * (1 + self.latency as usize)
    }

    /// Device buffer latency in milliseconds
    pub fn latency_ms(&self) -> f32 {
        (self.buffer_size_bytes() as f32 / self.bytes_per_second() as f32) * 1000.0
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the sample rate, frame rate or channel count is
    /// zero, or if the bit depth is not a whole number of bytes.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(AudioError::Config("sample rate must be non-zero".into()));
        }
        if self.frames_per_second == 0 {
            return Err(AudioError::Config("frame rate must be non-zero".into()));
        }
        if self.channels == 0 {
            return Err(AudioError::Config("channel count must be non-zero".into()));
        }
        if self.bits_per_sample == 0 || self.bits_per_sample % 8 != 0 {
            return Err(AudioError::Config(format!(
                "unsupported bit depth {}",
                self.bits_per_sample
            )));
        }
        Ok(())
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        AudioConfig {
            sound: true,
            sample_rate: DEFAULT_SAMPLE_RATE,
            bits_per_sample: 16,
            channels: 2,
            latency: 3,
            speed_percent: 100,
            frames_per_second: DEFAULT_FRAMES_PER_SECOND,
        }
    }
}
