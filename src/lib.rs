//! Audio output and frame pacing for SAM Coupe emulation
//!
//! Feeds emulated PCM data into a host audio device through a fixed-size
//! circular buffer, throttling the emulator to the device's real drain rate.
//! When no audio device is available, a periodic frame timer takes over so
//! the emulator still advances at the correct real-time speed.
//!
//! # Features
//! - Wrap-safe circular writes against a device-reported play cursor
//! - Backpressure by bounded sleep-polling (no device-side blocking needed)
//! - Timer-based frame pacing fallback honouring the speed option
//! - Pluggable device backends via the [`DeviceBuffer`] trait
//!
//! # Crate feature flags
//! - `streaming` (default): rodio-backed device buffer (`device::rodio`)
//!
//! # Quick start
//! ```no_run
//! use coupe_audio::{AudioConfig, AudioOutput};
//!
//! let mut audio = AudioOutput::new(AudioConfig::default());
//! audio.init(true);
//!
//! // per emulated frame:
//! let frame_samples = vec![0u8; 3532];
//! if !audio.add_data(&frame_samples) {
//!     // no audio consumed; the frame timer has already paced us
//! }
//! ```
//!
//! ## Custom backend
//! ```no_run
//! # struct MyBackend;
//! # impl coupe_audio::DeviceBuffer for MyBackend {
//! #     fn capacity(&self) -> usize { 0 }
//! #     fn play_looping(&mut self) -> coupe_audio::Result<()> { Ok(()) }
//! #     fn cursors(&mut self) -> coupe_audio::Result<coupe_audio::Cursors> { unimplemented!() }
//! #     fn lock(&mut self, _: usize, _: usize) -> coupe_audio::Result<coupe_audio::SpanPair> { unimplemented!() }
//! #     fn commit(&mut self, _: &coupe_audio::SpanPair, _: &[u8], _: &[u8]) -> coupe_audio::Result<()> { unimplemented!() }
//! # }
//! use coupe_audio::{AudioConfig, AudioOutput};
//!
//! let mut audio = AudioOutput::new(AudioConfig::default());
//! audio.attach(Box::new(MyBackend)).unwrap();
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod device;
pub mod output;
pub mod pacer;
pub mod playback;

/// Error types for audio output operations
#[derive(thiserror::Error, Debug)]
pub enum AudioError {
    /// Audio device unavailable or creation failed
    #[error("Audio device error: {0}")]
    Device(String),

    /// Play/write cursor query failed
    #[error("Cursor query failed: {0}")]
    CursorQuery(String),

    /// Locking a buffer region failed
    #[error("Buffer lock failed: {0}")]
    Lock(String),

    /// Committing a locked region failed
    #[error("Buffer commit failed: {0}")]
    Commit(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for AudioError {
    /// Converts a String into `AudioError::Other`.
    ///
    /// Convenience for generic string errors; prefer the specific variant
    /// constructors when the failure category is known.
    fn from(msg: String) -> Self {
        AudioError::Other(msg)
    }
}

impl From<&str> for AudioError {
    /// Converts a string slice into `AudioError::Other`.
    fn from(msg: &str) -> Self {
        AudioError::Other(msg.to_string())
    }
}

/// Result type for audio output operations
pub type Result<T> = std::result::Result<T, AudioError>;

// Public API exports
pub use config::AudioConfig;
#[cfg(feature = "streaming")]
pub use device::rodio::RodioBuffer;
pub use device::{Cursors, DeviceBuffer, SpanPair};
pub use output::AudioOutput;
pub use pacer::{tick_interval_ms, FramePacer};
pub use playback::{PlaybackBuffer, WriteStats};
