//! Top-level audio session orchestration
//!
//! Composes the playback buffer and the frame pacer behind the four
//! operations the emulator's per-frame loop calls: `init`, `exit`,
//! `add_data` and `silence`. Device initialisation failure is never fatal;
//! the session simply runs in timer-paced mode until the next `init`.

use tracing::{debug, warn};

use crate::config::AudioConfig;
use crate::device::DeviceBuffer;
use crate::pacer::FramePacer;
use crate::playback::{PlaybackBuffer, WriteStats};
use crate::Result;

/// Audio output session for the emulator's per-frame loop
///
/// Holds at most one device-backed playback buffer; while none is active,
/// [`add_data`](AudioOutput::add_data) serves timing through the frame
/// pacer instead of consuming audio.
pub struct AudioOutput {
    config: AudioConfig,
    playback: Option<PlaybackBuffer<Box<dyn DeviceBuffer>>>,
    pacer: FramePacer,
}

impl AudioOutput {
    /// Create a session in timer-paced mode; call [`init`](Self::init) to
    /// acquire a device.
    pub fn new(config: AudioConfig) -> Self {
        AudioOutput {
            config,
            playback: None,
            pacer: FramePacer::new(),
        }
    }

    /// (Re)initialise the session, attempting device acquisition
    ///
    /// Tears down any previous session first. If sound is disabled or the
    /// device cannot be created, the session stays in timer-paced mode.
    /// Initialisation failure is never fatal, so this always returns true.
    pub fn init(&mut self, first_init: bool) -> bool {
        self.exit(true);
        debug!(first_init, "audio init");

        if !self.config.sound {
            debug!("sound disabled, nothing to initialise");
        } else if let Err(err) = self.open_device() {
            warn!("audio device initialisation failed: {err}");
        }

        true
    }

    /// Release the device buffer and stop the pacer timer; idempotent
    pub fn exit(&mut self, reinit: bool) {
        debug!(reinit, "audio exit");
        self.playback = None;
        self.pacer.shutdown();
    }

    /// Install a caller-supplied device buffer and start playback
    ///
    /// Replaces any active device. Useful for custom backends and for
    /// headless operation.
    pub fn attach(&mut self, device: Box<dyn DeviceBuffer>) -> Result<()> {
        let playback = PlaybackBuffer::new(device)?;
        debug!(capacity = playback.capacity(), "audio device attached");
        self.playback = Some(playback);
        Ok(())
    }

    /// Feed one frame of PCM bytes, or serve timing when no device is active
    ///
    /// With a device active this delegates to the playback buffer and
    /// mirrors its guarantee: true means every byte was committed, false
    /// means the device failed mid-call and should be treated as broken.
    /// Without a device it blocks until the next frame is due and returns
    /// false, signalling that no audio was consumed.
    pub fn add_data(&mut self, data: &[u8]) -> bool {
        match self.playback.as_mut() {
            Some(playback) => playback.write(data),
            None => {
                self.pacer
                    .wait_for_next_frame(self.config.frames_per_second, self.config.speed_percent);
                false
            }
        }
    }

    /// Silence the device buffer; no-op when no device is active
    pub fn silence(&mut self) {
        if let Some(playback) = self.playback.as_mut() {
            playback.silence();
        }
    }

    /// True while a device-backed playback buffer is active
    pub fn is_active(&self) -> bool {
        self.playback.is_some()
    }

    /// Write statistics of the active playback buffer, if any
    pub fn stats(&self) -> Option<WriteStats> {
        self.playback.as_ref().map(|playback| playback.stats())
    }

    /// The configuration this session was created with
    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Mutable access to the configuration
    ///
    /// Option changes (speed, latency) are picked up by the pacer on the
    /// next frame; device-format changes need an [`init`](Self::init) to
    /// take effect.
    pub fn config_mut(&mut self) -> &mut AudioConfig {
        &mut self.config
    }

    fn open_device(&mut self) -> Result<()> {
        self.config.validate()?;

        #[cfg(feature = "streaming")]
        {
            let device = crate::device::rodio::RodioBuffer::open(&self.config)?;
            self.attach(Box::new(device))
        }

        #[cfg(not(feature = "streaming"))]
        {
            Err(crate::AudioError::Device(
                "no audio backend compiled in".into(),
            ))
        }
    }
}
