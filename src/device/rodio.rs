//! rodio-backed device buffer
//!
//! Implements the [`DeviceBuffer`] contract over a looping byte ring
//! consumed by a rodio [`Source`]. The source decodes little-endian 16-bit
//! samples on demand and advances an atomic play cursor as it goes, so the
//! cursor reflects exactly how far the output stream has rendered. The
//! ring loops forever like a hardware secondary buffer: the writer is
//! expected to stay ahead of the play cursor, overwriting already-played
//! bytes.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rodio::{OutputStream, Sink, Source};

use crate::config::AudioConfig;
use crate::{AudioError, Result};

use super::{Cursors, DeviceBuffer, SpanPair};

/// Byte ring shared between the writer and the playback source
struct DeviceRing {
    data: Mutex<Vec<u8>>,
    /// Play cursor in bytes, modulo the ring capacity
    play_pos: AtomicUsize,
    /// Raised on drop so the source terminates instead of looping silence
    stopped: AtomicBool,
}

/// Audio source that loops over the ring, decoding i16 LE samples
///
/// Samples are read one at a time rather than in batches so the play
/// cursor tracks the stream position sample-accurately.
struct RingSource {
    ring: Arc<DeviceRing>,
    sample_rate: u32,
    channels: u16,
}

impl Iterator for RingSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.ring.stopped.load(Ordering::Relaxed) {
            return None;
        }

        let data = self.ring.data.lock();
        let capacity = data.len();
        let pos = self.ring.play_pos.load(Ordering::Acquire);
        let lo = data[pos];
        let hi = data[(pos + 1) % capacity];
        drop(data);

        self.ring
            .play_pos
            .store((pos + 2) % capacity, Ordering::Release);

        let sample = i16::from_le_bytes([lo, hi]);
        Some(sample as f32 / 32768.0)
    }
}

impl Source for RingSource {
    fn current_frame_len(&self) -> Option<usize> {
        // The ring plays indefinitely
        None
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

/// Circular device buffer played through the default rodio output
pub struct RodioBuffer {
    ring: Arc<DeviceRing>,
    _stream: OutputStream,
    sink: Sink,
    capacity: usize,
    /// Reported write cursor leads the play cursor by this safety margin
    write_margin: usize,
    sample_rate: u32,
    channels: u16,
    locked: Option<SpanPair>,
    playing: bool,
}

impl RodioBuffer {
    /// Open the default output device and size the ring from the config
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the bit depth is
    /// not 16 (the only format this backend decodes), or no output device
    /// is available.
    pub fn open(config: &AudioConfig) -> Result<Self> {
        config.validate()?;
        if config.bits_per_sample != 16 {
            return Err(AudioError::Device(format!(
                "rodio backend only supports 16-bit samples, got {}",
                config.bits_per_sample
            )));
        }

        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| AudioError::Device(format!("failed to create audio stream: {e}")))?;
        let sink = Sink::try_new(&stream_handle)
            .map_err(|e| AudioError::Device(format!("failed to create audio sink: {e}")))?;

        let capacity = config.buffer_size_bytes();
        let ring = Arc::new(DeviceRing {
            data: Mutex::new(vec![0u8; capacity]),
            play_pos: AtomicUsize::new(0),
            stopped: AtomicBool::new(false),
        });

        // ~10ms of audio, at least one sample block
        let write_margin = (config.bytes_per_second() / 100).max(config.block_align());

        Ok(RodioBuffer {
            ring,
            _stream: stream,
            sink,
            capacity,
            write_margin,
            sample_rate: config.sample_rate,
            channels: config.channels,
            locked: None,
            playing: false,
        })
    }
}

impl DeviceBuffer for RodioBuffer {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn play_looping(&mut self) -> Result<()> {
        if !self.playing {
            self.sink.append(RingSource {
                ring: Arc::clone(&self.ring),
                sample_rate: self.sample_rate,
                channels: self.channels,
            });
            self.sink.play();
            self.playing = true;
        }
        Ok(())
    }

    fn cursors(&mut self) -> Result<Cursors> {
        if self.ring.stopped.load(Ordering::Relaxed) {
            return Err(AudioError::CursorQuery("device stopped".into()));
        }
        let play = self.ring.play_pos.load(Ordering::Acquire);
        Ok(Cursors {
            play,
            write: (play + self.write_margin) % self.capacity,
        })
    }

    fn lock(&mut self, offset: usize, len: usize) -> Result<SpanPair> {
        if self.locked.is_some() {
            return Err(AudioError::Lock("buffer region already locked".into()));
        }
        if offset >= self.capacity || len > self.capacity {
            return Err(AudioError::Lock(format!(
                "lock of {len} bytes at {offset} outside buffer of {}",
                self.capacity
            )));
        }
        let spans = SpanPair::split(offset, len, self.capacity);
        self.locked = Some(spans.clone());
        Ok(spans)
    }

    fn commit(&mut self, spans: &SpanPair, first: &[u8], second: &[u8]) -> Result<()> {
        match self.locked.take() {
            Some(locked) if &locked == spans => {}
            Some(locked) => {
                self.locked = Some(locked);
                return Err(AudioError::Commit("commit does not match lock".into()));
            }
            None => return Err(AudioError::Commit("commit without a lock".into())),
        }
        if first.len() != spans.first.len() || second.len() != spans.second.len() {
            return Err(AudioError::Commit("span length mismatch".into()));
        }

        let mut data = self.ring.data.lock();
        data[spans.first.clone()].copy_from_slice(first);
        data[spans.second.clone()].copy_from_slice(second);
        Ok(())
    }
}

impl Drop for RodioBuffer {
    fn drop(&mut self) {
        self.ring.stopped.store(true, Ordering::Relaxed);
        self.sink.stop();
    }
}
