//! Circular playback buffer with sleep-polling backpressure
//!
//! The writer owns a single offset into the device's circular buffer and
//! only ever advances it forward. Free space is the circular gap between
//! the device-reported play cursor and the write offset; writing past that
//! gap would overwrite audio the device has not rendered yet. When the gap
//! is empty the writer sleeps briefly and polls again, so the emulator is
//! throttled to the device's real drain rate without any device-side
//! blocking primitive.

use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::device::DeviceBuffer;
use crate::{AudioError, Result};

/// Backoff between polls while waiting for buffer space
const WRITE_BACKOFF: Duration = Duration::from_millis(2);

/// Write statistics for monitoring buffer health
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteStats {
    /// Total bytes committed to the device buffer
    pub bytes_written: u64,
    /// Times the writer slept waiting for free space
    pub wait_count: u64,
}

/// Writer side of the circular device buffer
///
/// Created once a device buffer has been negotiated; starts looping
/// playback immediately so the play cursor begins advancing.
pub struct PlaybackBuffer<B: DeviceBuffer> {
    device: B,
    capacity: usize,
    /// Next write position, modulo `capacity`; advanced only after a commit
    write_offset: usize,
    stats: WriteStats,
}

impl<B: DeviceBuffer> PlaybackBuffer<B> {
    /// Wrap a device buffer and start looping playback
    ///
    /// # Errors
    ///
    /// Returns an error if the device reports a zero-sized buffer or
    /// refuses to start playback.
    pub fn new(mut device: B) -> Result<Self> {
        let capacity = device.capacity();
        if capacity == 0 {
            return Err(AudioError::Device("device buffer has zero capacity".into()));
        }
        device.play_looping()?;

        Ok(PlaybackBuffer {
            device,
            capacity,
            write_offset: 0,
            stats: WriteStats::default(),
        })
    }

    /// Write a frame's worth of PCM bytes, blocking until all are committed
    ///
    /// Loops until `data` is drained: each iteration samples the device
    /// cursors, clamps the write to the space behind the play cursor, fills
    /// the locked spans in order and advances the write offset. When no
    /// space is free the writer sleeps ~2ms and retries.
    ///
    /// Returns `true` once every byte has been committed. Returns `false`
    /// if a cursor query fails, in which case bytes already committed are
    /// kept and the caller should treat the device as broken for this call.
    pub fn write(&mut self, data: &[u8]) -> bool {
        let mut remaining = data;

        while !remaining.is_empty() {
            let cursors = match self.device.cursors() {
                Ok(cursors) => cursors,
                Err(err) => {
                    warn!("failed to get sound position: {err}");
                    return false;
                }
            };

            // Space available at the write offset: the circular gap up to
            // the play cursor. Writing further would clobber unplayed audio.
            let space = (self.capacity + cursors.play - self.write_offset) % self.capacity;
            let space = space.min(remaining.len());

            if space > 0 {
                match self.device.lock(self.write_offset, space) {
                    Err(err) => warn!("failed to lock sound buffer: {err}"),
                    Ok(spans) => {
                        let (first, rest) = remaining.split_at(spans.first.len());
                        let second = &rest[..spans.second.len()];

                        match self.device.commit(&spans, first, second) {
                            Err(err) => warn!("failed to commit sound buffer: {err}"),
                            Ok(()) => {
                                let written = spans.len();
                                self.write_offset = (self.write_offset + written) % self.capacity;
                                self.stats.bytes_written += written as u64;
                                remaining = &remaining[written..];
                            }
                        }
                    }
                }
            }

            if remaining.is_empty() {
                break;
            }

            // Wait for more space
            self.stats.wait_count += 1;
            thread::sleep(WRITE_BACKOFF);
        }

        true
    }

    /// Zero-fill the whole buffer and resynchronize the write offset
    ///
    /// Silencing prevents stale audio from looping when playback resumes;
    /// moving the write offset to the current play cursor makes the next
    /// write join seamlessly, without a gap or repeat. Failures are logged
    /// and otherwise ignored.
    pub fn silence(&mut self) {
        match self.device.lock(0, self.capacity) {
            Err(err) => warn!("failed to lock sound buffer for silence: {err}"),
            Ok(spans) => {
                let zeros = vec![0u8; spans.first.len()];
                if let Err(err) = self.device.commit(&spans, &zeros, &[]) {
                    warn!("failed to commit silence: {err}");
                }
            }
        }

        match self.device.cursors() {
            Ok(cursors) => self.write_offset = cursors.play,
            Err(err) => warn!("failed to get sound position after silence: {err}"),
        }
    }

    /// Total capacity of the underlying device buffer in bytes
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Byte offset where the next write will begin
    pub fn write_offset(&self) -> usize {
        self.write_offset
    }

    /// Write statistics since creation
    pub fn stats(&self) -> WriteStats {
        self.stats
    }

    /// Access the underlying device buffer
    pub fn device(&self) -> &B {
        &self.device
    }

    #[cfg(test)]
    fn set_write_offset(&mut self, offset: usize) {
        self.write_offset = offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::{CursorStep::*, MockBuffer};

    fn src_bytes(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_new_starts_playback() {
        let playback = PlaybackBuffer::new(MockBuffer::new(1000)).unwrap();
        assert!(playback.device().playing);
        assert_eq!(playback.capacity(), 1000);
        assert_eq!(playback.write_offset(), 0);
    }

    #[test]
    fn test_partial_space_splits_into_commit_then_retry() {
        // bufferSize=1000, writeOffset=900, playCursor=950: 50 bytes free,
        // so a 200-byte write must commit 50 immediately and retry for 150.
        let mock = MockBuffer::new(1000).script(&[At(950), At(100)]);
        let mut playback = PlaybackBuffer::new(mock).unwrap();
        playback.set_write_offset(900);

        let data = src_bytes(200);
        assert!(playback.write(&data));

        let device = playback.device();
        assert_eq!(device.locks, vec![(900, 50), (950, 150)]);
        assert_eq!(playback.write_offset(), 100);

        // Split-span correctness: the wrapped second write (950..1000 then
        // 0..100) must land as one conceptual contiguous write.
        assert_eq!(&device.contents()[900..950], &data[..50]);
        assert_eq!(&device.contents()[950..1000], &data[50..100]);
        assert_eq!(&device.contents()[..100], &data[100..200]);
    }

    #[test]
    fn test_write_offset_advances_modulo_capacity() {
        let mock = MockBuffer::new(1000).script(&[At(500), At(999), At(300)]);
        let mut playback = PlaybackBuffer::new(mock).unwrap();

        assert!(playback.write(&src_bytes(400)));
        assert_eq!(playback.write_offset(), 400);

        assert!(playback.write(&src_bytes(700)));
        // 1100 bytes committed in total: (0 + 1100) % 1000
        assert_eq!(playback.write_offset(), 100);
        assert_eq!(playback.stats().bytes_written, 1100);
    }

    #[test]
    fn test_lock_never_exceeds_play_cursor_gap() {
        let mock = MockBuffer::new(1000).script(&[At(500), At(900)]);
        let mut playback = PlaybackBuffer::new(mock).unwrap();

        assert!(playback.write(&src_bytes(800)));

        // First lock clamped to the 500-byte gap, second to the remainder.
        assert_eq!(playback.device().locks, vec![(0, 500), (500, 300)]);
    }

    #[test]
    fn test_zero_space_backs_off_then_retries() {
        // play == write offset means no free space until the cursor moves
        let mock = MockBuffer::new(1000).script(&[At(0), At(400)]);
        let mut playback = PlaybackBuffer::new(mock).unwrap();

        assert!(playback.write(&src_bytes(300)));
        assert_eq!(playback.device().locks, vec![(0, 300)]);
        assert!(playback.stats().wait_count >= 1);
    }

    #[test]
    fn test_cursor_failure_aborts_and_keeps_partial() {
        let mock = MockBuffer::new(1000).script(&[At(100), Fail]);
        let mut playback = PlaybackBuffer::new(mock).unwrap();

        let data = src_bytes(200);
        assert!(!playback.write(&data));

        // The 100 bytes committed before the failure stay committed.
        assert_eq!(playback.stats().bytes_written, 100);
        assert_eq!(playback.write_offset(), 100);
        assert_eq!(&playback.device().contents()[..100], &data[..100]);
    }

    #[test]
    fn test_cursor_failure_on_first_query_writes_nothing() {
        let mock = MockBuffer::new(1000).script(&[Fail]);
        let mut playback = PlaybackBuffer::new(mock).unwrap();

        assert!(!playback.write(&src_bytes(50)));
        assert!(playback.device().locks.is_empty());
        assert_eq!(playback.write_offset(), 0);
    }

    #[test]
    fn test_lock_failure_skips_iteration_and_retries() {
        let mock = MockBuffer::new(1000)
            .script(&[At(500)])
            .fail_next_locks(1);
        let mut playback = PlaybackBuffer::new(mock).unwrap();

        assert!(playback.write(&src_bytes(100)));
        assert_eq!(playback.device().lock_attempts, 2);
        assert_eq!(playback.device().locks, vec![(0, 100)]);
        assert_eq!(playback.write_offset(), 100);
    }

    #[test]
    fn test_empty_write_is_a_noop() {
        let mock = MockBuffer::new(1000).script(&[At(500)]);
        let mut playback = PlaybackBuffer::new(mock).unwrap();

        assert!(playback.write(&[]));
        assert!(playback.device().locks.is_empty());
    }

    #[test]
    fn test_silence_zero_fills_and_resyncs_offset() {
        let mock = MockBuffer::new(1000).script(&[At(600), At(123)]);
        let mut playback = PlaybackBuffer::new(mock).unwrap();

        // Leave some non-zero audio in the buffer first
        assert!(playback.write(&src_bytes(300)));
        assert_eq!(playback.write_offset(), 300);

        playback.silence();

        assert!(playback.device().contents().iter().all(|&b| b == 0));
        assert_eq!(playback.write_offset(), 123);
        // The silence lock covered the entire buffer
        assert_eq!(*playback.device().locks.last().unwrap(), (0, 1000));
    }
}
