//! Device buffer contract
//!
//! Abstraction over the host audio backend: a fixed-size circular buffer
//! that the device drains continuously while reporting how far playback has
//! progressed. The writer never blocks on the device; it samples the play
//! cursor and stays behind it.
//!
//! Locking uses the classic two-phase protocol: [`DeviceBuffer::lock`]
//! describes the requested region as at most two contiguous spans (the
//! second is only non-empty when the region wraps past the end of the
//! buffer), and [`DeviceBuffer::commit`] copies the caller's bytes into
//! those spans and releases the lock.

use std::ops::Range;

use crate::Result;

#[cfg(feature = "streaming")]
pub mod rodio;

#[cfg(test)]
pub(crate) mod mock;

/// Snapshot of the device-reported cursor positions, in bytes
///
/// The play cursor marks how far the device has actually rendered audio;
/// the write cursor is the device's safety margin ahead of it, before which
/// it guarantees not to read next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursors {
    /// Byte offset up to which audio has been rendered
    pub play: usize,
    /// Byte offset before which the device will not read next
    pub write: usize,
}

/// A locked circular-buffer region, split into at most two contiguous spans
///
/// `second` is empty unless the locked range wraps past the end of the
/// physical buffer back to its start. Spans are always filled in order,
/// first span first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanPair {
    /// Contiguous span starting at the locked offset
    pub first: Range<usize>,
    /// Wrapped span at the start of the buffer (usually empty)
    pub second: Range<usize>,
}

impl SpanPair {
    /// Split a circular region of `len` bytes starting at `offset` into its
    /// contiguous spans within a buffer of `capacity` bytes.
    pub fn split(offset: usize, len: usize, capacity: usize) -> Self {
        debug_assert!(offset < capacity);
        debug_assert!(len <= capacity);
        let end = offset + len;
        if end <= capacity {
            SpanPair {
                first: offset..end,
                second: 0..0,
            }
        } else {
            SpanPair {
                first: offset..capacity,
                second: 0..end - capacity,
            }
        }
    }

    /// Total number of bytes covered by both spans
    pub fn len(&self) -> usize {
        self.first.len() + self.second.len()
    }

    /// True if the pair covers no bytes
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Contract required of a host audio backend
///
/// Implementors own a circular buffer of `capacity()` bytes which the
/// device consumes continuously in a loop once [`play_looping`] has been
/// called. All offsets are byte offsets modulo the capacity.
///
/// [`play_looping`]: DeviceBuffer::play_looping
pub trait DeviceBuffer {
    /// Total capacity of the circular buffer in bytes
    fn capacity(&self) -> usize;

    /// Start continuous looping playback of the buffer contents
    fn play_looping(&mut self) -> Result<()>;

    /// Query the current play/write cursor positions
    fn cursors(&mut self) -> Result<Cursors>;

    /// Lock `len` bytes starting at `offset`, wrapping past the buffer end
    ///
    /// Returns the locked region split into its contiguous spans. The lock
    /// is held until the matching [`commit`](DeviceBuffer::commit).
    fn lock(&mut self, offset: usize, len: usize) -> Result<SpanPair>;

    /// Copy `first`/`second` into the locked spans and release the lock
    ///
    /// The slices must match the span lengths exactly.
    fn commit(&mut self, spans: &SpanPair, first: &[u8], second: &[u8]) -> Result<()>;
}

impl<B: DeviceBuffer + ?Sized> DeviceBuffer for Box<B> {
    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    fn play_looping(&mut self) -> Result<()> {
        (**self).play_looping()
    }

    fn cursors(&mut self) -> Result<Cursors> {
        (**self).cursors()
    }

    fn lock(&mut self, offset: usize, len: usize) -> Result<SpanPair> {
        (**self).lock(offset, len)
    }

    fn commit(&mut self, spans: &SpanPair, first: &[u8], second: &[u8]) -> Result<()> {
        (**self).commit(spans, first, second)
    }
}
