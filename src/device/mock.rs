//! Scripted in-memory device buffer for tests
//!
//! Cursor positions are driven by a script rather than a real clock, so
//! write-loop behavior (clamping, wrapping, retries, failures) can be
//! asserted deterministically.

use std::collections::VecDeque;

use crate::{AudioError, Result};

use super::{Cursors, DeviceBuffer, SpanPair};

/// One scripted response to a cursor query
#[derive(Debug, Clone, Copy)]
pub(crate) enum CursorStep {
    /// Report the play cursor at this byte offset
    At(usize),
    /// Fail the query
    Fail,
}

pub(crate) struct MockBuffer {
    data: Vec<u8>,
    script: VecDeque<CursorStep>,
    last: CursorStep,
    locked: Option<SpanPair>,
    fail_locks: usize,
    pub(crate) playing: bool,
    /// (offset, len) of every successful lock, in order
    pub(crate) locks: Vec<(usize, usize)>,
    pub(crate) lock_attempts: usize,
}

impl MockBuffer {
    pub(crate) fn new(capacity: usize) -> Self {
        MockBuffer {
            data: vec![0xAA; capacity],
            script: VecDeque::new(),
            last: CursorStep::At(0),
            locked: None,
            fail_locks: 0,
            playing: false,
            locks: Vec::new(),
            lock_attempts: 0,
        }
    }

    /// Queue scripted cursor responses; the final step repeats once the
    /// script is exhausted.
    pub(crate) fn script(mut self, steps: &[CursorStep]) -> Self {
        self.script.extend(steps.iter().copied());
        self
    }

    /// Fail the next `n` lock calls
    pub(crate) fn fail_next_locks(mut self, n: usize) -> Self {
        self.fail_locks = n;
        self
    }

    pub(crate) fn contents(&self) -> &[u8] {
        &self.data
    }
}

impl DeviceBuffer for MockBuffer {
    fn capacity(&self) -> usize {
        self.data.len()
    }

    fn play_looping(&mut self) -> Result<()> {
        self.playing = true;
        Ok(())
    }

    fn cursors(&mut self) -> Result<Cursors> {
        let step = self.script.pop_front().unwrap_or(self.last);
        self.last = step;
        match step {
            CursorStep::At(play) => Ok(Cursors { play, write: play }),
            CursorStep::Fail => Err(AudioError::CursorQuery("scripted failure".into())),
        }
    }

    fn lock(&mut self, offset: usize, len: usize) -> Result<SpanPair> {
        self.lock_attempts += 1;
        if self.fail_locks > 0 {
            self.fail_locks -= 1;
            return Err(AudioError::Lock("scripted failure".into()));
        }
        assert!(self.locked.is_none(), "lock while already locked");
        assert!(offset < self.data.len() && len <= self.data.len());
        let spans = SpanPair::split(offset, len, self.data.len());
        self.locked = Some(spans.clone());
        self.locks.push((offset, len));
        Ok(spans)
    }

    fn commit(&mut self, spans: &SpanPair, first: &[u8], second: &[u8]) -> Result<()> {
        let locked = self.locked.take().expect("commit without lock");
        assert_eq!(&locked, spans, "commit does not match lock");
        assert_eq!(first.len(), spans.first.len());
        assert_eq!(second.len(), spans.second.len());
        self.data[spans.first.clone()].copy_from_slice(first);
        self.data[spans.second.clone()].copy_from_slice(second);
        Ok(())
    }
}
