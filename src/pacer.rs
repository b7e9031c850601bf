//! Timer-based frame pacing
//!
//! When no audio device is available the emulator has no drain rate to
//! throttle against, so a recurring timer substitutes for it: each tick
//! marks the next emulated frame as due. The tick interval tracks the
//! emulated frame rate scaled by the user speed option and is recomputed
//! on every wait, restarting the timer lazily whenever it changes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::warn;

/// Tick interval in milliseconds for a given frame rate and speed option
///
/// Computed with integer arithmetic as `1000 / (fps * speed / 100)` and
/// floored to 1ms; a degenerate rate that truncates to zero also floors
/// to 1ms rather than trapping.
pub fn tick_interval_ms(frames_per_second: u32, speed_percent: u32) -> u64 {
    let rate = (frames_per_second as u64 * speed_percent as u64) / 100;
    1000u64.checked_div(rate).unwrap_or(0).max(1)
}

/// Auto-reset binary signal: `wait` blocks until `set`, then clears
struct FrameSignal {
    fired: Mutex<bool>,
    cond: Condvar,
}

impl FrameSignal {
    fn new() -> Self {
        FrameSignal {
            fired: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    fn set(&self) {
        let mut fired = self.fired.lock();
        *fired = true;
        self.cond.notify_one();
    }

    fn wait(&self) {
        let mut fired = self.fired.lock();
        while !*fired {
            self.cond.wait(&mut fired);
        }
        *fired = false;
    }

    fn reset(&self) {
        *self.fired.lock() = false;
    }
}

/// Recurring timer thread firing a [`FrameSignal`] at a fixed interval
///
/// The thread is detached; dropping the handle raises the stop flag and
/// the thread exits within one interval.
struct PeriodicTimer {
    stop: Arc<AtomicBool>,
}

impl PeriodicTimer {
    fn start(interval: Duration, signal: Arc<FrameSignal>) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);

        thread::Builder::new()
            .name("frame-timer".into())
            .spawn(move || {
                while !flag.load(Ordering::Relaxed) {
                    thread::sleep(interval);
                    if flag.load(Ordering::Relaxed) {
                        break;
                    }
                    signal.set();
                }
            })?;

        Ok(PeriodicTimer { stop })
    }
}

impl Drop for PeriodicTimer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// Fixed-rate, blocking frame pacer
///
/// Supplies the emulator with a wait that advances at the same rate real
/// audio playback would have, keyed off the emulated frame rate and the
/// speed option. The timer is started on first use and restarted whenever
/// the computed interval changes.
pub struct FramePacer {
    interval_ms: u64,
    timer: Option<PeriodicTimer>,
    signal: Arc<FrameSignal>,
}

impl FramePacer {
    /// Create a pacer with no timer running yet
    pub fn new() -> Self {
        FramePacer {
            interval_ms: 0,
            timer: None,
            signal: Arc::new(FrameSignal::new()),
        }
    }

    /// Block until the next emulated frame is due
    ///
    /// Recomputes the tick interval from the current settings; if it has
    /// changed, the running timer is stopped and a new periodic one is
    /// started at the new interval. If the timer thread cannot be started
    /// the pacer degrades to a plain sleep of the tick interval instead of
    /// waiting on a signal nothing will fire.
    pub fn wait_for_next_frame(&mut self, frames_per_second: u32, speed_percent: u32) {
        let interval_ms = tick_interval_ms(frames_per_second, speed_percent);

        if interval_ms != self.interval_ms {
            self.interval_ms = interval_ms;
            self.timer = None;

            let interval = Duration::from_millis(interval_ms);
            match PeriodicTimer::start(interval, Arc::clone(&self.signal)) {
                Ok(timer) => self.timer = Some(timer),
                Err(err) => warn!("failed to start frame timer: {err}"),
            }
        }

        if self.timer.is_some() {
            self.signal.wait();
        } else {
            thread::sleep(Duration::from_millis(self.interval_ms));
        }
    }

    /// Currently configured tick interval in milliseconds (0 before first use)
    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Stop the timer and clear any pending tick
    ///
    /// The next wait recomputes the interval and restarts the timer.
    pub fn shutdown(&mut self) {
        self.timer = None;
        self.interval_ms = 0;
        self.signal.reset();
    }
}

impl Default for FramePacer {
    fn default() -> Self {
        Self::new()
    }
}
