//! Hand-driven host
//!
//! [`ManualHost`] presents a frame only when told to, and its clock moves only
//! when a frame or [`advance`](ManualHost::advance) moves it. That makes every
//! animation fully deterministic, which is what tests and offline simulation
//! want.
//!
//! ```ignore
//! let host = Arc::new(ManualHost::new());
//! let scalar = AnimatedScalar::builder(host.clone()).build();
//! scalar.set_target(500.0);
//! host.run_until_idle(16.0, 500);
//! assert!(scalar.is_at_rest());
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::host::{duration_ms, FrameCallback, FrameHost, FrameRequestId, TimerCallback, TimerId};

struct PendingTimer {
    due: f64,
    /// Insertion order, breaks ties between timers due at the same time
    seq: u64,
    callback: TimerCallback,
}

struct ManualState {
    now: f64,
    frames: SlotMap<FrameRequestId, FrameCallback>,
    timers: SlotMap<TimerId, PendingTimer>,
    next_seq: u64,
}

/// A host whose frames and clock are driven by the caller
pub struct ManualHost {
    state: Mutex<ManualState>,
    presents_frames: bool,
}

impl ManualHost {
    /// A host that presents frames when driven, with its clock at 0ms
    pub fn new() -> Self {
        Self::with_frames(true)
    }

    /// A host with timers and a clock but no frame facility
    ///
    /// Frame requests are refused, as in a non-interactive environment.
    pub fn headless() -> Self {
        Self::with_frames(false)
    }

    fn with_frames(presents_frames: bool) -> Self {
        Self {
            state: Mutex::new(ManualState {
                now: 0.0,
                frames: SlotMap::with_key(),
                timers: SlotMap::with_key(),
                next_seq: 0,
            }),
            presents_frames,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether frame requests are accepted
    pub fn presents_frames(&self) -> bool {
        self.presents_frames
    }

    /// Present one frame at `timestamp` (ms)
    ///
    /// The clock jumps to `timestamp`, even backwards. Timers due by then fire
    /// first; then every frame callback requested before this call runs.
    /// Callbacks requested while the frame runs wait for the next one.
    /// Returns the number of frame callbacks that ran.
    pub fn frame(&self, timestamp: f64) -> usize {
        self.fire_timers_until(timestamp);

        let callbacks: SmallVec<[FrameCallback; 4]> = {
            let mut state = self.lock();
            state.now = timestamp;
            // drain() retires the keys, so stale ids can never cancel new requests
            state.frames.drain().map(|(_, callback)| callback).collect()
        };

        let count = callbacks.len();
        for callback in callbacks {
            callback(timestamp);
        }
        count
    }

    /// Present a frame `interval` ms after the current time
    pub fn step_frame(&self, interval: f64) -> usize {
        let timestamp = self.now() + interval;
        self.frame(timestamp)
    }

    /// Present frames every `interval` ms until none are pending
    ///
    /// Stops after `max_frames` frames. Returns the number of frames presented.
    pub fn run_until_idle(&self, interval: f64, max_frames: usize) -> usize {
        let mut presented = 0;
        while presented < max_frames && self.pending_frames() > 0 {
            self.step_frame(interval);
            presented += 1;
        }
        presented
    }

    /// Move the clock forward by `ms` without presenting a frame
    pub fn advance(&self, ms: f64) {
        let until = self.now() + ms;
        self.fire_timers_until(until);
        self.lock().now = until;
    }

    /// Fire every timer due at or before `until`, earliest first
    fn fire_timers_until(&self, until: f64) {
        loop {
            let next = {
                let mut state = self.lock();
                let due = state
                    .timers
                    .iter()
                    .filter(|(_, timer)| timer.due <= until)
                    .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due).then(a.seq.cmp(&b.seq)))
                    .map(|(id, _)| id);

                due.and_then(|id| state.timers.remove(id)).map(|timer| {
                    if timer.due > state.now {
                        state.now = timer.due;
                    }
                    timer.callback
                })
            };

            match next {
                Some(callback) => callback(),
                None => break,
            }
        }
    }

    /// Number of frame callbacks waiting for the next frame
    pub fn pending_frames(&self) -> usize {
        self.lock().frames.len()
    }

    /// Number of timers that have not fired or been cleared
    pub fn pending_timers(&self) -> usize {
        self.lock().timers.len()
    }
}

impl Default for ManualHost {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameHost for ManualHost {
    fn now(&self) -> f64 {
        self.lock().now
    }

    fn request_frame(&self, callback: FrameCallback) -> Option<FrameRequestId> {
        if !self.presents_frames {
            return None;
        }
        Some(self.lock().frames.insert(callback))
    }

    fn cancel_frame(&self, id: FrameRequestId) {
        self.lock().frames.remove(id);
    }

    fn set_timeout(&self, delay: Duration, callback: TimerCallback) -> Option<TimerId> {
        let mut state = self.lock();
        let due = state.now + duration_ms(delay);
        let seq = state.next_seq;
        state.next_seq += 1;
        Some(state.timers.insert(PendingTimer { due, seq, callback }))
    }

    fn clear_timeout(&self, id: TimerId) {
        self.lock().timers.remove(id);
    }
}
