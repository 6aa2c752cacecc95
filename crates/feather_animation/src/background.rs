//! Real-time host on a background thread
//!
//! [`BackgroundHost`] presents frames at a fixed rate (120fps by default) from
//! its own thread, so animations keep running without an event loop. Each
//! iteration fires the timers that are due, then runs every frame callback
//! requested since the previous frame.
//!
//! ```ignore
//! let host = Arc::new(BackgroundHost::new());
//! host.start();
//! let scalar = AnimatedScalar::builder(host.clone())
//!     .on_value(|v| println!("{v}"))
//!     .build();
//! scalar.set_target(100.0);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use slotmap::SlotMap;
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::host::{FrameCallback, FrameHost, FrameRequestId, TimerCallback, TimerId};

/// Frame rate used by [`BackgroundHost::new`]
pub const DEFAULT_FPS: u32 = 120;

struct PendingTimer {
    /// `None` when the delay runs past what `Instant` can represent
    due: Option<Instant>,
    callback: TimerCallback,
}

#[derive(Default)]
struct Queue {
    frames: SlotMap<FrameRequestId, FrameCallback>,
    timers: SlotMap<TimerId, PendingTimer>,
}

struct Inner {
    epoch: Instant,
    queue: Mutex<Queue>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn now_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }

    /// Run due timers, then the frame callbacks queued before this frame
    fn present_frame(&self) {
        let now = Instant::now();
        let (timers, frames) = {
            let mut queue = self.lock();

            let due: SmallVec<[TimerId; 4]> = queue
                .timers
                .iter()
                .filter(|(_, timer)| timer.due.is_some_and(|due| due <= now))
                .map(|(id, _)| id)
                .collect();
            let mut timers: SmallVec<[PendingTimer; 4]> = due
                .into_iter()
                .filter_map(|id| queue.timers.remove(id))
                .collect();
            timers.sort_by_key(|timer| timer.due);

            let frames: SmallVec<[FrameCallback; 4]> =
                queue.frames.drain().map(|(_, callback)| callback).collect();

            (timers, frames)
        };

        for timer in timers {
            (timer.callback)();
        }

        let timestamp = self.now_ms();
        for callback in frames {
            callback(timestamp);
        }
    }
}

/// A host presenting frames from a background thread
///
/// Frames requested before [`start`](Self::start) wait until the thread runs.
/// Dropping the host stops the thread.
pub struct BackgroundHost {
    inner: Arc<Inner>,
    frame_duration: Duration,
    /// Stop signal for the frame thread
    stop_flag: Arc<AtomicBool>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
}

impl BackgroundHost {
    pub fn new() -> Self {
        Self::with_fps(DEFAULT_FPS)
    }

    /// A host presenting `fps` frames per second (at least 1)
    pub fn with_fps(fps: u32) -> Self {
        Self {
            inner: Arc::new(Inner {
                epoch: Instant::now(),
                queue: Mutex::new(Queue::default()),
            }),
            frame_duration: Duration::from_micros(1_000_000 / u64::from(fps.max(1))),
            stop_flag: Arc::new(AtomicBool::new(false)),
            thread_handle: Mutex::new(None),
        }
    }

    fn thread_handle(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.thread_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Start presenting frames; no-op if already running
    pub fn start(&self) {
        let mut handle = self.thread_handle();
        if handle.is_some() {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let stop_flag = Arc::clone(&self.stop_flag);
        let frame_duration = self.frame_duration;
        debug!(?frame_duration, "starting background frame thread");

        *handle = Some(thread::spawn(move || {
            while !stop_flag.load(Ordering::Relaxed) {
                let start = Instant::now();

                inner.present_frame();

                // Sleep for remaining frame time
                let elapsed = start.elapsed();
                if elapsed < frame_duration {
                    thread::sleep(frame_duration - elapsed);
                }
            }
        }));
    }

    /// Stop the frame thread and wait for it to exit
    ///
    /// Pending requests stay queued and run if the host is started again.
    pub fn stop(&self) {
        let handle = self.thread_handle().take();
        if let Some(handle) = handle {
            self.stop_flag.store(true, Ordering::Relaxed);
            if handle.join().is_err() {
                warn!("background frame thread panicked");
            }
            self.stop_flag.store(false, Ordering::Relaxed);
            debug!("background frame thread stopped");
        }
    }

    /// Check if the frame thread is running
    pub fn is_running(&self) -> bool {
        self.thread_handle().is_some()
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }
}

impl Default for BackgroundHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BackgroundHost {
    fn drop(&mut self) {
        self.stop();
    }
}

impl FrameHost for BackgroundHost {
    fn now(&self) -> f64 {
        self.inner.now_ms()
    }

    fn request_frame(&self, callback: FrameCallback) -> Option<FrameRequestId> {
        Some(self.inner.lock().frames.insert(callback))
    }

    fn cancel_frame(&self, id: FrameRequestId) {
        self.inner.lock().frames.remove(id);
    }

    fn set_timeout(&self, delay: Duration, callback: TimerCallback) -> Option<TimerId> {
        let due = Instant::now().checked_add(delay);
        if due.is_none() {
            debug!(?delay, "timer delay out of range; it will never fire");
        }
        Some(self.inner.lock().timers.insert(PendingTimer { due, callback }))
    }

    fn clear_timeout(&self, id: TimerId) {
        self.inner.lock().timers.remove(id);
    }
}
