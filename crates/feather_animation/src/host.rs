//! Host capabilities
//!
//! Everything an animated scalar needs from its environment: a clock, a way to
//! run a callback before the next frame, and one-shot timers. Scalars receive
//! the host at construction, so tests can drive frames by hand
//! ([`ManualHost`](crate::ManualHost)) while applications present frames in
//! real time ([`BackgroundHost`](crate::BackgroundHost)).

use std::time::Duration;

use slotmap::new_key_type;

new_key_type! {
    /// Handle to a pending frame callback
    pub struct FrameRequestId;
    /// Handle to a pending one-shot timer
    pub struct TimerId;
}

/// Callback run before a frame is presented, receiving the frame timestamp in ms
pub type FrameCallback = Box<dyn FnOnce(f64) + Send>;

/// Callback run once a timer elapses
pub type TimerCallback = Box<dyn FnOnce() + Send>;

/// Frame presentation, timers and clock for animated scalars
///
/// Callbacks must be invoked without any host lock held: they re-enter the
/// host to request the next frame.
pub trait FrameHost: Send + Sync {
    /// Current host time in milliseconds
    fn now(&self) -> f64;

    /// Run `callback` before the next frame is presented
    ///
    /// Returns `None` when the host cannot present frames (headless).
    fn request_frame(&self, callback: FrameCallback) -> Option<FrameRequestId>;

    /// Cancel a pending frame callback
    ///
    /// Unknown, fired or already cancelled ids are ignored.
    fn cancel_frame(&self, id: FrameRequestId);

    /// Run `callback` once after `delay`
    ///
    /// Returns `None` when the host has no timer facility.
    fn set_timeout(&self, delay: Duration, callback: TimerCallback) -> Option<TimerId>;

    /// Cancel a pending timer; unknown, fired or cancelled ids are ignored
    fn clear_timeout(&self, id: TimerId);
}

/// Milliseconds in `duration`, as the host clock counts them
pub(crate) fn duration_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
