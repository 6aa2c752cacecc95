//! Frame scheduler
//!
//! Drives an animated scalar one frame at a time. A scalar is either idle or
//! has exactly one frame pending. Each frame:
//!
//! 1. measures the time since the previous frame, clamped to `[0, 40]` ms
//! 2. integrates one step
//! 3. delivers the new value
//! 4. signals notify if the scalar came to rest or crossed its threshold
//! 5. requests the next frame unless at rest
//!
//! Every request carries a token. A callback whose token no longer matches
//! the scalar's pending frame (cancelled, stopped or superseded) does nothing.

use std::mem;
use std::sync::{Arc, Weak};

use tracing::{debug, trace};

use crate::host::FrameCallback;
use crate::scalar::{FrameSchedule, ScalarState, Shared};

/// Longest step a single frame integrates, in milliseconds
///
/// Bounds the integration error after the host stalls or is backgrounded.
pub const MAX_FRAME_DELTA_MS: f64 = 40.0;

/// Clamp an elapsed frame time to `[0, MAX_FRAME_DELTA_MS]`
///
/// Negative (clock going backwards) and NaN deltas become 0.
pub fn clamp_frame_delta(delta_ms: f64) -> f64 {
    if delta_ms.is_nan() || delta_ms < 0.0 {
        0.0
    } else {
        delta_ms.min(MAX_FRAME_DELTA_MS)
    }
}

impl Shared {
    /// Make sure a frame is pending
    ///
    /// No-op when a frame is already pending, after stop, or when the host
    /// cannot present frames. `timestamp` becomes the baseline the next frame
    /// measures from; `None` uses the host clock.
    pub(crate) fn request_frame(self: &Arc<Self>, state: &mut ScalarState, timestamp: Option<f64>) {
        if state.stopped || matches!(state.schedule, FrameSchedule::Running { .. }) {
            return;
        }

        let token = state.next_token();
        let weak: Weak<Shared> = Arc::downgrade(self);
        let callback: FrameCallback = Box::new(move |t| {
            if let Some(shared) = weak.upgrade() {
                shared.on_frame(token, t);
            }
        });

        let baseline = timestamp.unwrap_or_else(|| self.host.now());
        match self.host.request_frame(callback) {
            Some(request) => {
                state.last_frame_ms = Some(baseline);
                state.schedule = FrameSchedule::Running { request, token };
            }
            None => trace!("host presents no frames; animation request ignored"),
        }
    }

    /// Cancel the pending frame, if any, and go idle
    pub(crate) fn cancel_frame(&self, state: &mut ScalarState) {
        if let FrameSchedule::Running { request, .. } =
            mem::replace(&mut state.schedule, FrameSchedule::Idle)
        {
            self.host.cancel_frame(request);
        }
    }

    fn on_frame(self: &Arc<Self>, token: u64, t: f64) {
        let delivery = {
            let mut state = self.lock();
            match state.schedule {
                FrameSchedule::Running { token: pending, .. } if pending == token => {}
                _ => {
                    trace!(token, "stale frame callback ignored");
                    return;
                }
            }
            state.schedule = FrameSchedule::Idle;

            let delta_ms = clamp_frame_delta(t - state.last_frame_ms.unwrap_or(t));
            let was_above = state.is_above_threshold();

            state.motion = state.motion.step(&state.params, delta_ms / 1000.0);

            let at_rest = state.is_at_rest();
            let crossed = state.is_above_threshold() != was_above;
            trace!(
                delta_ms,
                value = state.motion.value,
                velocity = state.motion.velocity,
                "frame"
            );

            if at_rest {
                debug!(value = state.motion.value, "animated scalar came to rest");
            } else {
                self.request_frame(&mut state, Some(t));
            }

            state
                .notifier
                .delivery(Some(state.motion.value), at_rest || crossed)
        };

        self.dispatch(delivery);
    }
}
