//! Target controller
//!
//! Mutations of an animated scalar's target, value and parameters, and the
//! decision of whether the frame loop has to start.
//!
//! At most one delayed target is pending per scalar. Scheduling a new one, or
//! any immediate `set_target`/`set_value`, cancels it.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tracing::{debug, trace};

use crate::host::TimerCallback;
use crate::integrator::{Algorithm, MotionState};
use crate::notify::Delivery;
use crate::scalar::{AttachmentState, PendingTarget, ScalarState, Shared};

impl Shared {
    /// Jump to `value`: target follows, velocity drops to 0
    ///
    /// A running frame loop is left alone; its next frame finds the scalar at
    /// rest and goes idle.
    pub(crate) fn set_value(&self, value: f64) {
        let delivery = {
            let mut state = self.lock();
            if state.stopped {
                return;
            }

            self.cancel_delayed(&mut state);
            state.motion = MotionState::at(value);
            debug!(value, "animated scalar value set");

            match state.attachment {
                AttachmentState::Attached => state.notifier.delivery(Some(value), false),
                AttachmentState::Unattached => Delivery::none(),
            }
        };

        self.dispatch(delivery);
    }

    pub(crate) fn set_target(self: &Arc<Self>, target: f64) {
        let delivery = {
            let mut state = self.lock();
            if state.stopped {
                return;
            }
            self.apply_target(&mut state, target)
        };

        self.dispatch(delivery);
    }

    /// Shared by immediate and delayed targets
    fn apply_target(self: &Arc<Self>, state: &mut ScalarState, target: f64) -> Delivery {
        self.cancel_delayed(state);

        // Exact comparison: any change, however small, is a new target
        if target == state.motion.target {
            return Delivery::none();
        }

        debug!(from = state.motion.target, to = target, "animated scalar target changed");
        state.motion.target = target;
        if !state.is_at_rest() {
            self.request_frame(state, None);
        }

        // Notify even when already at rest: the owner learns about the intent
        state.notifier.delivery(None, true)
    }

    pub(crate) fn set_target_delayed(self: &Arc<Self>, target: f64, delay: Duration) {
        let mut state = self.lock();
        if state.stopped {
            return;
        }
        self.cancel_delayed(&mut state);

        let token = state.next_token();
        let weak: Weak<Shared> = Arc::downgrade(self);
        let callback: TimerCallback = Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.fire_delayed(token);
            }
        });

        match self.host.set_timeout(delay, callback) {
            Some(timer) => {
                debug!(target, delay_ms = delay.as_millis() as u64, "delayed target scheduled");
                state.delayed = Some(PendingTarget {
                    timer,
                    token,
                    target,
                });
            }
            None => trace!("host has no timers; delayed target dropped"),
        }
    }

    fn fire_delayed(self: &Arc<Self>, token: u64) {
        let delivery = {
            let mut state = self.lock();
            let pending = match state.delayed {
                Some(pending) if pending.token == token && !state.stopped => pending,
                _ => {
                    trace!(token, "stale delayed target ignored");
                    return;
                }
            };
            state.delayed = None;
            debug!(target = pending.target, "delayed target fired");
            self.apply_target(&mut state, pending.target)
        };

        self.dispatch(delivery);
    }

    /// Cancel the pending delayed target, if any
    pub(crate) fn cancel_delayed(&self, state: &mut ScalarState) {
        if let Some(pending) = state.delayed.take() {
            self.host.clear_timeout(pending.timer);
        }
    }

    pub(crate) fn set_threshold(&self, threshold: f64) {
        let mut state = self.lock();
        if !state.stopped {
            state.threshold = threshold;
        }
    }

    pub(crate) fn set_algorithm(&self, algorithm: Algorithm) {
        let mut state = self.lock();
        if !state.stopped {
            state.params.algorithm = algorithm;
        }
    }

    /// The single Unattached -> Attached transition
    ///
    /// Delivers the current value once, if at rest. Later calls do nothing.
    pub(crate) fn attach(&self) {
        let delivery = {
            let mut state = self.lock();
            if state.stopped || state.attachment == AttachmentState::Attached {
                return;
            }

            state.attachment = AttachmentState::Attached;
            debug!(value = state.motion.value, "animated scalar attached");

            if state.is_at_rest() {
                state.notifier.delivery(Some(state.motion.value), false)
            } else {
                Delivery::none()
            }
        };

        self.dispatch(delivery);
    }

    /// Cancel both pending callbacks; nothing is mutated or delivered afterwards
    pub(crate) fn stop(&self) {
        {
            let mut state = self.lock();
            if !state.stopped {
                state.stopped = true;
                self.cancel_frame(&mut state);
                self.cancel_delayed(&mut state);
                debug!(value = state.motion.value, "animated scalar stopped");
            }
        }

        // Callbacks already past their stopped check finish first
        self.gate.wait_for_others();
    }
}
