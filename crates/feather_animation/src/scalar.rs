//! Animated scalars
//!
//! An [`AnimatedScalar`] drives one value toward a movable target, one frame at
//! a time, on whatever [`FrameHost`] it was built with. Its operations are
//! split across modules by concern:
//!
//! - target mutation in `controller`
//! - the frame loop in [`scheduler`](crate::scheduler)
//! - callback delivery in [`notify`](crate::notify)
//!
//! This module holds the shared state and the public handles.
//!
//! # Example
//!
//! ```ignore
//! use feather_animation::{AnimatedScalar, FeatherConfig, ManualHost};
//! use std::sync::Arc;
//!
//! let host = Arc::new(ManualHost::new());
//! let scalar = AnimatedScalar::builder(host.clone())
//!     .config(FeatherConfig::new(0.0))
//!     .on_value(|v| println!("translateX({v}px)"))
//!     .on_notify(|| println!("re-render"))
//!     .build();
//!
//! scalar.attach();
//! scalar.set_target(500.0);
//! host.run_until_idle(16.0, 500);
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tracing::warn;

use crate::config::FeatherConfig;
use crate::host::{FrameHost, FrameRequestId, TimerId};
use crate::integrator::{Algorithm, MotionParams, MotionState};
use crate::notify::{Delivery, DispatchGate, Notifier, ValueCallback};

/// Whether the owner has attached the scalar to whatever it animates
///
/// Values set before attachment are not delivered. Attaching delivers the
/// current value once, if the scalar is at rest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AttachmentState {
    #[default]
    Unattached,
    Attached,
}

/// Public view of the frame loop
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScheduleState {
    /// No frame pending
    Idle,
    /// Exactly one frame pending
    Running,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum FrameSchedule {
    Idle,
    Running { request: FrameRequestId, token: u64 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct PendingTarget {
    pub(crate) timer: TimerId,
    pub(crate) token: u64,
    pub(crate) target: f64,
}

#[derive(Debug)]
pub(crate) struct ScalarState {
    pub(crate) motion: MotionState,
    pub(crate) params: MotionParams,
    pub(crate) threshold: f64,
    pub(crate) epsilon: f64,
    /// Timestamp the next frame measures its step from
    pub(crate) last_frame_ms: Option<f64>,
    pub(crate) schedule: FrameSchedule,
    pub(crate) delayed: Option<PendingTarget>,
    pub(crate) attachment: AttachmentState,
    pub(crate) stopped: bool,
    pub(crate) notifier: Notifier,
    next_token: u64,
}

impl ScalarState {
    fn new(config: &FeatherConfig, notifier: Notifier) -> Self {
        Self {
            motion: MotionState::at(config.value),
            params: config.params(),
            threshold: config.threshold,
            epsilon: config.epsilon,
            last_frame_ms: None,
            schedule: FrameSchedule::Idle,
            delayed: None,
            attachment: AttachmentState::Unattached,
            stopped: false,
            notifier,
            next_token: 0,
        }
    }

    pub(crate) fn is_at_rest(&self) -> bool {
        self.motion.is_at_rest(self.epsilon)
    }

    pub(crate) fn is_above_threshold(&self) -> bool {
        self.motion.is_above_threshold(self.threshold)
    }

    /// Fresh token identifying one frame request or one delayed target
    pub(crate) fn next_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }
}

/// State shared between the owner, its handles and pending host callbacks
///
/// Host callbacks hold only a [`Weak`] reference, so a dropped scalar is never
/// touched again.
pub(crate) struct Shared {
    pub(crate) host: Arc<dyn FrameHost>,
    state: Mutex<ScalarState>,
    pub(crate) gate: DispatchGate,
}

impl Shared {
    pub(crate) fn lock(&self) -> MutexGuard<'_, ScalarState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `delivery` outside the lock, skipping whatever is left once stopped
    pub(crate) fn dispatch(&self, delivery: Delivery) {
        delivery.dispatch(&self.gate, || self.lock().stopped);
    }
}

/// Builder for [`AnimatedScalar`]
pub struct AnimatedScalarBuilder {
    host: Arc<dyn FrameHost>,
    config: FeatherConfig,
    notifier: Notifier,
}

impl AnimatedScalarBuilder {
    /// Initial value and physical parameters
    pub fn config(mut self, config: FeatherConfig) -> Self {
        self.config = config;
        self
    }

    /// Callback receiving each new value
    pub fn on_value<F>(mut self, consumer: F) -> Self
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        self.notifier.set_consumer(Arc::new(consumer));
        self
    }

    /// Callback signalled on target changes, rest and threshold crossings
    pub fn on_notify<F>(mut self, notify: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.notifier.set_notify(Arc::new(notify));
        self
    }

    pub fn build(self) -> AnimatedScalar {
        if cfg!(debug_assertions) && self.config.epsilon <= 0.0 {
            warn!(
                epsilon = self.config.epsilon,
                "animated scalar built with a non-positive epsilon; it will never come to rest"
            );
        }

        let shared = Arc::new(Shared {
            host: self.host,
            state: Mutex::new(ScalarState::new(&self.config, self.notifier)),
            gate: DispatchGate::default(),
        });

        {
            let mut state = shared.lock();
            if !state.is_at_rest() {
                shared.request_frame(&mut state, None);
            }
        }

        AnimatedScalar { shared }
    }
}

/// A scalar animated toward a movable target
///
/// Owns its state exclusively; dropping it stops the animation. Use
/// [`handle`](Self::handle) to reach the scalar from inside its own callbacks.
pub struct AnimatedScalar {
    shared: Arc<Shared>,
}

impl AnimatedScalar {
    pub fn builder(host: Arc<dyn FrameHost>) -> AnimatedScalarBuilder {
        AnimatedScalarBuilder {
            host,
            config: FeatherConfig::default(),
            notifier: Notifier::default(),
        }
    }

    /// A scalar without callbacks
    pub fn new(host: Arc<dyn FrameHost>, config: FeatherConfig) -> Self {
        Self::builder(host).config(config).build()
    }

    /// A weak handle for use inside callbacks
    pub fn handle(&self) -> ScalarHandle {
        ScalarHandle {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Jump to `value` with no motion, delivering it once attached
    pub fn set_value(&self, value: f64) {
        self.shared.set_value(value);
    }

    /// Animate toward `target`
    pub fn set_target(&self, target: f64) {
        self.shared.set_target(target);
    }

    /// Animate toward `target` after `delay`, replacing any earlier delayed target
    pub fn set_target_delayed(&self, target: f64, delay: Duration) {
        self.shared.set_target_delayed(target, delay);
    }

    pub fn set_threshold(&self, threshold: f64) {
        self.shared.set_threshold(threshold);
    }

    pub fn set_algorithm(&self, algorithm: Algorithm) {
        self.shared.set_algorithm(algorithm);
    }

    /// Replace the value callback
    pub fn set_consumer<F>(&self, consumer: F)
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        let consumer: ValueCallback = Arc::new(consumer);
        self.shared.lock().notifier.set_consumer(consumer);
    }

    /// Mark the scalar attached; see [`AttachmentState`]
    pub fn attach(&self) {
        self.shared.attach();
    }

    /// Cancel any pending frame and delayed target; later mutations are ignored
    ///
    /// Returns once callbacks running on other threads have finished, so no
    /// value or notify is delivered after it. Do not call it while holding a
    /// lock those callbacks take.
    pub fn stop(&self) {
        self.shared.stop();
    }

    pub fn value(&self) -> f64 {
        self.shared.lock().motion.value
    }

    pub fn target(&self) -> f64 {
        self.shared.lock().motion.target
    }

    pub fn velocity(&self) -> f64 {
        self.shared.lock().motion.velocity
    }

    pub fn threshold(&self) -> f64 {
        self.shared.lock().threshold
    }

    pub fn algorithm(&self) -> Algorithm {
        self.shared.lock().params.algorithm
    }

    pub fn is_at_rest(&self) -> bool {
        self.shared.lock().is_at_rest()
    }

    pub fn is_above_threshold(&self) -> bool {
        self.shared.lock().is_above_threshold()
    }

    pub fn schedule_state(&self) -> ScheduleState {
        match self.shared.lock().schedule {
            FrameSchedule::Idle => ScheduleState::Idle,
            FrameSchedule::Running { .. } => ScheduleState::Running,
        }
    }

    /// Whether a frame is pending
    pub fn is_running(&self) -> bool {
        self.schedule_state() == ScheduleState::Running
    }

    /// Whether a delayed target is waiting to be applied
    pub fn has_pending_target(&self) -> bool {
        self.shared.lock().delayed.is_some()
    }

    pub fn attachment(&self) -> AttachmentState {
        self.shared.lock().attachment
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.lock().stopped
    }
}

impl Drop for AnimatedScalar {
    fn drop(&mut self) {
        self.shared.stop();
    }
}

/// A weak handle to an [`AnimatedScalar`]
///
/// Reads return `None` and mutations do nothing once the scalar is dropped.
#[derive(Clone)]
pub struct ScalarHandle {
    shared: Weak<Shared>,
}

impl ScalarHandle {
    pub fn value(&self) -> Option<f64> {
        self.shared
            .upgrade()
            .map(|shared| shared.lock().motion.value)
    }

    pub fn target(&self) -> Option<f64> {
        self.shared
            .upgrade()
            .map(|shared| shared.lock().motion.target)
    }

    /// `false` while moving; a dropped scalar counts as at rest
    pub fn is_at_rest(&self) -> bool {
        self.shared
            .upgrade()
            .map(|shared| shared.lock().is_at_rest())
            .unwrap_or(true)
    }

    pub fn set_value(&self, value: f64) {
        if let Some(shared) = self.shared.upgrade() {
            shared.set_value(value);
        }
    }

    pub fn set_target(&self, target: f64) {
        if let Some(shared) = self.shared.upgrade() {
            shared.set_target(target);
        }
    }

    pub fn set_target_delayed(&self, target: f64, delay: Duration) {
        if let Some(shared) = self.shared.upgrade() {
            shared.set_target_delayed(target, delay);
        }
    }

    /// Stop the scalar; see [`AnimatedScalar::stop`]
    pub fn stop(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.stop();
        }
    }

    /// Check if the scalar still exists
    pub fn is_alive(&self) -> bool {
        self.shared.strong_count() > 0
    }
}
