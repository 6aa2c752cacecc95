//! Notification boundary
//!
//! Two independent channels leave an animated scalar:
//!
//! - the **value** channel receives every new value (every frame, and on
//!   `set_value` once attached);
//! - the **notify** channel carries no payload and fires only on discrete
//!   changes: a target change, coming to rest, or a threshold crossing.
//!
//! Callbacks never run under the scalar's lock. State changes produce a
//! [`Delivery`], which is dispatched after the lock is released so callbacks
//! may call back into the scalar. Each callback checks that the scalar has not
//! been stopped right before it runs, and a [`DispatchGate`] lets `stop` wait
//! out callbacks already running on other threads.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use smallvec::SmallVec;

/// Receives each new value of an animated scalar
pub type ValueCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// Signalled on render-affecting state changes
pub type NotifyCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone, Default)]
pub(crate) struct Notifier {
    consumer: Option<ValueCallback>,
    notify: Option<NotifyCallback>,
}

impl Notifier {
    pub(crate) fn set_consumer(&mut self, consumer: ValueCallback) {
        self.consumer = Some(consumer);
    }

    pub(crate) fn set_notify(&mut self, notify: NotifyCallback) {
        self.notify = Some(notify);
    }

    /// Capture the callbacks needed to deliver `value` and/or a notify signal
    pub(crate) fn delivery(&self, value: Option<f64>, notify: bool) -> Delivery {
        Delivery {
            value: value.and_then(|v| self.consumer.clone().map(|consumer| (consumer, v))),
            notify: if notify { self.notify.clone() } else { None },
        }
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("consumer", &self.consumer.is_some())
            .field("notify", &self.notify.is_some())
            .finish()
    }
}

/// Callbacks owed to the outside world after a state change
#[must_use = "a delivery does nothing until dispatched"]
#[derive(Default)]
pub(crate) struct Delivery {
    value: Option<(ValueCallback, f64)>,
    notify: Option<NotifyCallback>,
}

impl Delivery {
    pub(crate) fn none() -> Self {
        Self::default()
    }

    fn is_empty(&self) -> bool {
        self.value.is_none() && self.notify.is_none()
    }

    /// Run the owed callbacks: value first, then notify
    ///
    /// `is_stopped` is checked before each callback; once it reports true
    /// nothing more runs.
    pub(crate) fn dispatch(self, gate: &DispatchGate, is_stopped: impl Fn() -> bool) {
        if self.is_empty() {
            return;
        }

        let _pass = gate.enter();
        if let Some((consumer, value)) = self.value {
            if is_stopped() {
                return;
            }
            consumer(value);
        }
        if let Some(notify) = self.notify {
            if is_stopped() {
                return;
            }
            notify();
        }
    }
}

/// Threads currently dispatching callbacks for one scalar
///
/// Dispatches never wait on each other. Only [`wait_for_others`](Self::wait_for_others)
/// blocks, until every dispatch running on another thread has finished.
#[derive(Debug, Default)]
pub(crate) struct DispatchGate {
    /// One entry per dispatch in progress; nested dispatches repeat the thread
    active: Mutex<SmallVec<[ThreadId; 2]>>,
    idle: Condvar,
}

impl DispatchGate {
    fn lock(&self) -> MutexGuard<'_, SmallVec<[ThreadId; 2]>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter(&self) -> GatePass<'_> {
        let id = thread::current().id();
        self.lock().push(id);
        GatePass { gate: self, id }
    }

    /// Block until no other thread is dispatching
    ///
    /// Dispatches on the calling thread are not waited for, so a callback may
    /// stop its own scalar.
    pub(crate) fn wait_for_others(&self) {
        let id = thread::current().id();
        let mut active = self.lock();
        while active.iter().any(|other| *other != id) {
            active = self
                .idle
                .wait(active)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Marks one dispatch in progress until dropped
struct GatePass<'a> {
    gate: &'a DispatchGate,
    id: ThreadId,
}

impl Drop for GatePass<'_> {
    fn drop(&mut self) {
        let mut active = self.gate.lock();
        if let Some(pos) = active.iter().position(|other| *other == self.id) {
            active.swap_remove(pos);
        }
        drop(active);
        self.gate.idle.notify_all();
    }
}
