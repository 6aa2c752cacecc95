//! Rest and threshold predicates
//!
//! Both are recomputed from scratch every frame; nothing here is cached.

use crate::integrator::MotionState;

/// Default rest tolerance
pub const DEFAULT_EPSILON: f64 = 0.1;

impl MotionState {
    /// Within `epsilon` of the target and moving slower than `epsilon`
    pub fn is_at_rest(&self, epsilon: f64) -> bool {
        (self.value - self.target).abs() < epsilon && self.velocity.abs() < epsilon
    }

    /// Strictly above `threshold`
    pub fn is_above_threshold(&self, threshold: f64) -> bool {
        self.value > threshold
    }
}
