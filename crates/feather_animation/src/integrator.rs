//! Spring and decay integration
//!
//! Explicit (forward Euler) integration of a damped spring, plus a first-order
//! exponential approach ("decay"). Both advance `value` and `velocity` only;
//! the target is read, never written.
//!
//! Neither rule corrects for large steps. Callers bound the step size instead
//! (the frame scheduler clamps every step to 40ms).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FeatherError;

/// Default spring stiffness
pub const DEFAULT_STIFFNESS: f64 = 170.0;
/// Default spring damping
pub const DEFAULT_DAMPING: f64 = 26.0;
/// Default decay rate (per second)
pub const DEFAULT_DECAY: f64 = 1.0;

/// Integration rule used to drive a value toward its target
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Damped harmonic oscillator
    #[default]
    Spring,
    /// First-order exponential approach
    Decay,
}

impl Algorithm {
    /// Lowercase name, as used in configuration files
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Spring => "spring",
            Algorithm::Decay => "decay",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = FeatherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "spring" => Ok(Algorithm::Spring),
            "decay" => Ok(Algorithm::Decay),
            other => Err(FeatherError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Physical parameters of the integration
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionParams {
    pub algorithm: Algorithm,
    pub stiffness: f64,
    pub damping: f64,
    /// Decay rate, only used by [`Algorithm::Decay`]
    pub decay: f64,
}

impl MotionParams {
    pub fn spring(stiffness: f64, damping: f64) -> Self {
        Self {
            algorithm: Algorithm::Spring,
            stiffness,
            damping,
            ..Self::default()
        }
    }

    pub fn decay(rate: f64) -> Self {
        Self {
            algorithm: Algorithm::Decay,
            decay: rate,
            ..Self::default()
        }
    }
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Spring,
            stiffness: DEFAULT_STIFFNESS,
            damping: DEFAULT_DAMPING,
            decay: DEFAULT_DECAY,
        }
    }
}

/// Kinematic state of an animated scalar
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MotionState {
    pub value: f64,
    pub velocity: f64,
    pub target: f64,
}

impl MotionState {
    /// A motionless state sitting on its own target
    pub fn at(value: f64) -> Self {
        Self {
            value,
            velocity: 0.0,
            target: value,
        }
    }

    /// Advance the state by `dt` seconds
    #[must_use]
    pub fn step(self, params: &MotionParams, dt: f64) -> Self {
        step(self, params, dt)
    }
}

/// Advance `state` by `dt` seconds using the rule selected in `params`
pub fn step(state: MotionState, params: &MotionParams, dt: f64) -> MotionState {
    let MotionState {
        mut value,
        mut velocity,
        target,
    } = state;

    match params.algorithm {
        Algorithm::Spring => {
            let displacement = value - target;
            let hooke_force = -params.stiffness * displacement;
            let damped_force = hooke_force - params.damping * velocity;
            velocity += damped_force * dt;
            value += velocity * dt;
        }
        Algorithm::Decay => {
            velocity = params.decay * (target - value);
            value += velocity * dt;
        }
    }

    MotionState {
        value,
        velocity,
        target,
    }
}
