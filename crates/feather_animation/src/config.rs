//! Animated scalar configuration
//!
//! A [`FeatherConfig`] is plain data: every field has a default and may be
//! omitted from a TOML document. Callbacks are not part of the configuration;
//! they are attached through [`AnimatedScalarBuilder`](crate::AnimatedScalarBuilder).
//!
//! ```toml
//! value = 0.0
//! algo = "decay"
//! decay = 4.0
//! threshold = 100.0
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::integrator::{
    Algorithm, MotionParams, DEFAULT_DAMPING, DEFAULT_DECAY, DEFAULT_STIFFNESS,
};
use crate::rest::DEFAULT_EPSILON;

/// Initial value and physical parameters of an animated scalar
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FeatherConfig {
    /// Initial value (the target starts here too)
    pub value: f64,
    /// Boundary whose crossings trigger a notify
    pub threshold: f64,
    pub stiffness: f64,
    pub damping: f64,
    pub algo: Algorithm,
    /// Decay rate for [`Algorithm::Decay`]
    pub decay: f64,
    /// Rest tolerance on both distance and speed
    pub epsilon: f64,
}

impl FeatherConfig {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            ..Self::default()
        }
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_stiffness(mut self, stiffness: f64) -> Self {
        self.stiffness = stiffness;
        self
    }

    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    pub fn with_algorithm(mut self, algo: Algorithm) -> Self {
        self.algo = algo;
        self
    }

    pub fn with_decay(mut self, decay: f64) -> Self {
        self.decay = decay;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Integration parameters described by this configuration
    pub fn params(&self) -> MotionParams {
        MotionParams {
            algorithm: self.algo,
            stiffness: self.stiffness,
            damping: self.damping,
            decay: self.decay,
        }
    }

    /// Parse a configuration from TOML; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Render this configuration as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for FeatherConfig {
    fn default() -> Self {
        Self {
            value: 0.0,
            threshold: 0.0,
            stiffness: DEFAULT_STIFFNESS,
            damping: DEFAULT_DAMPING,
            algo: Algorithm::Spring,
            decay: DEFAULT_DECAY,
            epsilon: DEFAULT_EPSILON,
        }
    }
}
