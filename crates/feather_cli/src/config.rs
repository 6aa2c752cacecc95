//! Motion settings shared by the CLI commands
//!
//! Settings come from an optional TOML file first; flags given on the command
//! line override individual fields.

use anyhow::{Context, Result};
use clap::Args;
use feather_animation::{Algorithm, FeatherConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Args, Debug)]
pub struct MotionArgs {
    /// TOML file with the scalar's configuration
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Integration algorithm (spring, decay)
    #[arg(short, long)]
    pub algo: Option<Algorithm>,

    /// Starting value
    #[arg(long, allow_negative_numbers = true)]
    pub from: Option<f64>,

    /// Target to animate toward
    #[arg(long, default_value = "100", allow_negative_numbers = true)]
    pub to: f64,

    /// Threshold whose crossings are reported
    #[arg(long, allow_negative_numbers = true)]
    pub threshold: Option<f64>,

    /// Spring stiffness
    #[arg(long)]
    pub stiffness: Option<f64>,

    /// Spring damping
    #[arg(long)]
    pub damping: Option<f64>,

    /// Decay rate
    #[arg(long)]
    pub decay: Option<f64>,

    /// Rest tolerance on distance and speed
    #[arg(long)]
    pub epsilon: Option<f64>,

    /// Apply the target after this many milliseconds instead of immediately
    #[arg(long)]
    pub delay_ms: Option<u64>,
}

impl MotionArgs {
    /// Load the configuration file, if any, and apply flag overrides
    pub fn resolve(&self) -> Result<FeatherConfig> {
        let config = match &self.config {
            Some(path) => load_config(path)?,
            None => FeatherConfig::default(),
        };

        Ok(self.apply(config))
    }

    fn apply(&self, mut config: FeatherConfig) -> FeatherConfig {
        if let Some(algo) = self.algo {
            config.algo = algo;
        }
        if let Some(from) = self.from {
            config.value = from;
        }
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(stiffness) = self.stiffness {
            config.stiffness = stiffness;
        }
        if let Some(damping) = self.damping {
            config.damping = damping;
        }
        if let Some(decay) = self.decay {
            config.decay = decay;
        }
        if let Some(epsilon) = self.epsilon {
            config.epsilon = epsilon;
        }
        config
    }

    pub fn delay(&self) -> Option<Duration> {
        self.delay_ms.map(Duration::from_millis)
    }
}

/// Read a [`FeatherConfig`] from a TOML file
pub fn load_config(path: &Path) -> Result<FeatherConfig> {
    if !path.exists() {
        anyhow::bail!("No configuration found at {}", path.display());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    FeatherConfig::from_toml_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> MotionArgs {
        MotionArgs {
            config: None,
            algo: None,
            from: None,
            to: 100.0,
            threshold: None,
            stiffness: None,
            damping: None,
            decay: None,
            epsilon: None,
            delay_ms: None,
        }
    }

    #[test]
    fn test_no_flags_keeps_defaults() {
        assert_eq!(args().resolve().unwrap(), FeatherConfig::default());
        assert_eq!(args().delay(), None);
    }

    #[test]
    fn test_flags_override_loaded_values() {
        let loaded = FeatherConfig::from_toml_str("value = 5.0\ndecay = 2.0").unwrap();
        let overrides = MotionArgs {
            algo: Some(Algorithm::Decay),
            from: Some(-10.0),
            epsilon: Some(0.5),
            delay_ms: Some(250),
            ..args()
        };

        let config = overrides.apply(loaded);
        assert_eq!(config.value, -10.0);
        assert_eq!(config.algo, Algorithm::Decay);
        assert_eq!(config.epsilon, 0.5);
        // Untouched by flags
        assert_eq!(config.decay, 2.0);
        assert_eq!(overrides.delay(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let missing = MotionArgs {
            config: Some(PathBuf::from("/nonexistent/feather.toml")),
            ..args()
        };
        assert!(missing.resolve().is_err());
    }
}
