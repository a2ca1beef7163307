//! Configuration file support for Lift.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/lift/config.toml`.

use crate::{Error, MovementPattern, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub progression: ProgressionConfig,

    #[serde(default)]
    pub prescription: PrescriptionConfig,

    #[serde(default)]
    pub exercises: ExercisesConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Session-to-session progression parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressionConfig {
    #[serde(default = "default_lower_body_increment")]
    pub lower_body_increment: f64,

    #[serde(default = "default_upper_body_increment")]
    pub upper_body_increment: f64,

    /// Consecutive missed sessions that trigger a deload (2-3)
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Fraction removed from the working weight on deload
    #[serde(default = "default_deload_fraction")]
    pub deload_fraction: f64,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            lower_body_increment: default_lower_body_increment(),
            upper_body_increment: default_upper_body_increment(),
            failure_threshold: default_failure_threshold(),
            deload_fraction: default_deload_fraction(),
        }
    }
}

/// Fallbacks for programmes that leave weight rules unset
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PrescriptionConfig {
    #[serde(default = "default_rounding_increment")]
    pub rounding_increment: f64,

    #[serde(default = "default_minimum_bar_weight")]
    pub minimum_bar_weight: f64,
}

impl Default for PrescriptionConfig {
    fn default() -> Self {
        Self {
            rounding_increment: default_rounding_increment(),
            minimum_bar_weight: default_minimum_bar_weight(),
        }
    }
}

/// Custom exercise definition
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CustomExercise {
    pub id: String,
    pub name: String,
    /// Inferred from the name when absent
    #[serde(default)]
    pub pattern: Option<MovementPattern>,
}

/// Exercise catalog configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ExercisesConfig {
    #[serde(default)]
    pub custom: Vec<CustomExercise>,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        PathBuf::from(home).join(".local/share")
    });
    base.join("lift")
}

fn default_lower_body_increment() -> f64 {
    5.0
}

fn default_upper_body_increment() -> f64 {
    2.5
}

fn default_failure_threshold() -> u32 {
    2
}

fn default_deload_fraction() -> f64 {
    0.1
}

fn default_rounding_increment() -> f64 {
    2.5
}

fn default_minimum_bar_weight() -> f64 {
    20.0
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
            PathBuf::from(home).join(".config")
        });
        base.join("lift").join("config.toml")
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        let p = &self.progression;
        if !(2..=3).contains(&p.failure_threshold) {
            return Err(Error::Config(format!(
                "progression.failure_threshold must be 2 or 3, got {}",
                p.failure_threshold
            )));
        }
        if !(p.deload_fraction > 0.0 && p.deload_fraction < 1.0) {
            return Err(Error::Config(format!(
                "progression.deload_fraction must be between 0 and 1, got {}",
                p.deload_fraction
            )));
        }
        if p.lower_body_increment < 0.0 || p.upper_body_increment < 0.0 {
            return Err(Error::Config("progression increments must not be negative".into()));
        }
        if self.prescription.rounding_increment <= 0.0 {
            return Err(Error::Config(format!(
                "prescription.rounding_increment must be positive, got {}",
                self.prescription.rounding_increment
            )));
        }
        Ok(())
    }

    /// Render as pretty TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, self.to_toml()?)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
