// crates/mana-tracker/src/config.rs
//
// Runtime configuration for mana tracking.
// Loaded from a TOML file or populated with sensible defaults.

use std::fs;

use serde::Deserialize;

use mana_balance::{HalfLifeCalculator, RetentionPolicy};
use mana_core::ManaError;

/// Top-level mana configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ManaConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub calculator: CalculatorConfig,

    #[serde(default)]
    pub retention: RetentionConfig,
}

/// Parameters of the half-life calculator.
#[derive(Debug, Clone, Deserialize)]
pub struct CalculatorConfig {
    /// Time units for a balance to halve. Omit to disable erosion.
    #[serde(default)]
    pub half_life: Option<u64>,

    /// Mana per coin per time unit is numerator / denominator.
    #[serde(default = "default_generation_numerator")]
    pub generation_numerator: u64,

    #[serde(default = "default_generation_denominator")]
    pub generation_denominator: u64,
}

/// History retention. No horizon keeps every entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetentionConfig {
    /// Time units of history kept behind the newest transfer.
    #[serde(default)]
    pub horizon: Option<u64>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_generation_numerator() -> u64 {
    1
}

fn default_generation_denominator() -> u64 {
    1
}

impl Default for ManaConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            calculator: CalculatorConfig::default(),
            retention: RetentionConfig::default(),
        }
    }
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            half_life: None,
            generation_numerator: default_generation_numerator(),
            generation_denominator: default_generation_denominator(),
        }
    }
}

impl ManaConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// # Errors
    /// Returns `ManaError::Config` if the file cannot be read, parsed, or
    /// fails validation.
    pub fn load(path: &str) -> Result<Self, ManaError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ManaError::Config(format!("cannot read {}: {}", path, e)))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ManaError> {
        let config: ManaConfig =
            toml::from_str(contents).map_err(|e| ManaError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ManaError> {
        if self.calculator.generation_denominator == 0 {
            return Err(ManaError::Config(
                "calculator.generation_denominator must be non-zero".to_string(),
            ));
        }
        if self.calculator.half_life == Some(0) {
            return Err(ManaError::Config(
                "calculator.half_life must be positive; omit it to disable erosion".to_string(),
            ));
        }
        Ok(())
    }

    pub fn build_calculator(&self) -> Result<HalfLifeCalculator, ManaError> {
        HalfLifeCalculator::new(
            self.calculator.half_life,
            self.calculator.generation_numerator,
            self.calculator.generation_denominator,
        )
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        match self.retention.horizon {
            Some(horizon) => RetentionPolicy::Horizon(horizon),
            None => RetentionPolicy::Unbounded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config = ManaConfig::from_toml_str("").unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.calculator.half_life, None);
        assert_eq!(config.calculator.generation_denominator, 1);
        assert_eq!(config.retention_policy(), RetentionPolicy::Unbounded);
    }

    #[test]
    fn test_full_toml() {
        let toml = r#"
            log_level = "debug"

            [calculator]
            half_life = 600
            generation_numerator = 3
            generation_denominator = 4

            [retention]
            horizon = 3600
        "#;
        let config = ManaConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.calculator.half_life, Some(600));
        assert_eq!(config.calculator.generation_numerator, 3);
        assert_eq!(config.retention_policy(), RetentionPolicy::Horizon(3600));
        assert_eq!(config.build_calculator().unwrap().half_life(), Some(600));
    }

    #[test]
    fn test_zero_denominator_rejected() {
        let toml = "[calculator]\ngeneration_denominator = 0\n";
        assert!(matches!(
            ManaConfig::from_toml_str(toml),
            Err(ManaError::Config(_))
        ));
    }

    #[test]
    fn test_zero_half_life_rejected() {
        let toml = "[calculator]\nhalf_life = 0\n";
        assert!(ManaConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn test_malformed_toml_rejected() {
        assert!(ManaConfig::from_toml_str("log_level = [").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = ManaConfig::load("/nonexistent/mana.toml").unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
