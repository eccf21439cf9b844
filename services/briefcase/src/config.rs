use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::reasoning::{CaseBaseConfig, Policy, Tolerance};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default)]
    pub case_base: CaseBaseConfig,
    #[serde(default)]
    pub admission: AdmissionConfig,
    #[serde(default)]
    pub experiment: ExperimentConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdmissionConfig {
    #[serde(default)]
    pub policy: Policy,
    #[serde(default)]
    pub tolerance: Tolerance,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentConfig {
    #[serde(default = "default_repeats")]
    pub repeats: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Share of the power ceiling, in percent, a case may reach to be kept
    #[serde(default = "default_power_percent")]
    pub power_percent: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            case_base: CaseBaseConfig::default(),
            admission: AdmissionConfig::default(),
            experiment: ExperimentConfig::default(),
        }
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            policy: Policy::default(),
            tolerance: Tolerance::default(),
        }
    }
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            repeats: default_repeats(),
            seed: default_seed(),
            power_percent: default_power_percent(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config from {:?}", path.as_ref()))?;
        let config: Config = toml::from_str(&content)
            .context("Failed to parse config TOML")?;
        Ok(config)
    }

    /// Load from `path` when given, defaults otherwise
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_repeats() -> usize {
    50
}

fn default_seed() -> u64 {
    42
}

fn default_power_percent() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_load() {
        let config = Config::load("../../config/briefcase.toml").unwrap();
        assert_eq!(config.data_dir, "data");
        assert!(config.experiment.repeats > 0);
        assert!(config.case_base.allow_empty_side);
    }

    #[test]
    fn test_config_defaults() {
        let toml_str = r#"
data_dir = "test_data"
[case_base]
[admission]
policy = "NO_CORRUPTION"
[experiment]
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.data_dir, "test_data");
        assert_eq!(config.admission.policy, Policy::NoCorruption);
        assert_eq!(config.admission.tolerance, Tolerance::Strict);
        assert_eq!(config.experiment.repeats, 50);
        assert_eq!(config.experiment.seed, 42);
        assert!(config.case_base.allow_empty_side);
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.data_dir, "data");
        assert_eq!(config.admission.policy, Policy::All);
        assert!((config.experiment.power_percent - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_bad_policy_name() {
        let toml_str = r#"
[admission]
policy = "LENIENT"
"#;
        assert!(toml::from_str::<Config>(toml_str).is_err());
    }

    #[test]
    fn test_load_or_default() {
        let config = Config::load_or_default(None::<&str>).unwrap();
        assert_eq!(config.experiment.seed, 42);
        assert!(Config::load_or_default(Some("missing/briefcase.toml")).is_err());
    }
}
