//! Runtime configuration.
//!
//! Every field has a default equal to the crate-level constant, so an empty
//! TOML file (or none at all) yields the stock behaviour.

use std::path::Path;

use serde::Deserialize;

use crate::types::QualityCriteria;
use crate::{
    Error, Result, ACCEPT_CONFIDENCE, ANALYSIS_INTERVAL_MS, ELO_K_FACTOR, EMA_WEIGHT, INITIAL_ELO,
    LIVE_THRESHOLD, LOW_CONFIDENCE_FLOOR, READY_PASS_COUNT,
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub verification: VerificationConfig,
    pub liveness: LivenessConfig,
    pub rating: RatingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `"info"` or `"debug,photorank=trace"`
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    pub ready_pass_count: u32,
    pub ema_weight: f64,
    pub analysis_interval_ms: u64,
    pub criteria: QualityCriteria,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            ready_pass_count: READY_PASS_COUNT,
            ema_weight: EMA_WEIGHT,
            analysis_interval_ms: ANALYSIS_INTERVAL_MS,
            criteria: QualityCriteria::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LivenessConfig {
    pub live_threshold: f64,
    pub accept_confidence: f64,
    pub low_confidence_floor: f64,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            live_threshold: LIVE_THRESHOLD,
            accept_confidence: ACCEPT_CONFIDENCE,
            low_confidence_floor: LOW_CONFIDENCE_FLOOR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    pub k_factor: f64,
    pub initial_elo: i32,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            k_factor: ELO_K_FACTOR,
            initial_elo: INITIAL_ELO,
        }
    }
}

impl Config {
    /// Parse from a TOML string and validate
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Config = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let v = &self.verification;
        if !(v.ema_weight > 0.0 && v.ema_weight <= 1.0) {
            return Err(Error::Config(format!("ema_weight must be in (0, 1], got {}", v.ema_weight)));
        }
        if v.ready_pass_count == 0 {
            return Err(Error::Config("ready_pass_count must be at least 1".to_string()));
        }
        let c = &v.criteria;
        for (name, value) in [
            ("face_area_min", c.face_area_min),
            ("face_area_max", c.face_area_max),
            ("sharpness_min", c.sharpness_min),
            ("brightness_min", c.brightness_min),
            ("brightness_max", c.brightness_max),
            ("contrast_min", c.contrast_min),
            ("eye_openness_min", c.eye_openness_min),
        ] {
            unit_interval(name, value)?;
        }
        if !(c.pose_deviation_max.is_finite() && c.pose_deviation_max >= 0.0) {
            return Err(Error::Config(format!(
                "pose_deviation_max must be a non-negative number of degrees, got {}",
                c.pose_deviation_max
            )));
        }
        if c.face_area_min > c.face_area_max {
            return Err(Error::Config("face_area_min exceeds face_area_max".to_string()));
        }
        if c.brightness_min > c.brightness_max {
            return Err(Error::Config("brightness_min exceeds brightness_max".to_string()));
        }

        let l = &self.liveness;
        unit_interval("live_threshold", l.live_threshold)?;
        unit_interval("low_confidence_floor", l.low_confidence_floor)?;
        unit_interval("accept_confidence", l.accept_confidence)?;
        if l.low_confidence_floor > l.accept_confidence {
            return Err(Error::Config("low_confidence_floor exceeds accept_confidence".to_string()));
        }

        if !(self.rating.k_factor > 0.0) {
            return Err(Error::Config(format!("k_factor must be positive, got {}", self.rating.k_factor)));
        }
        Ok(())
    }
}

fn unit_interval(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::Config(format!("{} must be in [0, 1], got {}", name, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.verification.ready_pass_count, 3);
        assert_eq!(config.verification.analysis_interval_ms, 100);
        assert_eq!(config.rating.k_factor, 32.0);
        assert_eq!(config.rating.initial_elo, 1000);
        assert_eq!(config.server.addr, "127.0.0.1:3000");
    }

    #[test]
    fn test_partial_override() {
        let raw = r#"
            [verification]
            ready_pass_count = 5

            [verification.criteria]
            sharpness_min = 0.7

            [rating]
            k_factor = 24.0
        "#;
        let config = Config::from_toml_str(raw).unwrap();
        assert_eq!(config.verification.ready_pass_count, 5);
        assert_eq!(config.verification.criteria.sharpness_min, 0.7);
        assert_eq!(config.verification.criteria.face_area_min, 0.15);
        assert_eq!(config.rating.k_factor, 24.0);
    }

    #[test]
    fn test_sample_file_matches_defaults() {
        let config = Config::load(concat!(env!("CARGO_MANIFEST_DIR"), "/photorank.toml")).unwrap();
        assert_eq!(config.verification, VerificationConfig::default());
        assert_eq!(config.liveness, LivenessConfig::default());
        assert_eq!(config.rating, RatingConfig::default());
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(Config::from_toml_str("[verification]\nema_weight = 0.0").is_err());
        assert!(Config::from_toml_str("[liveness]\nlow_confidence_floor = 0.9").is_err());
        assert!(Config::from_toml_str("[rating]\nk_factor = -1.0").is_err());
        assert!(Config::from_toml_str("[verification.criteria]\nface_area_min = 0.9").is_err());
    }

    #[test]
    fn test_rejects_thresholds_outside_their_range() {
        for raw in [
            "[liveness]\nlive_threshold = 1.5",
            "[liveness]\nlive_threshold = -0.1",
            "[verification.criteria]\nsharpness_min = -0.1",
            "[verification.criteria]\ncontrast_min = 1.2",
            "[verification.criteria]\neye_openness_min = 2.0",
            "[verification.criteria]\nbrightness_max = 1.5",
            "[verification.criteria]\npose_deviation_max = -5.0",
            "[verification.criteria]\npose_deviation_max = inf",
        ] {
            assert!(Config::from_toml_str(raw).is_err(), "accepted {:?}", raw);
        }
        let edges = "[liveness]\nlive_threshold = 1.0\n[verification.criteria]\npose_deviation_max = 0.0";
        assert!(Config::from_toml_str(edges).is_ok());
    }
}
