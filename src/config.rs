use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::types::{
    BASE_K_FACTOR, DEFAULT_CONFIDENCE, INITIAL_EASINESS, MATURE_INTERVAL_DAYS, MAX_INTERVAL_DAYS,
    MIN_EASINESS,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilityConfig {
    pub k_factor: f64,
    pub default_confidence: f64,
}

impl Default for AbilityConfig {
    fn default() -> Self {
        Self {
            k_factor: BASE_K_FACTOR,
            default_confidence: DEFAULT_CONFIDENCE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub initial_easiness: f64,
    pub min_easiness: f64,
    pub failure_penalty: f64,
    pub mature_interval_days: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_easiness: INITIAL_EASINESS,
            min_easiness: MIN_EASINESS,
            failure_penalty: 0.2,
            mature_interval_days: MATURE_INTERVAL_DAYS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Rating gap at which the match score reaches zero
    pub match_window: f64,
    /// Shortlist size as a multiple of the requested count
    pub oversample_factor: usize,
    /// Number of top remaining candidates each random pick draws from
    pub random_window: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            match_window: 50.0,
            oversample_factor: 2,
            random_window: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityConfig {
    pub goal_bonus: f64,
    pub error_weight: f64,
    pub remediation_scale: f64,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            goal_bonus: 0.5,
            error_weight: 0.2,
            remediation_scale: 200.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingConfig {
    pub fast_response_ms: u64,
    pub slow_response_ms: u64,
    pub low_confidence: f64,
    pub confidently_wrong: f64,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            fast_response_ms: 2000,
            slow_response_ms: 5000,
            low_confidence: 0.5,
            confidently_wrong: 0.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub ability: AbilityConfig,
    pub scheduler: SchedulerConfig,
    pub selector: SelectorConfig,
    pub priority: PriorityConfig,
    pub grading: GradingConfig,
    pub history_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ability: AbilityConfig::default(),
            scheduler: SchedulerConfig::default(),
            selector: SelectorConfig::default(),
            priority: PriorityConfig::default(),
            grading: GradingConfig::default(),
            history_limit: 50,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("LEARNER_K_FACTOR") {
            config.ability.k_factor = val.parse().unwrap_or(config.ability.k_factor);
        }
        if let Ok(val) = std::env::var("LEARNER_DEFAULT_CONFIDENCE") {
            config.ability.default_confidence =
                val.parse().unwrap_or(config.ability.default_confidence);
        }
        if let Ok(val) = std::env::var("LEARNER_HISTORY_LIMIT") {
            config.history_limit = val.parse().unwrap_or(config.history_limit);
        }
        if let Ok(val) = std::env::var("LEARNER_RANDOM_WINDOW") {
            config.selector.random_window = val.parse().unwrap_or(config.selector.random_window);
        }
        if let Ok(val) = std::env::var("LEARNER_MATURE_INTERVAL_DAYS") {
            config.scheduler.mature_interval_days =
                val.parse().unwrap_or(config.scheduler.mature_interval_days);
        }

        if let Err(err) = config.validate() {
            tracing::warn!(error = %err, "invalid engine config from env, using defaults");
            return Self::default();
        }
        config
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.ability.k_factor.is_finite() && self.ability.k_factor > 0.0) {
            return Err(EngineError::Config("ability.k_factor must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.ability.default_confidence) {
            return Err(EngineError::Config(
                "ability.default_confidence must be within [0, 1]".into(),
            ));
        }
        if !(self.scheduler.min_easiness >= MIN_EASINESS) {
            return Err(EngineError::Config(format!(
                "scheduler.min_easiness must be at least {MIN_EASINESS}"
            )));
        }
        if !(self.scheduler.initial_easiness >= self.scheduler.min_easiness) {
            return Err(EngineError::Config(
                "scheduler.initial_easiness must not be below min_easiness".into(),
            ));
        }
        if !(self.scheduler.failure_penalty >= 0.0) {
            return Err(EngineError::Config("scheduler.failure_penalty must be >= 0".into()));
        }
        if !(1..=MAX_INTERVAL_DAYS).contains(&self.scheduler.mature_interval_days) {
            return Err(EngineError::Config(format!(
                "scheduler.mature_interval_days must be within [1, {MAX_INTERVAL_DAYS}]"
            )));
        }
        if !(self.selector.match_window.is_finite() && self.selector.match_window > 0.0) {
            return Err(EngineError::Config("selector.match_window must be positive".into()));
        }
        if self.selector.oversample_factor == 0 || self.selector.random_window == 0 {
            return Err(EngineError::Config(
                "selector.oversample_factor and random_window must be > 0".into(),
            ));
        }
        if !(self.priority.remediation_scale > 0.0) {
            return Err(EngineError::Config("priority.remediation_scale must be positive".into()));
        }
        if self.grading.fast_response_ms > self.grading.slow_response_ms {
            return Err(EngineError::Config(
                "grading.fast_response_ms must not exceed slow_response_ms".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{"ability":{"k_factor":24},"history_limit":10}"#)
                .unwrap();
        assert_eq!(config.ability.k_factor, 24.0);
        assert_eq!(config.ability.default_confidence, DEFAULT_CONFIDENCE);
        assert_eq!(config.history_limit, 10);
        assert_eq!(config.selector.random_window, 3);
    }

    #[test]
    fn test_rejects_easiness_below_floor() {
        let err = EngineConfig::from_json_str(r#"{"scheduler":{"min_easiness":1.0}}"#);
        assert!(matches!(err, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            EngineConfig::from_json_str("{not json"),
            Err(EngineError::Json(_))
        ));
    }

    #[test]
    fn test_from_env_overrides_and_fallbacks() {
        // Single test owns every LEARNER_* variable so parallel tests never race on them
        std::env::set_var("LEARNER_K_FACTOR", "24");
        std::env::set_var("LEARNER_HISTORY_LIMIT", "12");
        let config = EngineConfig::from_env();
        assert_eq!(config.ability.k_factor, 24.0);
        assert_eq!(config.history_limit, 12);

        // Unparsable values keep the default for that field
        std::env::set_var("LEARNER_K_FACTOR", "abc");
        let config = EngineConfig::from_env();
        assert_eq!(config.ability.k_factor, BASE_K_FACTOR);
        assert_eq!(config.history_limit, 12);

        // Parsable but invalid values discard the whole overlay
        std::env::set_var("LEARNER_RANDOM_WINDOW", "0");
        let config = EngineConfig::from_env();
        assert_eq!(config.selector.random_window, 3);
        assert_eq!(config.history_limit, 50);
        assert!(config.validate().is_ok());

        for key in ["LEARNER_K_FACTOR", "LEARNER_HISTORY_LIMIT", "LEARNER_RANDOM_WINDOW"] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_rejects_mature_interval_beyond_ceiling() {
        let mut config = EngineConfig::default();
        config.scheduler.mature_interval_days = MAX_INTERVAL_DAYS + 1;
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_rejects_zero_window() {
        let mut config = EngineConfig::default();
        config.selector.random_window = 0;
        assert!(config.validate().is_err());
    }
}
