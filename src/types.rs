//! Common Types and Constants
//!
//! The learner data model shared by every module. Persisted shapes use
//! camelCase field names so stored records round-trip unchanged.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

// ==================== Constants ====================

/// Lower bound of the shared rating scale
pub const MIN_ABILITY: i32 = 800;

/// Upper bound of the shared rating scale
pub const MAX_ABILITY: i32 = 2400;

/// Rating assigned to learners without history
pub const DEFAULT_ABILITY: i32 = 1500;

/// Answer confidence assumed when the caller does not report one
pub const DEFAULT_CONFIDENCE: f64 = 0.7;

/// Base Elo K-factor
pub const BASE_K_FACTOR: f64 = 32.0;

/// Rating difference that shifts the odds by a factor of ten
pub const ELO_SCALE: f64 = 400.0;

/// SM-2 starting easiness
pub const INITIAL_EASINESS: f64 = 2.5;

/// SM-2 easiness floor
pub const MIN_EASINESS: f64 = 1.3;

/// Interval (days) at which a card counts as mature
pub const MATURE_INTERVAL_DAYS: u32 = 21;

/// Longest interval (days) the scheduler hands out or accepts from storage
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

/// Topic that answers without a topic are aggregated under
pub const GENERAL_TOPIC: &str = "general";

/// Floor for every confidence value the predictor reports
pub const MIN_CONFIDENCE: f64 = 0.1;

/// Round half away from zero and clamp onto the rating scale.
///
/// NaN maps to [`DEFAULT_ABILITY`]; infinities clamp to the nearest bound.
pub fn clamp_ability(value: f64) -> i32 {
    if value.is_nan() {
        return DEFAULT_ABILITY;
    }
    value
        .round()
        .clamp(MIN_ABILITY as f64, MAX_ABILITY as f64) as i32
}

// ==================== Learner Profile ====================

/// One answered item in a learner's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemAttempt {
    pub item_id: String,
    pub correct: bool,
    pub timestamp: DateTime<Utc>,
}

/// Validated learner ability record.
///
/// Deserialization always goes through [`crate::sanitize::sanitize_profile`],
/// so a `LearnerProfile` obtained from stored JSON is structurally valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "serde_json::Value")]
pub struct LearnerProfile {
    pub user_id: String,
    /// Always within `[MIN_ABILITY, MAX_ABILITY]`
    pub overall_ability: i32,
    /// Absent topics mean "no history"
    pub topic_abilities: HashMap<String, i32>,
    pub topic_attempt_counts: HashMap<String, u32>,
    /// Append-only, oldest first
    pub item_history: Vec<ItemAttempt>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Default for LearnerProfile {
    fn default() -> Self {
        Self {
            user_id: String::new(),
            overall_ability: DEFAULT_ABILITY,
            topic_abilities: HashMap::new(),
            topic_attempt_counts: HashMap::new(),
            item_history: Vec::new(),
            last_updated: None,
        }
    }
}

impl LearnerProfile {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    /// The newest `limit` attempts, oldest first
    pub fn recent_history(&self, limit: usize) -> &[ItemAttempt] {
        let start = self.item_history.len().saturating_sub(limit);
        &self.item_history[start..]
    }

    /// Rating for `topic`, inheriting the overall rating for unseen topics
    pub fn topic_ability(&self, topic: &str) -> i32 {
        crate::topic::topic_ability(&self.topic_abilities, topic, self.overall_ability)
    }
}

// ==================== Review Cards ====================

/// Classification derived from a card's interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardState {
    New,
    Learning,
    Mature,
}

/// Spaced-repetition state for one learner x item pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCard {
    pub item_id: String,
    /// Days until the next review; 0 means the card is new
    pub interval: u32,
    /// Never below [`MIN_EASINESS`]
    pub easiness_factor: f64,
    pub next_review_at: DateTime<Utc>,
    pub repetition_count: u32,
}

impl ReviewCard {
    /// Fresh card, due immediately
    pub fn new(item_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            item_id: item_id.into(),
            interval: 0,
            easiness_factor: INITIAL_EASINESS,
            next_review_at: now,
            repetition_count: 0,
        }
    }

    pub fn state(&self) -> CardState {
        self.state_with(MATURE_INTERVAL_DAYS)
    }

    pub fn state_with(&self, mature_interval_days: u32) -> CardState {
        match self.interval {
            0 => CardState::New,
            i if i < mature_interval_days => CardState::Learning,
            _ => CardState::Mature,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_at <= now
    }
}

// ==================== Questions & Attempts ====================

/// A question offered to the selector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionCandidate {
    pub id: String,
    pub topic: String,
    /// Same scale as learner ability
    pub difficulty: f64,
}

impl QuestionCandidate {
    pub fn new(id: impl Into<String>, topic: impl Into<String>, difficulty: f64) -> Self {
        Self {
            id: id.into(),
            topic: topic.into(),
            difficulty,
        }
    }
}

/// An answered question as reported by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub item_id: String,
    #[serde(default)]
    pub topic: Option<String>,
    pub correct: bool,
    pub item_difficulty: f64,
    /// `[0, 1]`; [`DEFAULT_CONFIDENCE`] when absent
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub response_time_ms: u64,
    /// Explicit SM-2 grade; derived from the answer when absent
    #[serde(default)]
    pub grade: Option<u8>,
    /// Create a review card if the item has none yet
    #[serde(default)]
    pub schedule_review: bool,
}

impl AttemptRecord {
    pub fn new(item_id: impl Into<String>, correct: bool, item_difficulty: f64) -> Self {
        Self {
            item_id: item_id.into(),
            topic: None,
            correct,
            item_difficulty,
            confidence: None,
            response_time_ms: 0,
            grade: None,
            schedule_review: false,
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_response_time(mut self, response_time_ms: u64) -> Self {
        self.response_time_ms = response_time_ms;
        self
    }

    pub fn with_grade(mut self, grade: u8) -> Self {
        self.grade = Some(grade);
        self
    }

    pub fn with_review(mut self) -> Self {
        self.schedule_review = true;
        self
    }

    pub fn confidence_or(&self, default: f64) -> f64 {
        self.confidence.unwrap_or(default)
    }

    /// Reject malformed call-site arguments
    pub fn validate(&self) -> Result<()> {
        if self.item_id.trim().is_empty() {
            return Err(EngineError::Validation("itemId is required".to_string()));
        }
        if !self.item_difficulty.is_finite() {
            return Err(EngineError::Validation(format!(
                "itemDifficulty must be a finite number, got {}",
                self.item_difficulty
            )));
        }
        if let Some(confidence) = self.confidence {
            if !(0.0..=1.0).contains(&confidence) {
                return Err(EngineError::Validation(format!(
                    "confidence must be within [0, 1], got {confidence}"
                )));
            }
        }
        if let Some(topic) = &self.topic {
            if topic.trim().is_empty() {
                return Err(EngineError::Validation("topic must not be blank".to_string()));
            }
        }
        if let Some(grade) = self.grade {
            if grade > 5 {
                return Err(EngineError::InvalidGrade(grade));
            }
        }
        Ok(())
    }
}
