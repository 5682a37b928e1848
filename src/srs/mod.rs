//! Spaced-Repetition Scheduling
//!
//! SM-2 review state machine over [`ReviewCard`]s.
//!
//! - Success (grade >= 3): interval 0 -> 1 -> 6 -> round(interval * EF),
//!   EF' = EF + 0.1 - (5 - g) * (0.08 + (5 - g) * 0.02)
//! - Failure (grade < 3): interval resets to 1, EF' = EF - 0.2
//!
//! EF never drops below 1.3 and intervals never exceed
//! [`MAX_INTERVAL_DAYS`]. Cards cycle forever; retiring an item is the
//! caller's decision.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{GradingConfig, SchedulerConfig};
use crate::error::{EngineError, Result};
use crate::types::{AttemptRecord, CardState, ReviewCard, DEFAULT_CONFIDENCE, MAX_INTERVAL_DAYS};

/// Recall quality on the SM-2 scale `0..=5`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Grade(u8);

impl Grade {
    pub const MAX: u8 = 5;
    /// Lowest grade that counts as successful recall
    pub const PASS: u8 = 3;

    pub fn new(value: u8) -> Result<Self> {
        if value > Self::MAX {
            return Err(EngineError::InvalidGrade(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_success(self) -> bool {
        self.0 >= Self::PASS
    }
}

impl TryFrom<u8> for Grade {
    type Error = EngineError;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Grade> for u8 {
    fn from(grade: Grade) -> Self {
        grade.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardMetrics {
    pub total_cards: usize,
    pub due_cards: usize,
    pub new_cards: usize,
    pub learning_cards: usize,
    pub mature_cards: usize,
    pub avg_easiness: f64,
    pub avg_interval: f64,
}

// ==================== Transitions ====================

/// Easiness after a review with `grade`, floored at `min_easiness`
pub fn next_easiness(easiness: f64, grade: Grade, config: &SchedulerConfig) -> f64 {
    let next = if grade.is_success() {
        let miss = (Grade::MAX - grade.value()) as f64;
        easiness + (0.1 - miss * (0.08 + miss * 0.02))
    } else {
        easiness - config.failure_penalty
    };
    next.max(config.min_easiness)
}

/// Interval in days after a review with `grade`, capped at
/// [`MAX_INTERVAL_DAYS`]
pub fn next_interval(interval: u32, easiness: f64, grade: Grade) -> u32 {
    if !grade.is_success() {
        return 1;
    }
    match interval {
        0 => 1,
        1 => 6,
        i => (i as f64 * easiness)
            .round()
            .min(MAX_INTERVAL_DAYS as f64) as u32,
    }
}

/// `now` plus `interval` days, saturating at the latest representable time
pub fn review_time(now: DateTime<Utc>, interval: u32) -> DateTime<Utc> {
    now.checked_add_signed(Duration::days(i64::from(interval)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Apply one review with the default scheduler parameters
pub fn review_card(card: &ReviewCard, grade: Grade, now: DateTime<Utc>) -> ReviewCard {
    review_card_with(card, grade, now, &SchedulerConfig::default())
}

/// Apply one review. The next interval grows from the card's easiness
/// before this review is folded in.
pub fn review_card_with(
    card: &ReviewCard,
    grade: Grade,
    now: DateTime<Utc>,
    config: &SchedulerConfig,
) -> ReviewCard {
    let current_easiness = card.easiness_factor.max(config.min_easiness);
    let interval = next_interval(card.interval, current_easiness, grade);
    let easiness_factor = next_easiness(current_easiness, grade, config);
    let repetition_count = if grade.is_success() {
        card.repetition_count.saturating_add(1)
    } else {
        0
    };

    ReviewCard {
        item_id: card.item_id.clone(),
        interval,
        easiness_factor,
        next_review_at: review_time(now, interval),
        repetition_count,
    }
}

/// Map an answered attempt onto a grade when the caller supplied none.
///
/// Wrong answers grade 1, or 0 when given with high confidence. Right
/// answers grade 3 when hesitant or slow, 5 when fast, 4 otherwise.
pub fn derive_grade(attempt: &AttemptRecord, config: &GradingConfig) -> Grade {
    let confidence = attempt.confidence_or(DEFAULT_CONFIDENCE);
    let value = if !attempt.correct {
        if confidence >= config.confidently_wrong {
            0
        } else {
            1
        }
    } else if confidence < config.low_confidence
        || attempt.response_time_ms > config.slow_response_ms
    {
        3
    } else if attempt.response_time_ms > 0 && attempt.response_time_ms <= config.fast_response_ms
    {
        5
    } else {
        4
    };
    Grade(value)
}

// ==================== Queries ====================

/// Cards whose review time has arrived, most overdue first. Equal times
/// order by item id.
pub fn due_cards(cards: &[ReviewCard], now: DateTime<Utc>) -> Vec<&ReviewCard> {
    let mut due: Vec<&ReviewCard> = cards.iter().filter(|c| c.is_due(now)).collect();
    due.sort_by(|a, b| {
        a.next_review_at
            .cmp(&b.next_review_at)
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
    due
}

pub fn metrics(cards: &[ReviewCard], now: DateTime<Utc>) -> CardMetrics {
    metrics_with(cards, now, &SchedulerConfig::default())
}

pub fn metrics_with(
    cards: &[ReviewCard],
    now: DateTime<Utc>,
    config: &SchedulerConfig,
) -> CardMetrics {
    if cards.is_empty() {
        return CardMetrics::default();
    }

    let mut metrics = CardMetrics {
        total_cards: cards.len(),
        ..CardMetrics::default()
    };
    let mut easiness_sum = 0.0;
    let mut interval_sum = 0.0;

    for card in cards {
        if card.is_due(now) {
            metrics.due_cards += 1;
        }
        match card.state_with(config.mature_interval_days) {
            CardState::New => metrics.new_cards += 1,
            CardState::Learning => metrics.learning_cards += 1,
            CardState::Mature => metrics.mature_cards += 1,
        }
        easiness_sum += card.easiness_factor;
        interval_sum += card.interval as f64;
    }

    let n = cards.len() as f64;
    metrics.avg_easiness = easiness_sum / n;
    metrics.avg_interval = interval_sum / n;
    metrics
}
