//! Ability Estimation
//!
//! Elo-style rating update from a single answered question. The K-factor is
//! scaled by the learner's reported confidence so that confident answers
//! move the rating further than hesitant ones.
//!
//! expected = 1 / (1 + 10^((difficulty - ability) / 400))
//! new      = ability + K * (1 + 0.5 * confidence) * (actual - expected)

use crate::types::{clamp_ability, BASE_K_FACTOR, DEFAULT_CONFIDENCE, ELO_SCALE};

/// Confidence-to-K amplification
const CONFIDENCE_K_WEIGHT: f64 = 0.5;

/// Probability that a learner at `ability` answers an item of `difficulty`
/// correctly
pub fn expected_score(ability: f64, difficulty: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((difficulty - ability) / ELO_SCALE))
}

/// K-factor scaled by answer confidence; exactly `base_k` at confidence 0
pub fn adjusted_k(base_k: f64, confidence: f64) -> f64 {
    base_k * (1.0 + normalize_confidence(confidence) * CONFIDENCE_K_WEIGHT)
}

/// Updated rating after one answer, using the base K-factor
pub fn update_ability(current: i32, correct: bool, item_difficulty: f64, confidence: f64) -> i32 {
    update_ability_with_k(current, correct, item_difficulty, confidence, BASE_K_FACTOR)
}

/// [`update_ability`] with the default answer confidence
pub fn update_ability_default(current: i32, correct: bool, item_difficulty: f64) -> i32 {
    update_ability(current, correct, item_difficulty, DEFAULT_CONFIDENCE)
}

/// Updated rating with an explicit base K-factor.
///
/// The result is always on the rating scale, even when `current` itself is
/// out of range.
pub fn update_ability_with_k(
    current: i32,
    correct: bool,
    item_difficulty: f64,
    confidence: f64,
    base_k: f64,
) -> i32 {
    let ability = current as f64;
    let expected = expected_score(ability, item_difficulty);
    let actual = if correct { 1.0 } else { 0.0 };
    let k = adjusted_k(base_k, confidence);

    let delta = k * (actual - expected);
    if !delta.is_finite() {
        return clamp_ability(ability);
    }
    clamp_ability(ability + delta)
}

fn normalize_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        DEFAULT_CONFIDENCE
    } else {
        confidence.clamp(0.0, 1.0)
    }
}
