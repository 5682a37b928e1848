//! Performance Prediction
//!
//! Success probability for a learner/item pair and a rough estimate of how
//! many sessions remain until a target rating is reached.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ability::expected_score;
use crate::types::MIN_CONFIDENCE;

/// Gap at which prediction confidence would reach zero before flooring
const CONFIDENCE_GAP_SCALE: f64 = 800.0;

/// Assumed rating gain per session without progress samples
const DEFAULT_SESSION_PROGRESS: f64 = 10.0;

/// Gap at which mastery confidence would reach zero before flooring
const MASTERY_GAP_SCALE: f64 = 1000.0;

/// Progress variance at which mastery confidence would reach zero
const MASTERY_VARIANCE_SCALE: f64 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Probability of a correct answer, (0, 1)
    pub probability: f64,
    /// Confidence in the probability, [0.1, 1]
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MasteryEstimate {
    pub sessions: u32,
    pub confidence: f64,
}

/// Logistic success probability on the Elo scale (base 10, 400 points per
/// decade of odds); confidence shrinks linearly with the rating gap.
pub fn predict(ability: f64, difficulty: f64) -> Prediction {
    let probability = expected_score(ability, difficulty);

    let gap = (ability - difficulty).abs();
    let confidence = (1.0 - gap / CONFIDENCE_GAP_SCALE).max(MIN_CONFIDENCE);

    Prediction {
        probability,
        confidence,
    }
}

/// Predictions for many items at once
pub fn predict_batch(ability: f64, difficulties: &[f64]) -> Vec<Prediction> {
    difficulties
        .par_iter()
        .map(|&difficulty| predict(ability, difficulty))
        .collect()
}

/// Sessions needed to climb from `current` to `target`.
///
/// `recent_progress` holds per-session rating gains. Noisy progress and a
/// wide gap both lower the confidence.
pub fn estimate_sessions_to_mastery(
    current: f64,
    target: f64,
    recent_progress: &[f64],
) -> MasteryEstimate {
    if target <= current {
        return MasteryEstimate {
            sessions: 0,
            confidence: 1.0,
        };
    }

    let samples: Vec<f64> = recent_progress
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .collect();

    let (mean, variance) = if samples.is_empty() {
        (DEFAULT_SESSION_PROGRESS, 0.0)
    } else {
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let variance = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        (mean, variance)
    };

    let gap = target - current;
    let progress = mean.max(1.0);
    let sessions = (gap / progress).ceil().min(u32::MAX as f64) as u32;

    let confidence = (1.0 - gap / MASTERY_GAP_SCALE - variance / MASTERY_VARIANCE_SCALE)
        .max(MIN_CONFIDENCE);

    MasteryEstimate {
        sessions,
        confidence,
    }
}
