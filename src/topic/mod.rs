//! Topic Ability Aggregation
//!
//! Per-topic ratings plus an overall rating derived from them, weighted by
//! how many attempts each topic has seen.

use std::collections::HashMap;

use crate::types::{clamp_ability, LearnerProfile, DEFAULT_ABILITY};

/// Copy of the profile's topic ratings with `topic` set to `new_ability`.
/// The profile itself is left untouched.
pub fn record_topic_ability(
    profile: &LearnerProfile,
    topic: &str,
    new_ability: i32,
) -> HashMap<String, i32> {
    let mut abilities = profile.topic_abilities.clone();
    abilities.insert(topic.to_string(), clamp_ability(new_ability as f64));
    abilities
}

/// Attempt-weighted mean of the topic ratings.
///
/// Each topic weighs `max(1, attempts)`; an empty map yields the default
/// rating.
pub fn overall_ability(
    topic_abilities: &HashMap<String, i32>,
    attempt_counts: &HashMap<String, u32>,
) -> i32 {
    if topic_abilities.is_empty() {
        return DEFAULT_ABILITY;
    }

    let (weighted_sum, total_weight) =
        topic_abilities
            .iter()
            .fold((0i64, 0i64), |(sum, weight), (topic, &ability)| {
                let w = attempt_counts.get(topic).copied().unwrap_or(0).max(1) as i64;
                (sum + ability as i64 * w, weight + w)
            });

    clamp_ability(weighted_sum as f64 / total_weight as f64)
}

/// Rating for `topic`; unseen topics inherit `fallback` (normally the
/// learner's overall rating) so a new topic starts at a sensible level.
pub fn topic_ability(topic_abilities: &HashMap<String, i32>, topic: &str, fallback: i32) -> i32 {
    topic_abilities.get(topic).copied().unwrap_or(fallback)
}

/// Unweighted mean of all topic ratings
pub fn mean_topic_ability(topic_abilities: &HashMap<String, i32>) -> Option<f64> {
    if topic_abilities.is_empty() {
        return None;
    }
    let sum: i64 = topic_abilities.values().map(|&a| a as i64).sum();
    Some(sum as f64 / topic_abilities.len() as f64)
}
