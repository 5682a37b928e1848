//! Profile Sanitization
//!
//! Repairs learner state read back from external storage before any rating
//! math touches it. Storage writes are not transactionally guarded, so
//! partially written or corrupted records are expected here.
//!
//! Rules:
//! - Non-object input yields a default profile
//! - Malformed or non-positive ability falls back to the default rating,
//!   anything else is clamped onto the rating scale
//! - Malformed maps/sequences become empty, malformed entries are dropped
//!
//! Nothing in this module fails.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::types::{
    clamp_ability, ItemAttempt, LearnerProfile, ReviewCard, DEFAULT_ABILITY, INITIAL_EASINESS,
    MAX_INTERVAL_DAYS, MIN_EASINESS,
};

/// Build a structurally valid profile from arbitrary stored JSON
pub fn sanitize_profile(raw: &Value) -> LearnerProfile {
    let Some(obj) = raw.as_object() else {
        if !raw.is_null() {
            tracing::warn!(kind = value_kind(raw), "profile is not an object, using defaults");
        }
        return LearnerProfile::default();
    };

    LearnerProfile {
        user_id: sanitize_user_id(obj.get("userId")),
        overall_ability: sanitize_ability(obj.get("overallAbility")),
        topic_abilities: sanitize_topic_abilities(obj.get("topicAbilities")),
        topic_attempt_counts: sanitize_attempt_counts(obj.get("topicAttemptCounts")),
        item_history: sanitize_history(obj.get("itemHistory")),
        last_updated: obj.get("lastUpdated").and_then(parse_timestamp),
    }
}

/// Re-apply the rating bounds to a profile assembled in code. Profiles that
/// came through [`sanitize_profile`] pass through unchanged.
pub fn normalize_profile(profile: &LearnerProfile) -> LearnerProfile {
    let mut normalized = profile.clone();
    normalized.overall_ability = if profile.overall_ability > 0 {
        clamp_ability(profile.overall_ability as f64)
    } else {
        DEFAULT_ABILITY
    };
    normalized.topic_abilities.retain(|_, ability| *ability > 0);
    for ability in normalized.topic_abilities.values_mut() {
        *ability = clamp_ability(*ability as f64);
    }
    normalized
}

impl From<Value> for LearnerProfile {
    fn from(raw: Value) -> Self {
        sanitize_profile(&raw)
    }
}

fn sanitize_user_id(raw: Option<&Value>) -> String {
    match raw {
        Some(Value::String(id)) => id.clone(),
        Some(other) => {
            tracing::warn!(kind = value_kind(other), "userId is not a string");
            String::new()
        }
        None => String::new(),
    }
}

/// Stored rating -> valid rating. Non-numbers and values <= 0 reset to the
/// default; everything else is clamped.
pub fn sanitize_ability(raw: Option<&Value>) -> i32 {
    let Some(raw) = raw else {
        return DEFAULT_ABILITY;
    };
    match raw.as_f64() {
        Some(v) if v.is_finite() && v > 0.0 => clamp_ability(v),
        _ => {
            tracing::warn!(value = %raw, "malformed ability, resetting to default");
            DEFAULT_ABILITY
        }
    }
}

fn sanitize_topic_abilities(raw: Option<&Value>) -> HashMap<String, i32> {
    let Some(map) = expect_object(raw, "topicAbilities") else {
        return HashMap::new();
    };

    map.iter()
        .filter_map(|(topic, value)| match value.as_f64() {
            Some(v) if v.is_finite() && v > 0.0 => Some((topic.clone(), clamp_ability(v))),
            _ => {
                tracing::warn!(topic = %topic, value = %value, "dropping malformed topic ability");
                None
            }
        })
        .collect()
}

fn sanitize_attempt_counts(raw: Option<&Value>) -> HashMap<String, u32> {
    let Some(map) = expect_object(raw, "topicAttemptCounts") else {
        return HashMap::new();
    };

    map.iter()
        .filter_map(|(topic, value)| {
            let count = value.as_u64().or_else(|| {
                value
                    .as_f64()
                    .filter(|v| v.is_finite() && *v >= 0.0)
                    .map(|v| v.round() as u64)
            });
            match count {
                Some(c) => Some((topic.clone(), c.min(u32::MAX as u64) as u32)),
                None => {
                    tracing::warn!(topic = %topic, value = %value, "dropping malformed attempt count");
                    None
                }
            }
        })
        .collect()
}

fn sanitize_history(raw: Option<&Value>) -> Vec<ItemAttempt> {
    let items = match raw {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => {
            tracing::warn!(kind = value_kind(other), "itemHistory is not an array");
            return Vec::new();
        }
    };

    let history: Vec<ItemAttempt> = items.iter().filter_map(sanitize_attempt).collect();
    if history.len() < items.len() {
        tracing::warn!(
            dropped = items.len() - history.len(),
            "dropped malformed history entries"
        );
    }
    history
}

fn sanitize_attempt(raw: &Value) -> Option<ItemAttempt> {
    let obj = raw.as_object()?;
    let item_id = obj.get("itemId")?.as_str().filter(|id| !id.is_empty())?;
    let correct = obj.get("correct")?.as_bool()?;
    let timestamp = obj.get("timestamp").and_then(parse_timestamp)?;
    Some(ItemAttempt {
        item_id: item_id.to_string(),
        correct,
        timestamp,
    })
}

/// Repair a stored review card. Cards without an item id cannot be
/// scheduled and are dropped; a missing review time makes the card due `now`.
pub fn sanitize_card(raw: &Value, now: DateTime<Utc>) -> Option<ReviewCard> {
    let obj = raw.as_object()?;
    let item_id = match obj.get("itemId").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            tracing::warn!("dropping review card without itemId");
            return None;
        }
    };

    let interval = match obj.get("interval").and_then(Value::as_f64) {
        Some(days) if days.is_finite() => {
            if days > MAX_INTERVAL_DAYS as f64 {
                tracing::warn!(item_id = %item_id, interval = days, "interval above ceiling");
            }
            days.round().clamp(0.0, MAX_INTERVAL_DAYS as f64) as u32
        }
        _ => 0,
    };

    let easiness_factor = match obj.get("easinessFactor").and_then(Value::as_f64) {
        Some(ef) if ef.is_finite() => {
            if ef < MIN_EASINESS {
                tracing::warn!(item_id = %item_id, easiness = ef, "easiness below floor");
            }
            ef.max(MIN_EASINESS)
        }
        _ => INITIAL_EASINESS,
    };

    let next_review_at = obj
        .get("nextReviewAt")
        .and_then(parse_timestamp)
        .unwrap_or(now);

    let repetition_count = obj
        .get("repetitionCount")
        .and_then(Value::as_u64)
        .map(|c| c.min(u32::MAX as u64) as u32)
        .unwrap_or(0);

    Some(ReviewCard {
        item_id,
        interval,
        easiness_factor,
        next_review_at,
        repetition_count,
    })
}

/// Sanitize a stored array of cards, skipping unusable entries
pub fn sanitize_cards(raw: &Value, now: DateTime<Utc>) -> Vec<ReviewCard> {
    raw.as_array()
        .map(|items| items.iter().filter_map(|c| sanitize_card(c, now)).collect())
        .unwrap_or_default()
}

/// RFC 3339 strings or epoch milliseconds
pub fn parse_timestamp(raw: &Value) -> Option<DateTime<Utc>> {
    match raw {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn expect_object<'a>(raw: Option<&'a Value>, field: &str) -> Option<&'a Map<String, Value>> {
    match raw {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map),
        Some(other) => {
            tracing::warn!(field, kind = value_kind(other), "expected an object, using empty map");
            None
        }
    }
}

fn value_kind(raw: &Value) -> &'static str {
    match raw {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
