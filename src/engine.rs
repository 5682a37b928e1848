//! Engine entry points used by the request-serving layer.
//!
//! Every call takes learner state by value or reference and returns the
//! updated state; nothing is cached between calls. Callers must serialize
//! `record_answer` per learner (read-modify-write in one transaction), while
//! the read paths can run concurrently against a snapshot.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ability::update_ability_with_k;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::predict::{estimate_sessions_to_mastery, predict, MasteryEstimate, Prediction};
use crate::sanitize::normalize_profile;
use crate::selector::{
    select_questions_with, topic_priority_with, ScoredCandidate, SuggestedAction,
};
use crate::srs::{derive_grade, due_cards, metrics_with, review_card_with, CardMetrics, Grade};
use crate::topic::{overall_ability, record_topic_ability};
use crate::types::{
    AttemptRecord, ItemAttempt, LearnerProfile, QuestionCandidate, ReviewCard, GENERAL_TOPIC,
};

/// Result of folding one answer into learner state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
    pub profile: LearnerProfile,
    /// Updated card when the item is under spaced review
    pub card: Option<ReviewCard>,
    /// Rating of the answered topic (the general topic when untopical)
    pub ability_before: i32,
    pub ability_after: i32,
    pub grade: Option<Grade>,
}

impl AnswerOutcome {
    pub fn ability_delta(&self) -> i32 {
        self.ability_after - self.ability_before
    }
}

#[derive(Debug, Clone, Default)]
pub struct NextItemsRequest {
    pub count: usize,
    /// Restrict candidates (and the matching rating) to one topic
    pub topic_filter: Option<String>,
    /// Ids the caller does not want served again
    pub exclude_ids: HashSet<String>,
}

impl NextItemsRequest {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            ..Self::default()
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic_filter = Some(topic.into());
        self
    }

    pub fn excluding<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_ids.extend(ids.into_iter().map(Into::into));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextItem {
    #[serde(flatten)]
    pub question: ScoredCandidate,
    pub prediction: Prediction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextItems {
    pub items: Vec<NextItem>,
    /// Rating the pool was matched against
    pub target_ability: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_recommendation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<SuggestedAction>,
}

#[derive(Debug, Clone, Default)]
pub struct AdaptiveEngine {
    config: EngineConfig,
}

impl AdaptiveEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn from_env() -> Self {
        Self {
            config: EngineConfig::from_env(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ==================== Write Path ====================

    /// Fold one answer into the learner's ratings, history and (when the
    /// item is under spaced review) its review card.
    ///
    /// `card` is the item's existing card, if any. Without one, a card is
    /// created only when the attempt asks for spaced review.
    pub fn record_answer(
        &self,
        profile: &LearnerProfile,
        attempt: &AttemptRecord,
        card: Option<&ReviewCard>,
        now: DateTime<Utc>,
    ) -> Result<AnswerOutcome> {
        attempt.validate()?;
        if let Some(card) = card {
            if card.item_id != attempt.item_id {
                return Err(EngineError::Validation(format!(
                    "review card {} does not belong to item {}",
                    card.item_id, attempt.item_id
                )));
            }
        }

        let ability_config = &self.config.ability;
        let confidence = attempt.confidence_or(ability_config.default_confidence);
        let mut updated = normalize_profile(profile);

        // Untopical answers aggregate like any other topic so the overall
        // rating stays derived from the topic map alone
        let topic = attempt.topic.as_deref().unwrap_or(GENERAL_TOPIC);
        let previous_overall = updated.overall_ability;
        let ability_before = updated.topic_ability(topic);
        let ability_after = update_ability_with_k(
            ability_before,
            attempt.correct,
            attempt.item_difficulty,
            confidence,
            ability_config.k_factor,
        );
        updated.topic_abilities = record_topic_ability(&updated, topic, ability_after);
        let count = updated
            .topic_attempt_counts
            .entry(topic.to_string())
            .or_insert(0);
        *count = count.saturating_add(1);

        // Extra weight on a topic below the mean can pull the weighted mean
        // against the answer; the overall rating never moves that way.
        let aggregated = overall_ability(&updated.topic_abilities, &updated.topic_attempt_counts);
        updated.overall_ability = if attempt.correct {
            aggregated.max(previous_overall)
        } else {
            aggregated.min(previous_overall)
        };

        updated.item_history.push(ItemAttempt {
            item_id: attempt.item_id.clone(),
            correct: attempt.correct,
            timestamp: now,
        });
        updated.last_updated = Some(now);

        tracing::debug!(
            user_id = %updated.user_id,
            item_id = %attempt.item_id,
            topic,
            correct = attempt.correct,
            before = ability_before,
            after = ability_after,
            overall = updated.overall_ability,
            "ability updated"
        );

        let card = match card {
            Some(existing) => Some(existing.clone()),
            None if attempt.schedule_review => {
                let mut fresh = ReviewCard::new(attempt.item_id.clone(), now);
                fresh.easiness_factor = self.config.scheduler.initial_easiness;
                Some(fresh)
            }
            None => None,
        };

        let (card, grade) = match card {
            Some(card) => {
                let grade = match attempt.grade {
                    Some(value) => Grade::new(value)?,
                    None => derive_grade(attempt, &self.config.grading),
                };
                let reviewed = review_card_with(&card, grade, now, &self.config.scheduler);
                tracing::debug!(
                    item_id = %reviewed.item_id,
                    grade = grade.value(),
                    interval = reviewed.interval,
                    easiness = reviewed.easiness_factor,
                    "review card rescheduled"
                );
                (Some(reviewed), Some(grade))
            }
            None => (None, None),
        };

        Ok(AnswerOutcome {
            profile: updated,
            card,
            ability_before,
            ability_after,
            grade,
        })
    }

    /// Apply a review grade to a card directly
    pub fn review(&self, card: &ReviewCard, grade: u8, now: DateTime<Utc>) -> Result<ReviewCard> {
        let grade = Grade::new(grade)?;
        Ok(review_card_with(card, grade, now, &self.config.scheduler))
    }

    // ==================== Read Paths ====================

    /// Choose the next batch of questions for the learner.
    ///
    /// An empty pool (after topic and exclusion filtering) is not an error:
    /// the result carries a recommendation instead.
    pub fn get_next_items<R: Rng + ?Sized>(
        &self,
        profile: &LearnerProfile,
        pool: &[QuestionCandidate],
        request: &NextItemsRequest,
        rng: &mut R,
    ) -> Result<NextItems> {
        if request.count == 0 {
            return Err(EngineError::Validation("count must be positive".to_string()));
        }
        for candidate in pool {
            validate_candidate(candidate)?;
        }

        let profile = normalize_profile(profile);
        let candidates: Vec<QuestionCandidate> = pool
            .iter()
            .filter(|c| {
                request
                    .topic_filter
                    .as_deref()
                    .map_or(true, |topic| c.topic == topic)
            })
            .filter(|c| !request.exclude_ids.contains(&c.id))
            .cloned()
            .collect();

        let target_ability = match request.topic_filter.as_deref() {
            Some(topic) => profile.topic_ability(topic),
            None => profile.overall_ability,
        };

        let selection = select_questions_with(
            target_ability as f64,
            &candidates,
            request.count,
            &self.config.selector,
            rng,
        );

        if selection.is_empty() {
            tracing::warn!(
                user_id = %profile.user_id,
                pool = pool.len(),
                topic = request.topic_filter.as_deref().unwrap_or("-"),
                "no questions available after filtering"
            );
        } else {
            tracing::debug!(
                user_id = %profile.user_id,
                target_ability,
                selected = selection.len(),
                "questions selected"
            );
        }

        let items = selection
            .questions
            .into_iter()
            .map(|question| {
                let ability = profile.topic_ability(&question.candidate.topic);
                NextItem {
                    prediction: predict(ability as f64, question.candidate.difficulty),
                    question,
                }
            })
            .collect();

        Ok(NextItems {
            items,
            target_ability,
            fallback_recommendation: selection.fallback_recommendation,
            suggested_action: selection.suggested_action,
        })
    }

    /// Due cards, most overdue first, at most `limit`
    pub fn get_due_items(
        &self,
        cards: &[ReviewCard],
        now: DateTime<Utc>,
        limit: usize,
    ) -> Vec<ReviewCard> {
        due_cards(cards, now)
            .into_iter()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Chance the learner answers an item of `difficulty` correctly, judged
    /// against their overall rating
    pub fn predict_outcome(&self, profile: &LearnerProfile, difficulty: f64) -> Result<Prediction> {
        validate_difficulty(difficulty)?;
        let profile = normalize_profile(profile);
        Ok(predict(profile.overall_ability as f64, difficulty))
    }

    /// Same as [`Self::predict_outcome`] but against the learner's rating
    /// for `topic`
    pub fn predict_topic_outcome(
        &self,
        profile: &LearnerProfile,
        topic: &str,
        difficulty: f64,
    ) -> Result<Prediction> {
        validate_difficulty(difficulty)?;
        let profile = normalize_profile(profile);
        Ok(predict(profile.topic_ability(topic) as f64, difficulty))
    }

    pub fn sessions_to_mastery(
        &self,
        profile: &LearnerProfile,
        target_ability: f64,
        recent_progress: &[f64],
    ) -> Result<MasteryEstimate> {
        validate_difficulty(target_ability)?;
        let profile = normalize_profile(profile);
        Ok(estimate_sessions_to_mastery(
            profile.overall_ability as f64,
            target_ability,
            recent_progress,
        ))
    }

    /// Presentation priority per content topic. The general topic collects
    /// untopical answers and is left out.
    pub fn topic_priorities(
        &self,
        profile: &LearnerProfile,
        learning_goals: &[String],
        recent_errors: &HashMap<String, u32>,
    ) -> HashMap<String, f64> {
        let mut profile = normalize_profile(profile);
        profile.topic_abilities.remove(GENERAL_TOPIC);
        topic_priority_with(
            &profile.topic_abilities,
            learning_goals,
            recent_errors,
            &self.config.priority,
        )
    }

    pub fn card_metrics(&self, cards: &[ReviewCard], now: DateTime<Utc>) -> CardMetrics {
        metrics_with(cards, now, &self.config.scheduler)
    }

    /// Ids answered within the configured history window, for use as an
    /// exclusion set
    pub fn recently_seen(&self, profile: &LearnerProfile) -> HashSet<String> {
        profile
            .recent_history(self.config.history_limit)
            .iter()
            .map(|attempt| attempt.item_id.clone())
            .collect()
    }
}

fn validate_candidate(candidate: &QuestionCandidate) -> Result<()> {
    if candidate.id.trim().is_empty() {
        return Err(EngineError::Validation("candidate id is required".to_string()));
    }
    if !candidate.difficulty.is_finite() {
        return Err(EngineError::Validation(format!(
            "candidate {} has non-numeric difficulty",
            candidate.id
        )));
    }
    Ok(())
}

fn validate_difficulty(difficulty: f64) -> Result<()> {
    if !difficulty.is_finite() {
        return Err(EngineError::Validation(format!(
            "difficulty must be a finite number, got {difficulty}"
        )));
    }
    Ok(())
}
