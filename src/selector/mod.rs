//! Adaptive Question Selection
//!
//! Ranks a candidate pool by how closely each question's difficulty matches
//! the learner, then samples the batch with bounded randomization: every
//! pick is drawn uniformly from the few best remaining candidates, so the
//! learner does not always get the literal best match while selections stay
//! close to their level.
//!
//! Randomness is always injected by the caller; seed a
//! `rand_chacha::ChaCha8Rng` for reproducible selections.

use std::collections::{HashMap, HashSet};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{PriorityConfig, SelectorConfig};
use crate::topic::mean_topic_ability;
use crate::types::QuestionCandidate;

pub const NO_CANDIDATES_RECOMMENDATION: &str = "No questions available for current ability level";

const MAX_MATCH_SCORE: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub candidate: QuestionCandidate,
    /// 0-100, 100 is an exact difficulty match
    pub match_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    BroadenCriteria,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub questions: Vec<ScoredCandidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_recommendation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<SuggestedAction>,
}

impl Selection {
    /// Result for an empty candidate pool
    pub fn no_candidates() -> Self {
        Self {
            questions: Vec::new(),
            fallback_recommendation: Some(NO_CANDIDATES_RECOMMENDATION.to_string()),
            suggested_action: Some(SuggestedAction::BroadenCriteria),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.questions
            .iter()
            .map(|q| q.candidate.id.as_str())
            .collect()
    }
}

/// 100 for an exact match, falling linearly to 0 at `window` rating points
pub fn match_score(ability: f64, difficulty: f64, window: f64) -> f64 {
    (MAX_MATCH_SCORE - (difficulty - ability).abs() / window * MAX_MATCH_SCORE).max(0.0)
}

/// All candidates scored and ordered best first.
///
/// Equal scores order by absolute difficulty gap, then by id, so ranking is
/// deterministic and still prefers closer items once scores bottom out.
pub fn rank_candidates(
    ability: f64,
    candidates: &[QuestionCandidate],
    config: &SelectorConfig,
) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = candidates
        .iter()
        .map(|candidate| ScoredCandidate {
            match_score: match_score(ability, candidate.difficulty, config.match_window),
            candidate: candidate.clone(),
        })
        .collect();

    scored.sort_by(|a, b| {
        b.match_score
            .total_cmp(&a.match_score)
            .then_with(|| {
                let gap_a = (a.candidate.difficulty - ability).abs();
                let gap_b = (b.candidate.difficulty - ability).abs();
                gap_a.total_cmp(&gap_b)
            })
            .then_with(|| a.candidate.id.cmp(&b.candidate.id))
    });
    scored
}

pub fn select_questions<R: Rng + ?Sized>(
    ability: f64,
    candidates: &[QuestionCandidate],
    target_count: usize,
    rng: &mut R,
) -> Selection {
    select_questions_with(ability, candidates, target_count, &SelectorConfig::default(), rng)
}

/// Pick up to `target_count` questions near `ability`.
///
/// The top `oversample_factor * target_count` ranked candidates form the
/// shortlist; each pick is uniform over the first `random_window` remaining
/// shortlist entries.
pub fn select_questions_with<R: Rng + ?Sized>(
    ability: f64,
    candidates: &[QuestionCandidate],
    target_count: usize,
    config: &SelectorConfig,
    rng: &mut R,
) -> Selection {
    if candidates.is_empty() {
        return Selection::no_candidates();
    }

    let mut shortlist = rank_candidates(ability, candidates, config);
    shortlist.truncate(target_count.saturating_mul(config.oversample_factor.max(1)));

    let window = config.random_window.max(1);
    let mut questions = Vec::with_capacity(target_count.min(shortlist.len()));
    while questions.len() < target_count && !shortlist.is_empty() {
        let span = window.min(shortlist.len());
        let pick = rng.gen_range(0..span);
        questions.push(shortlist.remove(pick));
    }

    Selection {
        questions,
        fallback_recommendation: None,
        suggested_action: None,
    }
}

// ==================== Topic Priority ====================

pub fn topic_priority(
    topic_abilities: &HashMap<String, i32>,
    learning_goals: &[String],
    recent_errors: &HashMap<String, u32>,
) -> HashMap<String, f64> {
    topic_priority_with(
        topic_abilities,
        learning_goals,
        recent_errors,
        &PriorityConfig::default(),
    )
}

/// Presentation weight per topic.
///
/// priority = 1 + goal bonus + errors * error weight
///            + max(0, (mean ability - topic ability) / scale)
///
/// The last term pulls practice toward topics below the learner's own
/// average. Goal and error topics without a rating get no remediation term.
pub fn topic_priority_with(
    topic_abilities: &HashMap<String, i32>,
    learning_goals: &[String],
    recent_errors: &HashMap<String, u32>,
    config: &PriorityConfig,
) -> HashMap<String, f64> {
    let mean = mean_topic_ability(topic_abilities);
    let goals: HashSet<&str> = learning_goals.iter().map(String::as_str).collect();

    let topics: HashSet<&str> = topic_abilities
        .keys()
        .map(String::as_str)
        .chain(goals.iter().copied())
        .chain(recent_errors.keys().map(String::as_str))
        .collect();

    topics
        .into_iter()
        .map(|topic| {
            let mut priority = 1.0;
            if goals.contains(topic) {
                priority += config.goal_bonus;
            }
            priority += recent_errors.get(topic).copied().unwrap_or(0) as f64 * config.error_weight;
            if let (Some(mean), Some(&ability)) = (mean, topic_abilities.get(topic)) {
                priority += ((mean - ability as f64) / config.remediation_scale).max(0.0);
            }
            (topic.to_string(), priority)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn pool(difficulties: &[f64]) -> Vec<QuestionCandidate> {
        difficulties
            .iter()
            .enumerate()
            .map(|(i, &d)| QuestionCandidate::new(format!("q{i}"), "cardio", d))
            .collect()
    }

    // ==================== match_score 测试 ====================

    #[test]
    fn test_match_score_bounds() {
        assert_eq!(match_score(1500.0, 1500.0, 50.0), 100.0);
        assert_eq!(match_score(1500.0, 1525.0, 50.0), 50.0);
        assert_eq!(match_score(1500.0, 1450.0, 50.0), 0.0);
        assert_eq!(match_score(1500.0, 2400.0, 50.0), 0.0);
    }

    #[test]
    fn test_rank_orders_by_score_then_gap() {
        let ranked = rank_candidates(
            1500.0,
            &pool(&[1900.0, 1510.0, 1600.0, 1500.0]),
            &SelectorConfig::default(),
        );
        let ids: Vec<&str> = ranked.iter().map(|s| s.candidate.id.as_str()).collect();
        assert_eq!(ids, vec!["q3", "q1", "q2", "q0"]);
        assert_eq!(ranked[0].match_score, 100.0);
        assert_eq!(ranked[3].match_score, 0.0);
    }

    // ==================== select_questions 测试 ====================

    #[test]
    fn test_selects_requested_count_near_ability() {
        let candidates = pool(&[1300.0, 1450.0, 1500.0, 1550.0, 1700.0]);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let selection = select_questions(1500.0, &candidates, 3, &mut rng);

        assert_eq!(selection.len(), 3);
        let mean = selection
            .questions
            .iter()
            .map(|q| q.candidate.difficulty)
            .sum::<f64>()
            / 3.0;
        assert!((mean - 1500.0).abs() <= 100.0);
        assert!(selection.fallback_recommendation.is_none());
    }

    #[test]
    fn test_no_duplicates() {
        let candidates = pool(&[1400.0, 1450.0, 1500.0, 1550.0, 1600.0, 1650.0]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let selection = select_questions(1500.0, &candidates, 5, &mut rng);
        let ids: HashSet<&str> = selection.ids().into_iter().collect();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn test_fewer_candidates_than_requested() {
        let candidates = pool(&[1500.0, 1600.0]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let selection = select_questions(1500.0, &candidates, 10, &mut rng);
        assert_eq!(selection.len(), 2);
    }

    #[test]
    fn test_empty_pool_recommends_broadening() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let selection = select_questions(1500.0, &[], 3, &mut rng);
        assert!(selection.is_empty());
        assert_eq!(
            selection.fallback_recommendation.as_deref(),
            Some(NO_CANDIDATES_RECOMMENDATION)
        );
        assert_eq!(selection.suggested_action, Some(SuggestedAction::BroadenCriteria));

        let json = serde_json::to_value(&selection).unwrap();
        assert_eq!(json["suggestedAction"], "broaden_criteria");
    }

    #[test]
    fn test_same_seed_same_selection() {
        let candidates = pool(&[1300.0, 1400.0, 1480.0, 1500.0, 1520.0, 1600.0, 1700.0]);
        let first = select_questions(1500.0, &candidates, 3, &mut ChaCha8Rng::seed_from_u64(42));
        let second = select_questions(1500.0, &candidates, 3, &mut ChaCha8Rng::seed_from_u64(42));
        assert_eq!(first, second);
    }

    #[test]
    fn test_picks_stay_in_shortlist() {
        // target 2 -> shortlist of the 4 closest items
        let candidates = pool(&[1500.0, 1510.0, 1520.0, 1530.0, 2000.0, 900.0]);
        for seed in 0..50 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let selection = select_questions(1500.0, &candidates, 2, &mut rng);
            for q in &selection.questions {
                assert!(q.candidate.difficulty <= 1530.0 && q.candidate.difficulty >= 1500.0);
            }
        }
    }

    #[test]
    fn test_window_of_one_is_greedy() {
        let config = SelectorConfig {
            random_window: 1,
            ..SelectorConfig::default()
        };
        let candidates = pool(&[1600.0, 1500.0, 1530.0]);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let selection = select_questions_with(1500.0, &candidates, 2, &config, &mut rng);
        assert_eq!(selection.ids(), vec!["q1", "q2"]);
    }

    #[test]
    fn test_zero_target_returns_nothing() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let selection = select_questions(1500.0, &pool(&[1500.0]), 0, &mut rng);
        assert!(selection.is_empty());
        assert!(selection.suggested_action.is_none());
    }

    // ==================== topic_priority 测试 ====================

    #[test]
    fn test_goal_and_weak_topic_ranks_higher() {
        let abilities: HashMap<String, i32> = [
            ("cardio".to_string(), 1300),
            ("renal".to_string(), 1700),
            ("neuro".to_string(), 1500),
        ]
        .into_iter()
        .collect();
        let goals = vec!["cardio".to_string()];
        let priority = topic_priority(&abilities, &goals, &HashMap::new());

        assert!(priority["cardio"] > priority["renal"]);
        // 1 + 0.5 + (1500 - 1300) / 200
        assert!((priority["cardio"] - 2.5).abs() < 1e-9);
        assert!((priority["renal"] - 1.0).abs() < 1e-9);
        assert!((priority["neuro"] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_recent_errors_raise_priority() {
        let abilities: HashMap<String, i32> =
            [("cardio".to_string(), 1500)].into_iter().collect();
        let errors: HashMap<String, u32> = [("cardio".to_string(), 3), ("derm".to_string(), 1)]
            .into_iter()
            .collect();
        let priority = topic_priority(&abilities, &[], &errors);
        assert!((priority["cardio"] - 1.6).abs() < 1e-9);
        assert!((priority["derm"] - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(topic_priority(&HashMap::new(), &[], &HashMap::new()).is_empty());
    }
}
