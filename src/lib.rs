//! # danci-adapt - 自适应学习者建模与调度引擎
//!
//! Pure Rust learner-modeling algorithms that decide which question a
//! learner sees next and when answered material comes back for review:
//!
//! - **Ability Estimation** - Elo-style rating update with confidence-scaled K
//! - **Topic Aggregation** - per-topic ratings and an attempt-weighted overall rating
//! - **Performance Prediction** - success probability, confidence, sessions to mastery
//! - **Spaced Repetition** - SM-2 review card state machine and due queues
//! - **Adaptive Selection** - difficulty-matched batches with bounded randomization
//! - **Sanitization** - repair of corrupted or partial stored learner state
//!
//! ## 模块结构
//!
//! - [`sanitize`] - profile/card repair
//! - [`ability`] - Elo update
//! - [`topic`] - topic ratings and overall aggregation
//! - [`predict`] - outcome prediction
//! - [`srs`] - review scheduling
//! - [`selector`] - question selection and topic priority
//! - [`engine`] - composed entry points ([`AdaptiveEngine`])
//! - [`config`] - tunable parameters
//! - [`types`] - shared data model and constants
//!
//! All computation is synchronous and free of hidden state. Persistence and
//! per-learner locking belong to the caller.
//!
//! ## 使用示例
//!
//! ```rust
//! use danci_adapt::{AdaptiveEngine, AttemptRecord, LearnerProfile, NextItemsRequest, QuestionCandidate};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let engine = AdaptiveEngine::default();
//! let profile: LearnerProfile = serde_json::from_str(r#"{"userId":"u1","overallAbility":1500}"#).unwrap();
//!
//! let attempt = AttemptRecord::new("q1", true, 1500.0).with_topic("cardio");
//! let outcome = engine.record_answer(&profile, &attempt, None, chrono::Utc::now()).unwrap();
//! assert!(outcome.profile.overall_ability > 1500);
//!
//! let pool = vec![
//!     QuestionCandidate::new("q2", "cardio", 1480.0),
//!     QuestionCandidate::new("q3", "cardio", 1530.0),
//! ];
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! let next = engine
//!     .get_next_items(&outcome.profile, &pool, &NextItemsRequest::new(1), &mut rng)
//!     .unwrap();
//! assert_eq!(next.items.len(), 1);
//! ```

// ============================================================================
// 模块声明
// ============================================================================

pub mod ability;
pub mod config;
pub mod engine;
pub mod error;
pub mod predict;
pub mod sanitize;
pub mod selector;
pub mod srs;
pub mod topic;
pub mod types;

// ============================================================================
// 重新导出
// ============================================================================

/// 重新导出所有公共类型
pub use types::*;

pub use ability::{adjusted_k, expected_score, update_ability, update_ability_with_k};
pub use config::{
    AbilityConfig, EngineConfig, GradingConfig, PriorityConfig, SchedulerConfig, SelectorConfig,
};
pub use engine::{AdaptiveEngine, AnswerOutcome, NextItem, NextItems, NextItemsRequest};
pub use error::{EngineError, Result};
pub use predict::{estimate_sessions_to_mastery, predict, predict_batch, MasteryEstimate, Prediction};
pub use sanitize::{sanitize_card, sanitize_profile};
pub use selector::{
    select_questions, topic_priority, ScoredCandidate, Selection, SuggestedAction,
};
pub use srs::{due_cards, metrics, review_card, CardMetrics, Grade};
pub use topic::{overall_ability, record_topic_ability, topic_ability};
