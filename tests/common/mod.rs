#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use danci_adapt::QuestionCandidate;

pub const FIXED_SEED: u64 = 20240701;

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("danci_adapt=debug"))
        .with_test_writer()
        .try_init();
}

pub fn candidate_pool() -> Vec<QuestionCandidate> {
    vec![
        QuestionCandidate::new("cardio-1", "cardio", 1300.0),
        QuestionCandidate::new("cardio-2", "cardio", 1450.0),
        QuestionCandidate::new("cardio-3", "cardio", 1500.0),
        QuestionCandidate::new("cardio-4", "cardio", 1550.0),
        QuestionCandidate::new("cardio-5", "cardio", 1700.0),
        QuestionCandidate::new("renal-1", "renal", 1200.0),
        QuestionCandidate::new("renal-2", "renal", 1250.0),
        QuestionCandidate::new("renal-3", "renal", 1900.0),
    ]
}
