//! Benchmark suite for danci-adapt
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use danci_adapt::{
    due_cards, predict_batch, select_questions, update_ability, QuestionCandidate, ReviewCard,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn bench_update_ability(c: &mut Criterion) {
    c.bench_function("update_ability", |b| {
        b.iter(|| update_ability(black_box(1500), black_box(true), black_box(1620.0), 0.7))
    });
}

fn bench_select_questions(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_questions");

    for size in [50usize, 500, 5000] {
        let pool: Vec<QuestionCandidate> = (0..size)
            .map(|i| QuestionCandidate::new(format!("q{i}"), "topic", 800.0 + (i % 1600) as f64))
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(size), &pool, |b, pool| {
            let mut rng = ChaCha8Rng::seed_from_u64(42);
            b.iter(|| select_questions(black_box(1500.0), pool, 10, &mut rng))
        });
    }
    group.finish();
}

fn bench_due_cards(c: &mut Criterion) {
    let now = chrono::Utc::now();
    let cards: Vec<ReviewCard> = (0..10_000)
        .map(|i| ReviewCard::new(format!("q{i}"), now - chrono::Duration::hours(i % 500 - 250)))
        .collect();

    c.bench_function("due_cards_10k", |b| b.iter(|| due_cards(black_box(&cards), now).len()));
}

fn bench_predict_batch(c: &mut Criterion) {
    let difficulties: Vec<f64> = (0..10_000).map(|i| 800.0 + (i % 1600) as f64).collect();
    c.bench_function("predict_batch_10k", |b| {
        b.iter(|| predict_batch(black_box(1500.0), &difficulties))
    });
}

criterion_group!(
    benches,
    bench_update_ability,
    bench_select_questions,
    bench_due_cards,
    bench_predict_batch
);
criterion_main!(benches);
