//! Benchmarks for intent classification throughput.
//!
//! Every request walks the ordered rule table before any module is
//! consulted, so classification cost is paid on the hot path.

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use cogito_core::types::ContextSnapshot;
use cogito_engine::intent::{analyze_intent, classify};

/// One input per rule, plus one that falls through to the general intent.
const INPUTS: &[&str] = &[
    "What is 15 * 8?",
    "What does ephemeral mean?",
    "Who was Ada Lovelace?",
    "How do I write a function in Rust?",
    "My name is Sam",
    "What is the meaning of life?",
    "help",
    "tell me something surprising about the deep ocean and the creatures living there",
];

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("intent_classify");
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("rule_table_mixed", |b| {
        let mut idx = 0usize;
        b.iter(|| {
            let input = INPUTS[idx % INPUTS.len()];
            idx += 1;
            classify(black_box(input)).map(|rule| rule.category)
        });
    });

    group.bench_function("general_fallthrough", |b| {
        let input = INPUTS[INPUTS.len() - 1];
        b.iter(|| classify(black_box(input)).is_none());
    });

    group.finish();
}

fn bench_analyze(c: &mut Criterion) {
    let context = ContextSnapshot::empty();
    let mut group = c.benchmark_group("intent_analyze");
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("with_entity_extraction", |b| {
        let mut idx = 0usize;
        b.iter(|| {
            let input = INPUTS[idx % INPUTS.len()];
            idx += 1;
            analyze_intent(black_box(input), &context)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_classify, bench_analyze);
criterion_main!(benches);
