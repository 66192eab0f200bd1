//! Benchmarks for language classification on short utterances.
//!
//! Classification runs on every transcript before it is delivered, so it
//! should stay well under a millisecond for voice-length input.

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use scanspeak_language::{classify, reconcile};

const UTTERANCES: &[&str] = &[
    "Where is the bread",
    "¿Dónde está la leche?",
    "Où est le fromage, s'il vous plaît",
    "Wo ist die Milch",
    "gdzie jest mleko",
    "牛奶在哪里?",
    "Где находится хлеб",
    "أين الحليب",
    "दूध कहाँ है",
    "xyzzy plugh frobozz",
];

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");
    group.sample_size(200);
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("mixed_utterances", |b| {
        let mut idx = 0usize;
        b.iter(|| {
            let tag = classify(black_box(UTTERANCES[idx % UTTERANCES.len()]));
            idx += 1;
            tag
        });
    });

    // Worst case: nothing matches until the frequency fallback.
    group.bench_function("fallback_path", |b| {
        b.iter(|| classify(black_box("xyzzy plugh frobozz")));
    });

    group.bench_function("reconcile_override", |b| {
        b.iter(|| reconcile(black_box(Some("fr")), black_box("Where is the bread")));
    });

    group.finish();
}

criterion_group!(benches, bench_classify);
criterion_main!(benches);
