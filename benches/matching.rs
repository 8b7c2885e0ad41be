//! Benchmarks for hybrid-regex matching
//!
//! Compares the hybrid matcher (regular fragments promoted to DFAs) against
//! the same patterns run purely by the backtracking runner.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hybrid_regex::{Dfa, Matcher, Options};

const LOG_LINE: &str = "2024-06-01 12:34:56 INFO request from alice@example.com took 123ms";

fn haystack() -> String {
    let mut text = "lorem ipsum dolor sit amet ".repeat(200);
    text.push_str(LOG_LINE);
    text
}

fn bench_regular_pattern(c: &mut Criterion) {
    let pattern = r"[a-z]+@[a-z]+\.com";
    let hybrid = Matcher::new(pattern, Options::default()).unwrap();
    let plain = Matcher::backtracking(pattern, Options::default()).unwrap();
    let dfa = Dfa::from_pattern(pattern, Options::default()).unwrap();
    let text = haystack();

    c.bench_function("regular_hybrid", |b| {
        b.iter(|| hybrid.find(black_box(&text)))
    });
    c.bench_function("regular_backtracking", |b| {
        b.iter(|| plain.find(black_box(&text)))
    });
    c.bench_function("regular_dfa", |b| b.iter(|| dfa.find(black_box(&text))));
}

fn bench_captures(c: &mut Criterion) {
    let pattern = r"(\d{4})-(\d{2})-(\d{2}) (\d+):(\d+)";
    let hybrid = Matcher::new(pattern, Options::default()).unwrap();
    let plain = Matcher::backtracking(pattern, Options::default()).unwrap();

    c.bench_function("captures_hybrid", |b| {
        b.iter(|| hybrid.find(black_box(LOG_LINE)))
    });
    c.bench_function("captures_backtracking", |b| {
        b.iter(|| plain.find(black_box(LOG_LINE)))
    });
}

fn bench_backreference(c: &mut Criterion) {
    let m = Matcher::new(r"\b(\w+)\s+\1\b", Options::default()).unwrap();
    let text = format!("{} the the end", haystack());

    c.bench_function("backreference", |b| b.iter(|| m.find(black_box(&text))));
}

fn bench_lookaround(c: &mut Criterion) {
    let m = Matcher::new(r"(?<=took )\d+(?=ms)", Options::default()).unwrap();

    c.bench_function("lookaround", |b| b.iter(|| m.find(black_box(LOG_LINE))));
}

fn bench_compile(c: &mut Criterion) {
    c.bench_function("compile_hybrid", |b| {
        b.iter(|| Matcher::new(black_box(r"(?:[a-z]+\.)*[a-z]+@(\w+)\.(?:com|org|net)"), Options::default()))
    });
}

criterion_group!(
    benches,
    bench_regular_pattern,
    bench_captures,
    bench_backreference,
    bench_lookaround,
    bench_compile
);
criterion_main!(benches);
