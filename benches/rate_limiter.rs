use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::time::Duration;
use twitch_tools::dispatch::normalize_targets;
use twitch_tools::rate_limit::SlidingWindowLimiter;

fn bench_limiter(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime for benchmark");

    // Benchmark: uncontended acquire with a window that never fills
    c.bench_function("limiter_acquire_uncontended", |b| {
        let limiter = SlidingWindowLimiter::new(1_000_000, Duration::from_millis(1))
            .expect("valid limiter");
        b.iter(|| {
            rt.block_on(limiter.acquire());
        });
    });

    // Benchmark: try_acquire against a full window (trim + wait computation)
    c.bench_function("limiter_try_acquire_full_window", |b| {
        let limiter =
            SlidingWindowLimiter::new(95, Duration::from_secs(30)).expect("valid limiter");
        while limiter.try_acquire().is_ok() {}
        b.iter(|| black_box(limiter.try_acquire()));
    });

    // Benchmark: 95 concurrent acquirers sharing one window
    c.bench_function("limiter_acquire_95_concurrent", |b| {
        b.iter(|| {
            rt.block_on(async {
                let limiter = std::sync::Arc::new(
                    SlidingWindowLimiter::new(95, Duration::from_secs(30))
                        .expect("valid limiter"),
                );
                let mut tasks = tokio::task::JoinSet::new();
                for _ in 0..95 {
                    let limiter = limiter.clone();
                    tasks.spawn(async move { limiter.acquire().await });
                }
                while tasks.join_next().await.is_some() {}
            });
        });
    });
}

fn bench_targets(c: &mut Criterion) {
    let input: Vec<String> = (0..5_000).map(|i| format!("User_{}", i % 2_500)).collect();

    c.bench_function("normalize_5000_targets", |b| {
        b.iter(|| black_box(normalize_targets(&input)));
    });
}

criterion_group!(benches, bench_limiter, bench_targets);
criterion_main!(benches);
