#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tasknest_core::{Priority, Task, TaskId, TaskInput, TodoFilter, UserId, aggregate, select};
use time::{Duration, OffsetDateTime};

fn build_batch(size: usize) -> Vec<Task> {
    let now = OffsetDateTime::now_utc();
    (0..size)
        .map(|idx| {
            let priority = Priority::ALL[idx % Priority::ALL.len()];
            Task::from_input(
                TaskId::generate(),
                UserId::new("bench"),
                TaskInput {
                    title: format!("task {idx}"),
                    description: Some(format!("details for bench task {idx}")),
                    completed: idx % 4 == 0,
                    priority,
                    category: Some(if idx % 2 == 0 { "Work" } else { "Home" }.to_owned()),
                    due_date: Some(now + Duration::hours(i64::try_from(idx % 120).unwrap_or(0))),
                    ..TaskInput::default()
                },
                now - Duration::minutes(i64::try_from(idx).unwrap_or(0)),
            )
        })
        .collect()
}

fn select_benchmark(c: &mut Criterion) {
    let filter = TodoFilter::builder()
        .completed(false)
        .category("Work")
        .search("BENCH")
        .build();
    let mut group = c.benchmark_group("select_and_aggregate");
    for &size in &[64usize, 512, 4096] {
        let batch = build_batch(size);
        group.bench_with_input(BenchmarkId::new("select", size), &batch, |b, batch| {
            b.iter(|| black_box(select(batch, &filter)));
        });
        group.bench_with_input(BenchmarkId::new("aggregate", size), &batch, |b, batch| {
            let now = OffsetDateTime::now_utc();
            b.iter(|| black_box(aggregate(batch, now)));
        });
    }
    group.finish();
}

criterion_group!(benches, select_benchmark);
criterion_main!(benches);
