// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use rill_core::{SchedulerRef, TrampolineScheduler};
use rill_task::Task;

fn run<T: Clone + Send + Sync + 'static>(scheduler: &SchedulerRef, task: &Task<T>) -> T {
    task.run_as_future(scheduler)
        .try_value()
        .expect("synchronous")
        .expect("success")
}

fn bench_bind_chain(c: &mut Criterion) {
    let scheduler: SchedulerRef = Arc::new(TrampolineScheduler::default());
    let mut task = Task::now(0u64);
    for _ in 0..1_000 {
        task = task.flat_map(|x| Task::now(x + 1));
    }
    c.bench_function("flat_map_chain_1000", |b| {
        b.iter(|| run(&scheduler, &task));
    });
}

fn bench_map_fusion_hot_path(c: &mut Criterion) {
    let scheduler: SchedulerRef = Arc::new(TrampolineScheduler::default());
    let mut task = Task::now(0u64);
    for _ in 0..1_000 {
        task = task.map(|x| x + 1);
    }
    c.bench_function("map_chain_1000", |b| {
        b.iter(|| run(&scheduler, &task));
    });
}

fn bench_memoized_hot_path(c: &mut Criterion) {
    let scheduler: SchedulerRef = Arc::new(TrampolineScheduler::default());
    let task = Task::eval(|| 42u64).memoize();
    run(&scheduler, &task);
    c.bench_function("memoized_read", |b| {
        b.iter(|| run(&scheduler, &task));
    });
}

criterion_group!(
    benches,
    bench_bind_chain,
    bench_map_fusion_hot_path,
    bench_memoized_hot_path
);
criterion_main!(benches);
