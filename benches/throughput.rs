//! Benchmarks for put/get/done throughput

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use partitioned_queue::prelude::*;
use std::thread;

fn bench_keys(c: &mut Criterion) {
    let mut group = c.benchmark_group("put_get_done");
    let size = 1000u64;

    group.throughput(Throughput::Elements(size));

    for num_keys in [1u64, 4, 16, 64].iter() {
        group.bench_with_input(
            BenchmarkId::new("keys", num_keys),
            num_keys,
            |b, &num_keys| {
                let (lifetime, _stop) = Scope::background().with_cancel();
                let queue = Queue::new(
                    &lifetime,
                    Config::new()
                        .with_partition_capacity(size as usize)
                        .with_buffer_capacity(num_keys as usize),
                );
                let scope = Scope::background();

                b.iter(|| {
                    thread::scope(|s| {
                        s.spawn(|| {
                            for i in 0..size {
                                queue.put(&scope, i % num_keys, black_box(i)).unwrap();
                            }
                        });

                        s.spawn(|| {
                            for _ in 0..size {
                                let item = queue.get(&scope).unwrap();
                                black_box(item.value());
                                item.done();
                            }
                        });
                    });
                });
            },
        );
    }

    group.finish();
}

fn bench_consumers(c: &mut Criterion) {
    let mut group = c.benchmark_group("consumers");
    let size = 1000u64;
    let num_keys = 16u64;

    group.throughput(Throughput::Elements(size));

    for num_consumers in [1u64, 2, 4].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(num_consumers),
            num_consumers,
            |b, &num_consumers| {
                let (lifetime, _stop) = Scope::background().with_cancel();
                let queue = Queue::new(
                    &lifetime,
                    Config::new()
                        .with_partition_capacity(size as usize)
                        .with_buffer_capacity(num_consumers as usize),
                );
                let scope = Scope::background();

                b.iter(|| {
                    thread::scope(|s| {
                        s.spawn(|| {
                            for i in 0..size {
                                queue.put(&scope, i % num_keys, black_box(i)).unwrap();
                            }
                        });

                        for consumer in 0..num_consumers {
                            let share = size / num_consumers
                                + u64::from(consumer < size % num_consumers);
                            let queue = &queue;
                            let scope = &scope;
                            s.spawn(move || {
                                for _ in 0..share {
                                    queue.get(scope).unwrap().done();
                                }
                            });
                        }
                    });
                });
            },
        );
    }

    group.finish();
}

fn bench_partition_creation(c: &mut Criterion) {
    c.bench_function("partition_creation", |b| {
        b.iter(|| {
            let (lifetime, _stop) = Scope::background().with_cancel();
            let queue = Queue::new(&lifetime, Config::new().with_partition_capacity(1));
            let scope = Scope::background();
            for key in 0..32u32 {
                queue.put(&scope, black_box(key), ()).unwrap();
            }
            black_box(queue.partition_count());
        });
    });
}

criterion_group!(
    benches,
    bench_keys,
    bench_consumers,
    bench_partition_creation
);
criterion_main!(benches);
