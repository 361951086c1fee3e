use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use rand::Rng;
use threadlord::WorkerPool;

/// A CPU-bound item: sum of squares up to `n`.
fn cpu_item(n: u64) -> u64 {
    (0..n).map(|x| x * x).sum()
}

fn prepare_items(count: usize) -> Vec<u64> {
    let mut rng = rand::thread_rng();
    (0..count).map(|_| rng.gen_range(10..=100)).collect()
}

fn started_pool(num_workers: usize, queue_limit: usize) -> WorkerPool<u64> {
    let mut pool = WorkerPool::builder(|n: u64| {
        criterion::black_box(cpu_item(n));
    })
    .num_workers(num_workers)
    .queue_limit(queue_limit)
    .build()
    .unwrap();
    pool.start().unwrap();
    pool
}

fn benchmark_unlimited_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("unlimited_queue");
    group.sample_size(10);

    let num_workers = 4;
    let num_items = 10_000;

    group.bench_function("unlimited_queue_10k_items", |b| {
        b.iter_batched(
            || (started_pool(num_workers, 0), prepare_items(num_items)),
            |(pool, items)| {
                pool.enqueue_all(items).unwrap();
                pool.wait_all_and_stop().unwrap();
                pool.dispose();
            },
            BatchSize::LargeInput,
        )
    });

    group.finish();
}

fn benchmark_limited_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("limited_queue");
    group.sample_size(10);

    let num_workers = 4;
    let num_items = 10_000;

    for limit in [16, 256] {
        group.bench_function(format!("limited_queue_{limit}_10k_items"), |b| {
            b.iter_batched(
                || (started_pool(num_workers, limit), prepare_items(num_items)),
                |(pool, items)| {
                    pool.enqueue_all(items).unwrap();
                    pool.wait_all_and_stop().unwrap();
                    pool.dispose();
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

fn benchmark_traditional(c: &mut Criterion) {
    let mut group = c.benchmark_group("traditional");
    group.sample_size(10);

    let num_items = 10_000;

    group.bench_function("thread_per_chunk_10k_items", |b| {
        b.iter_batched(
            || prepare_items(num_items),
            |items| {
                let handles: Vec<_> = items
                    .chunks(num_items / 4)
                    .map(|chunk| {
                        let chunk = chunk.to_vec();
                        std::thread::spawn(move || {
                            for n in chunk {
                                criterion::black_box(cpu_item(n));
                            }
                        })
                    })
                    .collect();

                for h in handles {
                    let _ = h.join();
                }
            },
            BatchSize::LargeInput,
        )
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_unlimited_queue,
    benchmark_limited_queue,
    benchmark_traditional
);
criterion_main!(benches);
