use rand::Rng;
use std::time::Instant;
use threadlord::{log_stats, WorkerPool};

fn cpu_item(n: u64) -> u64 {
    (0..n).map(|x| x * x).sum()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
        .init();

    let num_items = 200_000;

    for limit in [0, 64] {
        let start = Instant::now();

        let mut pool = WorkerPool::builder(|n: u64| {
            let _ = std::hint::black_box(cpu_item(n));
        })
        .queue_limit(limit)
        .build()
        .unwrap();
        pool.start().unwrap();

        let mut rng = rand::thread_rng();
        for _ in 0..num_items {
            pool.enqueue(rng.gen_range(1_000..=10_000)).unwrap();
        }

        pool.wait_all().unwrap();
        log_stats!(pool);
        pool.stop();

        println!(
            "Queue limit {:>3}: {} items in {:.2?}",
            limit,
            num_items,
            start.elapsed()
        );
    }
}
