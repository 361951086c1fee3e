use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use threadlord::WorkerPool;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let total = Arc::new(AtomicU64::new(0));
    let sum = Arc::clone(&total);

    let mut pool = WorkerPool::with_workers(
        move |n: u64| {
            sum.fetch_add(n, Ordering::SeqCst);
        },
        4,
    )
    .unwrap();

    pool.start().unwrap();
    pool.enqueue_all(1..=100).unwrap();
    pool.wait_all_and_stop().unwrap();

    println!("Processed {} items, sum = {}", pool.processed(), total.load(Ordering::SeqCst));
    pool.dispose();
}
