use std::thread;
use std::time::Duration;

use threadlord::{PoolState, WorkerPool};

#[test]
fn test_stats_are_sane_before_first_sample() {
    let mut pool = WorkerPool::with_workers(|_: u32| {}, 2).unwrap();
    pool.start().unwrap();

    assert_eq!(pool.processed_last_second(), 0);
    assert_eq!(pool.processed_per_second_average(), 0.0);

    let stats = pool.stats();
    assert_eq!(stats.state, PoolState::Running);
    assert_eq!(stats.workers, 2);
    assert_eq!(stats.outstanding(), 0);
    assert_eq!(stats.queue_limit, 0);
}

#[test]
fn test_live_count_is_reported_before_first_sample() {
    let mut pool = WorkerPool::builder(|_: u32| {})
        .num_workers(2)
        .sample_interval(Duration::from_secs(60))
        .build()
        .unwrap();
    pool.start().unwrap();

    pool.enqueue_all(0..5).unwrap();
    pool.wait_all().unwrap();

    // The sampling interval has not elapsed yet.
    assert_eq!(pool.processed_last_second(), 5);
    assert_eq!(pool.processed_per_second_average(), 5.0);
}

#[test]
fn test_average_tracks_steady_throughput() {
    // One worker at ~10ms per item gives at most 10 items per 100ms interval.
    let mut pool = WorkerPool::builder(|_: u32| thread::sleep(Duration::from_millis(10)))
        .num_workers(1)
        .sample_interval(Duration::from_millis(100))
        .build()
        .unwrap();
    pool.start().unwrap();

    pool.enqueue_all(0..200).unwrap();
    thread::sleep(Duration::from_millis(750));

    let average = pool.processed_per_second_average();
    assert!(
        (4.0..=11.0).contains(&average),
        "average {} outside expected range",
        average
    );
    let last = pool.processed_last_second();
    assert!(last <= 11, "last sample {} too high", last);

    pool.stop();
    while pool.state() != PoolState::Stopped {
        thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(pool.clear() + pool.processed(), 200);
}

#[test]
fn test_zero_sample_interval_is_rejected() {
    let result = WorkerPool::builder(|_: u32| {})
        .sample_interval(Duration::ZERO)
        .build();
    assert!(result.is_err());
}
