use std::thread;
use std::time::Duration;

use threadlord::WorkerPool;

fn main() {
    let mut pool = WorkerPool::fallible(|n: u32| {
        thread::sleep(Duration::from_millis(20)); // Simulate work
        if n % 10 == 0 {
            return Err(format!("item {n} rejected"));
        }
        Ok(())
    })
    .num_workers(4)
    .queue_limit(20)
    .on_error(|err| eprintln!("error: {err}"))
    .build()
    .unwrap();

    pool.start().unwrap();

    // Produce from a separate thread so the main thread can display live updates.
    thread::scope(|s| {
        s.spawn(|| pool.enqueue_all(0..500).unwrap());

        while pool.enqueued() == 0 && pool.processed() == 0 {
            thread::sleep(Duration::from_millis(1));
        }
        pool.wait_all_with(|stats| {
            println!("\n--- Stats ---");
            println!("Enqueued: {}", stats.enqueued);
            println!("Processing: {}", stats.currently_processing);
            println!("Processed: {}", stats.processed);
            println!("Failed: {}", stats.failed);
            println!("Last second: {}", stats.processed_last_second);
            println!("Average/s: {:.1}", stats.processed_per_second_average);
            thread::sleep(Duration::from_millis(500));
        })
        .unwrap();
    });

    pool.stop();

    let stats = pool.stats();
    println!("\n--- Final Stats ---");
    println!("{:#?}", stats);
}
