//! Three consumers draining ten partitions, each item taking 200ms to process
//!
//! Run with `RUST_LOG=partitioned_queue=debug` to see partitions being created
//! and forwarding loops stopping when the lifetime scope expires.

use partitioned_queue::prelude::*;
use std::panic;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn consumer(id: usize, queue: Arc<Queue<String, u32>>) {
    loop {
        // wait for an item
        let item = match queue.get(&Scope::background()) {
            Ok(item) => item,
            Err(err) => {
                info!(consumer = id, %err, "consumer stopping");
                return;
            }
        };

        info!(consumer = id, %item, "got item");

        // simulate work
        thread::sleep(Duration::from_millis(200));

        // Must call done so the next item in the partition can be sent,
        // otherwise no more items from the partition will be received.
        item.done();
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // run this for 10 secs
    let (lifetime, _stop) = Scope::background().with_timeout(Duration::from_secs(10));

    let queue = Arc::new(Queue::new(
        &lifetime,
        Config::new()
            .with_partition_capacity(0)
            .with_buffer_capacity(0)
            .with_thread_name("demo"),
    ));

    let consumers: Vec<_> = (0..3)
        .map(|id| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || consumer(id, queue))
        })
        .collect();

    // produce some work
    for i in 0..30u32 {
        let key = format!("{}", i % 10);
        queue.put(&lifetime, key, i)?;
    }

    // wait for the lifetime scope to expire
    lifetime.wait();

    for consumer in consumers {
        if let Err(panic) = consumer.join() {
            panic::resume_unwind(panic);
        }
    }

    info!(stats = ?queue.stats(), "done");
    Ok(())
}
