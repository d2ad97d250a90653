//! Searches a numeric range for primes by fanning chunks out across a thread pool.
//!
//! Run with `cargo run --release --example primes -- <pool_size>`.
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;

use flywheel::ThreadPool;

// Look for primes in the range [SEARCH_RANGE_MIN, SEARCH_RANGE_MAX].
const SEARCH_RANGE_MIN: u32 = 1;
const SEARCH_RANGE_MAX: u32 = 8_000_000;

/// Size of the per-task sub-range that is searched for primes.
const CHUNK_SZ: u32 = 1_000_000;

fn is_prime(i: u32) -> bool {
    let mut j = 2;
    while j * j <= i {
        if i % j == 0 {
            return false;
        }
        j += 1;
    }
    true
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let pool_size: usize = std::env::args()
        .nth(1)
        .context("usage: primes <pool_size>")?
        .parse()
        .context("pool_size must be a positive integer")?;

    let num_chunks = (SEARCH_RANGE_MAX - SEARCH_RANGE_MIN).div_ceil(CHUNK_SZ);

    println!("Range: [{SEARCH_RANGE_MIN}, {SEARCH_RANGE_MAX}]");
    println!("Number of chunks: {num_chunks}");
    println!("Thread pool size: {pool_size}");
    println!("Finding primes...");

    let pool = ThreadPool::with_threads(pool_size)?;
    let primes: Arc<Vec<AtomicBool>> = Arc::new(
        (0..=SEARCH_RANGE_MAX)
            .map(|_| AtomicBool::new(false))
            .collect(),
    );
    let durations: Arc<Vec<AtomicU64>> =
        Arc::new((0..num_chunks).map(|_| AtomicU64::new(0)).collect());

    let start = Instant::now();
    let mut idx = 0;
    let mut range_min = SEARCH_RANGE_MIN;
    while range_min <= SEARCH_RANGE_MAX {
        let primes = primes.clone();
        let durations = durations.clone();
        pool.execute(move || {
            let chunk_start = Instant::now();
            let range_max = (range_min + CHUNK_SZ - 1).min(SEARCH_RANGE_MAX);
            for num in range_min..=range_max {
                primes[num as usize].store(is_prime(num), Ordering::Relaxed);
            }
            let elapsed_ms = chunk_start.elapsed().as_millis() as u64;
            durations[idx as usize].store(elapsed_ms, Ordering::Relaxed);
        });

        idx += 1;
        range_min += CHUNK_SZ;
    }

    pool.drain();
    let total = start.elapsed();

    println!("Duration (ms)");
    for (i, duration) in durations.iter().enumerate() {
        println!("{i:5}: {:3}", duration.load(Ordering::Relaxed));
    }

    println!("----------");
    println!("Total: {}", total.as_millis());

    let num_primes = primes
        .iter()
        .skip(SEARCH_RANGE_MIN as usize)
        .filter(|p| p.load(Ordering::Relaxed))
        .count();
    println!("Number of primes: {num_primes}");

    Ok(())
}
