//! Fan-out of immediate work across a fixed set of workers.
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::worker::Worker;

/// A fixed collection of OS threads on which work can be executed.
///
/// Each thread runs one [`Worker`] loop for the life of the pool.  Submissions are spread across
/// the workers round-robin, which costs a single atomic increment and keeps assignment balanced
/// under uniform submission rates; uneven task cost is accepted, and workers never steal from one
/// another.
///
/// The pool's own surface only does immediate execution.  Delayed and periodic work is a
/// per-worker capability: callers that need it should own a [`Worker`] directly, which keeps the
/// dispatch policy here trivial.
pub struct ThreadPool {
    workers: Vec<Arc<Worker>>,

    /// Joined (and emptied) by whichever of `drain`/`tear_down`/`Drop` gets there first.
    threads: Mutex<Vec<JoinHandle<()>>>,

    next_worker: AtomicU32,
}

impl ThreadPool {
    /// A pool with one thread per unit of available parallelism, or a single thread if the
    /// platform will not say.
    pub fn new() -> Result<ThreadPool> {
        let threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        ThreadPool::with_threads(threads)
    }

    /// A pool with exactly `threads` threads.  Zero is rejected.
    pub fn with_threads(threads: usize) -> Result<ThreadPool> {
        if threads == 0 {
            return Err(Error::ZeroPoolSize { threads });
        }

        let workers: Vec<Arc<Worker>> = (0..threads).map(|_| Arc::new(Worker::new())).collect();
        let handles = workers
            .iter()
            .map(|worker| {
                let worker = Arc::clone(worker);
                std::thread::spawn(move || worker.run())
            })
            .collect();

        log::debug!("Started thread pool with {threads} worker threads");

        Ok(ThreadPool {
            workers,
            threads: Mutex::new(handles),
            next_worker: AtomicU32::new(0),
        })
    }

    /// Submit a task for immediate execution on one of the pool's workers.
    ///
    /// Never blocks beyond one uncontended mutex acquisition.  Calling this concurrently with
    /// `drain` or `tear_down` carries no guarantee: the chosen worker may already be shutting
    /// down, in which case the task is silently dropped.
    pub fn execute<F>(&self, action: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        // The counter free-runs; wrapping past u32::MAX just restarts the cycle.
        let idx = self.next_worker.fetch_add(1, Ordering::Relaxed) as usize % self.workers.len();
        let _ = self.workers[idx].schedule(action, Duration::ZERO, false);
    }

    /// Gracefully shut down: stop accepting work, let everything already accepted finish, and
    /// join the worker threads.
    ///
    /// Afterwards the pool is terminal; later `execute` calls still dispatch, but every worker
    /// rejects them.
    pub fn drain(&self) {
        for worker in &self.workers {
            worker.drain();
        }
        self.join_threads();
        log::debug!("Thread pool drained");
    }

    /// Forcefully shut down: discard queued work, let inflight tasks finish, and join the worker
    /// threads.  Idempotent; the destructor does the same thing.
    pub fn tear_down(&self) {
        for worker in &self.workers {
            worker.terminate();
        }
        self.join_threads();
        log::debug!("Thread pool torn down");
    }

    fn join_threads(&self) {
        let handles = std::mem::take(&mut *self.threads.lock().unwrap());
        for handle in handles {
            if handle.join().is_err() {
                // A panicking action is a caller bug; all that can be done here is note that the
                // thread died with it.
                log::error!("A worker thread exited with a panic");
            }
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.tear_down();
    }
}
