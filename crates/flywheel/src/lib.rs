//! Execution of caller-supplied work on dedicated operating system threads.
//!
//! The crate is three pieces, smallest first.  A [`Latch`] is a single-shot countdown used to
//! wait on batches of work.  A [`Worker`] owns a timed priority queue and runs tasks on one
//! thread in earliest-deadline-first order, with support for delayed and periodic submissions.
//! A [`ThreadPool`] fans immediate work out over a fixed set of workers by round-robin, one OS
//! thread per worker.
//!
//! There is no work stealing, no global ordering across workers, and no per-task cancellation;
//! the shutdown granularity is the worker, either gracefully (`drain`: accepted work finishes)
//! or forcefully (`tear_down`: queued work is discarded, the inflight task finishes).
mod error;
mod latch;
mod task;
mod thread_pool;
mod worker;

pub use error::{Error, Result};
pub use latch::Latch;
pub use thread_pool::ThreadPool;
pub use worker::Worker;
