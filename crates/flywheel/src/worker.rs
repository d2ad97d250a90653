//! A single-threaded consumer of deadline-ordered work.
//!
//! A [`Worker`] owns a timed priority queue and executes whatever task is due soonest, sleeping
//! with a computed deadline in between.  It deliberately runs on whatever thread calls
//! [`Worker::run`] rather than spawning one itself; `ThreadPool` dedicates one OS thread per
//! worker, and tests drive a worker from the test thread directly.
//!
//! Workers never exchange work with each other.  All cross-thread coordination is a single mutex
//! around the queue plus one condition variable, and the mutex is never held while a task body
//! runs, so bodies are free to block, to panic, or to re-enter [`Worker::schedule`] on the very
//! worker executing them.
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::latch::Latch;
use crate::task::TimedTask;

struct WorkerState {
    queue: BinaryHeap<Reverse<TimedTask>>,

    /// Earliest deadline in the queue.  `Some` if and only if the queue is non-empty; the run
    /// loop bounds its wait with this, so a timed wait can never expire against an empty queue
    /// and a stale wake always finds the predicate false.
    next_deadline: Option<Instant>,

    /// Set once by `drain`.  New submissions are rejected but queued work still runs.
    draining: bool,

    /// Set once by `terminate`.  Queued work is discarded at the next wake.
    terminated: bool,
}

impl WorkerState {
    /// Enqueue a task if the lifecycle still allows new work, maintaining the `next_deadline`
    /// invariant.
    fn accept(&mut self, task: TimedTask) -> bool {
        if self.draining || self.terminated {
            return false;
        }

        let deadline = task.deadline();
        self.next_deadline = Some(match self.next_deadline {
            Some(d) => d.min(deadline),
            None => deadline,
        });
        self.queue.push(Reverse(task));

        true
    }
}

/// A dedicated task executor with support for delayed and periodic work.
///
/// Tasks run in earliest-deadline-first order; ties between equal deadlines resolve in an
/// unspecified order, so submitters must not rely on FIFO among them.  Submissions are accepted
/// from any thread, including from a task body running on this worker, until the worker is
/// drained or terminated.
pub struct Worker {
    state: Mutex<WorkerState>,
    cond: Condvar,

    /// Released exactly once, when the queue empties after `drain` was called.
    drained: Latch,
}

impl Worker {
    pub fn new() -> Worker {
        Worker {
            state: Mutex::new(WorkerState {
                queue: BinaryHeap::new(),
                next_deadline: None,
                draining: false,
                terminated: false,
            }),
            cond: Condvar::new(),
            drained: Latch::new(),
        }
    }

    /// Submit a task whose deadline is `delay` from now.
    ///
    /// Returns `false` if the worker is draining or terminated at the moment of the call, in
    /// which case the task is dropped.  A `periodic` task re-submits itself with the same delay
    /// after each execution; a zero `delay` makes a periodic task spin, so callers should keep
    /// periods strictly positive.
    pub fn schedule<F>(&self, action: F, delay: Duration, periodic: bool) -> bool
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.schedule_task(TimedTask::new(Arc::new(action), delay, periodic))
    }

    fn schedule_task(&self, task: TimedTask) -> bool {
        let mut state = self.state.lock().unwrap();
        let accepted = state.accept(task);
        if accepted {
            self.cond.notify_one();
        }

        accepted
    }

    /// Stop accepting new work, then block until everything already queued has run.
    ///
    /// Idempotent: once a drain has begun, later calls return immediately without blocking.  A
    /// worker that was already terminated has no queued work left to finish, so this returns
    /// immediately for it too.
    ///
    /// Must not be called from a task running on this worker: the loop cannot empty the queue
    /// while it is blocked here, so that deadlocks.
    pub fn drain(&self) {
        {
            let mut state = self.state.lock().unwrap();
            if state.draining || state.terminated {
                return;
            }
            state.draining = true;
            self.cond.notify_one();
        }

        self.drained.wait();
    }

    /// Stop the worker at the next wake, discarding queued work.
    ///
    /// Idempotent.  An inflight task, already running outside the lock, finishes; nothing
    /// queued behind it starts.
    pub fn terminate(&self) {
        let mut state = self.state.lock().unwrap();
        if state.terminated {
            return;
        }
        state.terminated = true;
        self.cond.notify_one();
    }

    /// Continuously execute tasks in deadline order, until terminated or until drained and out
    /// of work.
    ///
    /// This is the body of a worker thread.  A task body that panics unwinds through this call
    /// and kills the hosting thread; the worker does not try to recover, but the lock is never
    /// held across the body, so the queue state stays sound.
    pub fn run(&self) {
        log::debug!("Worker loop starting");
        let mut state = self.state.lock().unwrap();

        loop {
            if state.terminated {
                log::debug!("Worker loop exiting: terminated");
                return;
            }

            if state.draining && state.queue.is_empty() {
                log::debug!("Worker loop exiting: drained");
                self.drained.decrement();
                return;
            }

            let now = Instant::now();
            let head_due = state.next_deadline.map(|d| d <= now).unwrap_or(false);
            if !head_due {
                // Nothing is due yet.  Sleep until the earliest deadline, or until notified when
                // the queue is empty; every wake re-evaluates the predicate above, so spurious
                // wakes are harmless.
                state = match state.next_deadline {
                    Some(deadline) => {
                        let timeout = deadline.saturating_duration_since(now);
                        self.cond.wait_timeout(state, timeout).unwrap().0
                    }
                    None => self.cond.wait(state).unwrap(),
                };
                continue;
            }

            let Reverse(task) = state
                .queue
                .pop()
                .expect("next_deadline was set, so the queue cannot be empty");
            state.next_deadline = state.queue.peek().map(|Reverse(t)| t.deadline());

            if task.is_periodic() {
                // Back into the queue before the body runs.  The attempt goes through the normal
                // acceptance check, so a drain that began while this occurrence was queued makes
                // the task quietly disappear.
                state.accept(task.next_occurrence());
            }

            drop(state);
            task.run();
            state = self.state.lock().unwrap();
        }
    }
}

impl Default for Worker {
    fn default() -> Self {
        Worker::new()
    }
}
