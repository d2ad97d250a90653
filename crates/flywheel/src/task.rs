use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The callable body of a task.
///
/// Bodies live behind an `Arc` because a periodic task is back in the queue while its current
/// occurrence is still executing; a shared holder makes the re-submission a cheap clone.
pub(crate) type Action = Arc<dyn Fn() + Send + Sync + 'static>;

/// A unit of work with an absolute deadline on the monotonic clock.
///
/// The deadline is a "not before" point, not a schedule: a task whose deadline has passed still
/// runs, as soon as the worker gets to it.
pub(crate) struct TimedTask {
    action: Action,
    deadline: Instant,

    /// For periodic tasks this is the period; for immediate tasks it is zero.
    delay: Duration,

    periodic: bool,
}

impl TimedTask {
    /// A task due `delay` from now.
    pub(crate) fn new(action: Action, delay: Duration, periodic: bool) -> TimedTask {
        let deadline = Instant::now()
            .checked_add(delay)
            .expect("Unable to compute a deadline from the delay");

        TimedTask {
            action,
            deadline,
            delay,
            periodic,
        }
    }

    pub(crate) fn deadline(&self) -> Instant {
        self.deadline
    }

    pub(crate) fn is_periodic(&self) -> bool {
        self.periodic
    }

    /// The follow-up occurrence of a periodic task: same body, deadline one period later.
    ///
    /// The next deadline builds on the previous deadline rather than on the current time, so
    /// latency in any one execution does not drift the cadence of the ones after it.
    pub(crate) fn next_occurrence(&self) -> TimedTask {
        TimedTask {
            action: Arc::clone(&self.action),
            deadline: self.deadline + self.delay,
            delay: self.delay,
            periodic: true,
        }
    }

    /// Invoke the body.  Callers must not hold the owning worker's lock across this.
    pub(crate) fn run(&self) {
        (self.action)();
    }
}

impl fmt::Debug for TimedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimedTask")
            .field("deadline", &self.deadline)
            .field("delay", &self.delay)
            .field("periodic", &self.periodic)
            .finish()
    }
}

// Tasks order strictly by deadline; the body takes no part in comparisons, and two tasks due at
// the same instant compare equal.  Queue order among such ties is unspecified.

impl PartialEq for TimedTask {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline
    }
}

impl Eq for TimedTask {}

impl PartialOrd for TimedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        self.deadline.cmp(&other.deadline)
    }
}
