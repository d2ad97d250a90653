use std::sync::{Condvar, Mutex};

use crate::error::{Error, Result};

/// A single-shot countdown that blocks threads until its weight reaches zero.
///
/// The weight stands for some quantity of outstanding work, usually a number of tasks that must
/// finish.  Each completion calls [`Latch::decrement`]; threads blocked in [`Latch::wait`] are all
/// released on the transition to zero.  Unlike a semaphore, a latch is not reusable: once the
/// weight hits zero it stays there.
///
/// Decrementing a latch that is already at zero is a well-defined no-op, so callers need not count
/// completions exactly as long as they perform at least `weight` of them.
pub struct Latch {
    weight: Mutex<u32>,
    cond: Condvar,
}

impl Latch {
    /// A latch of weight one.
    pub fn new() -> Latch {
        Latch {
            weight: Mutex::new(1),
            cond: Condvar::new(),
        }
    }

    /// A latch of the given weight.  Zero is rejected; a latch that starts released is a bug in
    /// the caller's accounting.
    pub fn with_weight(weight: u32) -> Result<Latch> {
        if weight == 0 {
            return Err(Error::ZeroLatchWeight { weight });
        }

        Ok(Latch {
            weight: Mutex::new(weight),
            cond: Condvar::new(),
        })
    }

    /// Decrement the weight by one, waking all waiters when it reaches zero.
    ///
    /// May be called from any thread, concurrently with `wait` and with other decrements.
    pub fn decrement(&self) {
        let mut weight = self.weight.lock().unwrap();

        match *weight {
            // Saturate rather than underflow.
            0 => {}
            1 => {
                *weight = 0;
                self.cond.notify_all();
            }
            _ => *weight -= 1,
        }
    }

    /// Block the calling thread until the weight is zero.  Returns immediately if it already is.
    pub fn wait(&self) {
        let mut weight = self.weight.lock().unwrap();
        while *weight > 0 {
            weight = self.cond.wait(weight).unwrap();
        }
    }
}

impl Default for Latch {
    fn default() -> Self {
        Latch::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use proptest::prelude::*;

    #[test]
    fn zero_weight_rejected() {
        assert!(Latch::with_weight(0).is_err());
    }

    #[test]
    fn weight_one() {
        let latch = Latch::new();
        latch.decrement();
        latch.wait();
    }

    #[test]
    fn weight_more_than_one() {
        let weight = 3;
        let latch = Latch::with_weight(weight).unwrap();
        for _ in 0..weight {
            latch.decrement();
        }

        latch.wait();
    }

    #[test]
    fn decrement_more_than_weight() {
        let weight = 16;
        let latch = Latch::with_weight(weight).unwrap();
        for _ in 0..2 * weight {
            latch.decrement();
        }

        latch.wait();
    }

    #[test]
    fn many_threads() {
        let weight = 16;
        let latch = Arc::new(Latch::with_weight(weight).unwrap());
        let v = Arc::new(AtomicU32::new(0));

        let mut threads = vec![];
        for _ in 0..weight {
            let latch = latch.clone();
            let v = v.clone();
            threads.push(std::thread::spawn(move || {
                v.fetch_add(1, Ordering::Relaxed);
                latch.decrement();
            }));
        }

        latch.wait();
        assert_eq!(v.load(Ordering::Relaxed), weight);

        for thread in threads {
            thread.join().unwrap();
        }
    }

    /// A waiter must stay parked through the next-to-last decrement and get released by the last
    /// one.
    #[test]
    fn waiter_released_only_at_zero() {
        let weight = 4;
        let latch = Arc::new(Latch::with_weight(weight).unwrap());
        let released = Arc::new(AtomicBool::new(false));

        let waiter = {
            let latch = latch.clone();
            let released = released.clone();
            std::thread::spawn(move || {
                latch.wait();
                released.store(true, Ordering::SeqCst);
            })
        };

        for _ in 0..weight - 1 {
            latch.decrement();
        }

        // Give a wrong implementation a chance to release the waiter early.
        std::thread::sleep(Duration::from_millis(50));
        assert!(!released.load(Ordering::SeqCst));

        latch.decrement();
        waiter.join().unwrap();
        assert!(released.load(Ordering::SeqCst));
    }

    proptest! {
        /// Any number of decrements at or above the initial weight leaves `wait` unblocked.
        #[test]
        fn enough_decrements_release(weight in 1u32..64, extra in 0u32..64) {
            let latch = Latch::with_weight(weight).unwrap();
            for _ in 0..weight + extra {
                latch.decrement();
            }

            latch.wait();
        }
    }
}
