//! Scope-bound timers
//!
//! Handlers schedule timeouts on the shared [`Timers`] queue and keep the
//! returned [`TimerHandle`]. Dropping the handle cancels the timer, so a
//! handler that is popped, replaced or torn down during bail-out can never
//! receive a stale timeout. The queue itself only stores deadlines; the
//! dispatcher polls it for expired ids and routes each id to whichever
//! handler still owns it.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Instant;

/// Timer identifier, unique for the lifetime of a queue
pub type TimerId = u64;

#[derive(Debug, Default)]
struct TimerQueue {
    next_id: TimerId,
    deadlines: BTreeMap<TimerId, Instant>,
}

/// Shared timer queue
#[derive(Debug, Clone, Default)]
pub struct Timers {
    queue: Rc<RefCell<TimerQueue>>,
}

impl Timers {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a timer firing at `deadline`
    pub fn schedule(&self, deadline: Instant) -> TimerHandle {
        let mut queue = self.queue.borrow_mut();
        queue.next_id += 1;
        let id = queue.next_id;
        queue.deadlines.insert(id, deadline);
        TimerHandle {
            id,
            deadline,
            queue: Rc::downgrade(&self.queue),
        }
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.borrow().deadlines.values().min().copied()
    }

    /// Remove and return every timer due at `now`, earliest first
    pub fn take_expired(&self, now: Instant) -> Vec<TimerId> {
        let mut queue = self.queue.borrow_mut();
        let mut due: Vec<(Instant, TimerId)> = queue
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(id, deadline)| (*deadline, *id))
            .collect();
        due.sort();
        for (_, id) in &due {
            queue.deadlines.remove(id);
        }
        due.into_iter().map(|(_, id)| id).collect()
    }

    /// Number of pending timers
    pub fn pending(&self) -> usize {
        self.queue.borrow().deadlines.len()
    }

    /// Whether a timer is still pending
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.queue.borrow().deadlines.contains_key(&id)
    }
}

/// Owning handle of a scheduled timer. Dropping it cancels the timer.
pub struct TimerHandle {
    id: TimerId,
    deadline: Instant,
    queue: Weak<RefCell<TimerQueue>>,
}

impl TimerHandle {
    /// Identifier delivered when the timer fires
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// Scheduled deadline
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Whether `id` belongs to this handle
    pub fn owns(&self, id: TimerId) -> bool {
        self.id == id
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("id", &self.id)
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        if let Some(queue) = self.queue.upgrade() {
            if let Ok(mut queue) = queue.try_borrow_mut() {
                queue.deadlines.remove(&self.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    #[test]
    fn test_expired_in_deadline_order() {
        let timers = Timers::new();
        let now = Instant::now();
        let late = timers.schedule(now + Duration::from_millis(20));
        let early = timers.schedule(now + Duration::from_millis(10));
        let _future = timers.schedule(now + Duration::from_secs(5));

        assert_eq!(timers.next_deadline(), Some(early.deadline()));
        let fired = timers.take_expired(now + Duration::from_millis(30));
        assert_eq!(fired, vec![early.id(), late.id()]);
        assert_eq!(timers.pending(), 1);
    }

    #[test]
    fn test_drop_cancels() {
        let timers = Timers::new();
        let now = Instant::now();
        let handle = timers.schedule(now);
        let id = handle.id();
        assert!(timers.is_pending(id));
        drop(handle);
        assert!(!timers.is_pending(id));
        assert!(timers.take_expired(now + Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn test_handle_outlives_queue() {
        let handle = {
            let timers = Timers::new();
            timers.schedule(Instant::now())
        };
        drop(handle);
    }

    proptest! {
        #[test]
        fn prop_dropped_timers_never_fire(
            delays in prop::collection::vec(0u64..100, 1..30),
            keep in prop::collection::vec(any::<bool>(), 30),
        ) {
            let timers = Timers::new();
            let now = Instant::now();
            let mut kept = Vec::new();
            let mut dropped = Vec::new();
            for (i, delay) in delays.iter().enumerate() {
                let handle = timers.schedule(now + Duration::from_millis(*delay));
                if keep[i] {
                    kept.push(handle);
                } else {
                    dropped.push(handle.id());
                }
            }
            let fired = timers.take_expired(now + Duration::from_millis(100));
            for id in &dropped {
                prop_assert!(!fired.contains(id));
            }
            prop_assert_eq!(fired.len(), kept.len());
        }
    }
}
