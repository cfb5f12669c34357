//! One-shot timers owned by a request.
//!
//! Timers never call back into a machine directly. Arming hands the service
//! a [`TimerEvent`]; when the deadline passes, the owning loop receives that
//! event and feeds it to the request identified by `client_key`.

use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Which of a request's timers went off.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerKind {
    RequestTimeout,
    RetryDelay,
}

/// Delivered to the owning loop when a timer expires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerEvent {
    pub client_key: u64,
    pub kind: TimerKind,
}

/// Handle to one armed timer.
///
/// [`cancel`](Self::cancel) is idempotent and safe after the timer fired.
#[derive(Debug)]
pub struct TimerHandle {
    event: TimerEvent,
    deadline_ns: u64,
    cancelled: Rc<Cell<bool>>,
}

impl TimerHandle {
    pub fn new(event: TimerEvent, deadline_ns: u64, cancelled: Rc<Cell<bool>>) -> Self {
        Self {
            event,
            deadline_ns,
            cancelled,
        }
    }

    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }

    pub fn event(&self) -> TimerEvent {
        self.event
    }

    pub fn deadline_ns(&self) -> u64 {
        self.deadline_ns
    }
}

/// Fire-and-forget one-shot timers on the caller's clock.
pub trait TimerService {
    /// Current time in nanoseconds.
    fn now_ns(&self) -> u64;

    /// Deliver `event` once `delay_ns` has elapsed, unless cancelled first.
    fn arm(&self, delay_ns: u64, event: TimerEvent) -> TimerHandle;
}

#[derive(Debug)]
struct Armed {
    deadline_ns: u64,
    seq: u64,
    event: TimerEvent,
    cancelled: Rc<Cell<bool>>,
}

#[derive(Debug, Default)]
struct Clock {
    now_ns: u64,
    next_seq: u64,
    armed: Vec<Armed>,
    arm_log: Vec<(u64, TimerEvent)>,
}

/// Deterministic timer service driven by virtual time.
///
/// Time only moves when [`advance`](Self::advance) or
/// [`advance_to`](Self::advance_to) is called. Expired timers are returned
/// in deadline order (ties in arming order); cancelled timers never fire.
#[derive(Debug, Default)]
pub struct ManualTimerService {
    clock: RefCell<Clock>,
}

impl ManualTimerService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(now_ns: u64) -> Self {
        let service = Self::default();
        service.clock.borrow_mut().now_ns = now_ns;
        service
    }

    /// Move the clock forward by `delta_ns` and collect what fired.
    pub fn advance(&self, delta_ns: u64) -> Vec<TimerEvent> {
        let target = self.clock.borrow().now_ns.saturating_add(delta_ns);
        self.advance_to(target)
    }

    /// Move the clock to `now_ns` (never backwards) and collect what fired.
    pub fn advance_to(&self, now_ns: u64) -> Vec<TimerEvent> {
        let mut clock = self.clock.borrow_mut();
        clock.now_ns = clock.now_ns.max(now_ns);
        let now = clock.now_ns;

        let (mut due, pending): (Vec<Armed>, Vec<Armed>) = clock
            .armed
            .drain(..)
            .partition(|armed| armed.deadline_ns <= now);
        clock.armed = pending;

        due.retain(|armed| !armed.cancelled.get());
        due.sort_by_key(|armed| (armed.deadline_ns, armed.seq));
        due.into_iter()
            .map(|armed| {
                // a fired timer counts as cancelled for its handle
                armed.cancelled.set(true);
                tracing::debug!(?armed.event, deadline_ns = armed.deadline_ns, "timer fired");
                armed.event
            })
            .collect()
    }

    /// Timers armed and not yet fired or cancelled.
    pub fn pending(&self) -> Vec<TimerEvent> {
        self.clock
            .borrow()
            .armed
            .iter()
            .filter(|armed| !armed.cancelled.get())
            .map(|armed| armed.event)
            .collect()
    }

    /// Every `(delay_ns, event)` ever armed, in arming order.
    pub fn arm_log(&self) -> Vec<(u64, TimerEvent)> {
        self.clock.borrow().arm_log.clone()
    }

    /// Deadline of the earliest live timer, if any.
    pub fn next_deadline_ns(&self) -> Option<u64> {
        let clock = self.clock.borrow();
        clock
            .armed
            .iter()
            .filter(|armed| !armed.cancelled.get())
            .map(|armed| armed.deadline_ns)
            .min()
    }
}

impl TimerService for ManualTimerService {
    fn now_ns(&self) -> u64 {
        self.clock.borrow().now_ns
    }

    fn arm(&self, delay_ns: u64, event: TimerEvent) -> TimerHandle {
        let mut clock = self.clock.borrow_mut();
        let deadline_ns = clock.now_ns.saturating_add(delay_ns);
        let seq = clock.next_seq;
        clock.next_seq += 1;
        let cancelled = Rc::new(Cell::new(false));
        clock.armed.push(Armed {
            deadline_ns,
            seq,
            event,
            cancelled: Rc::clone(&cancelled),
        });
        clock.arm_log.push((delay_ns, event));
        tracing::debug!(?event, delay_ns, deadline_ns, "timer armed");
        TimerHandle::new(event, deadline_ns, cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeout(client_key: u64) -> TimerEvent {
        TimerEvent {
            client_key,
            kind: TimerKind::RequestTimeout,
        }
    }

    #[test]
    fn timers_fire_in_deadline_order() {
        let timers = ManualTimerService::new();
        timers.arm(30, timeout(3));
        timers.arm(10, timeout(1));
        timers.arm(20, timeout(2));

        assert!(timers.advance(5).is_empty());
        assert_eq!(timers.advance(25), vec![timeout(1), timeout(2), timeout(3)]);
        assert!(timers.pending().is_empty());
        assert_eq!(timers.now_ns(), 30);
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let timers = ManualTimerService::starting_at(100);
        let handle = timers.arm(10, timeout(1));
        handle.cancel();
        handle.cancel();

        assert!(handle.is_cancelled());
        assert!(timers.advance(50).is_empty());
        assert_eq!(handle.deadline_ns(), 110);
    }

    #[test]
    fn cancel_after_fire_is_harmless() {
        let timers = ManualTimerService::new();
        let handle = timers.arm(1, timeout(7));

        assert_eq!(timers.advance(1), vec![timeout(7)]);
        handle.cancel();
        assert!(timers.advance(100).is_empty());
    }

    #[test]
    fn clock_never_goes_backwards() {
        let timers = ManualTimerService::starting_at(50);
        timers.advance_to(10);

        assert_eq!(timers.now_ns(), 50);
        timers.arm(5, timeout(1));
        assert_eq!(timers.next_deadline_ns(), Some(55));
        assert_eq!(timers.arm_log(), vec![(5, timeout(1))]);
    }
}
