//! Synchronous event fan-out to many state machines.
//!
//! Three interchangeable strategies share the [`EventBus`] contract:
//!
//! - [`DynamicEventBus`]: keyed, insertion-ordered, supports unsubscribe.
//!   Use it when the machine population changes at runtime.
//! - [`StaticEventBus`]: fixed capacity, append-only. Use it when the
//!   population is fixed after warm-up.
//! - [`SingleEventBus`]: exactly one machine, for a dedicated per-entity
//!   dispatcher.
//!
//! Delivery is synchronous, on the calling thread, in registration order.
//! The first machine that fails aborts delivery to the rest; callers that
//! need isolation wrap each machine themselves.

mod dynamic;
mod fixed;
mod single;

pub use dynamic::DynamicEventBus;
pub use fixed::StaticEventBus;
pub use single::SingleEventBus;

use crate::core::{EventId, MachineError, StateMachine};
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

/// Key a machine is subscribed under.
pub type SubscriberId = u64;

/// Errors from subscription management.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("Subscriber {0} is already registered")]
    DuplicateSubscriber(SubscriberId),

    #[error("Subscriber {0} is not registered")]
    UnknownSubscriber(SubscriberId),

    #[error("Bus is full (capacity {capacity})")]
    CapacityExceeded { capacity: usize },

    #[error("Bus does not support unsubscribe")]
    UnsubscribeUnsupported,
}

/// A machine's failure while handling a fired event.
#[derive(Debug, Error)]
#[error("Subscriber {subscriber} failed on event {event}: {source}")]
pub struct DeliveryError<E> {
    pub subscriber: SubscriberId,
    pub event: EventId,
    #[source]
    pub source: E,
}

/// Anything that can take an event off a bus.
pub trait EventSink {
    type Error;

    fn deliver(&mut self, event: EventId) -> Result<(), Self::Error>;
}

impl<C, E> EventSink for StateMachine<C, E> {
    type Error = MachineError<E>;

    fn deliver(&mut self, event: EventId) -> Result<(), Self::Error> {
        self.on_event_received(event)
    }
}

impl<T: EventSink + ?Sized> EventSink for Box<T> {
    type Error = T::Error;

    fn deliver(&mut self, event: EventId) -> Result<(), Self::Error> {
        (**self).deliver(event)
    }
}

/// Shared machine, so one instance can sit on several buses.
///
/// # Panics
///
/// Panics if the machine is already borrowed, i.e. when a bus fires back
/// into a machine from inside that same machine's entry action.
impl<T: EventSink + ?Sized> EventSink for Rc<RefCell<T>> {
    type Error = T::Error;

    fn deliver(&mut self, event: EventId) -> Result<(), Self::Error> {
        self.borrow_mut().deliver(event)
    }
}

/// Contract shared by every fan-out strategy.
pub trait EventBus<M: EventSink> {
    /// Register `machine` under `id`.
    fn subscribe(&mut self, id: SubscriberId, machine: M) -> Result<(), BusError>;

    /// Remove and return the machine registered under `id`.
    fn unsubscribe(&mut self, id: SubscriberId) -> Result<M, BusError>;

    /// Deliver `event` to every machine in registration order.
    fn fire_event(&mut self, event: EventId) -> Result<(), DeliveryError<M::Error>>;

    fn get(&self, id: SubscriberId) -> Option<&M>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn deliver_to<M: EventSink>(
    subscriber: SubscriberId,
    machine: &mut M,
    event: EventId,
) -> Result<(), DeliveryError<M::Error>> {
    machine.deliver(event).map_err(|source| {
        tracing::debug!(subscriber, event, "delivery failed, aborting fan-out");
        DeliveryError {
            subscriber,
            event,
            source,
        }
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{EventSink, SubscriberId};
    use crate::core::EventId;
    use std::cell::RefCell;
    use std::convert::Infallible;
    use std::rc::Rc;

    /// Delivery log shared by several [`Journal`] sinks.
    pub type SharedLog = Rc<RefCell<Vec<(SubscriberId, EventId)>>>;

    /// Sink that appends `(id, event)` to a log shared with other sinks,
    /// so the order across machines is visible.
    #[derive(Debug)]
    pub struct Journal {
        pub id: SubscriberId,
        pub log: SharedLog,
    }

    impl Journal {
        pub fn new(id: SubscriberId, log: &SharedLog) -> Self {
            Self {
                id,
                log: Rc::clone(log),
            }
        }
    }

    impl EventSink for Journal {
        type Error = Infallible;

        fn deliver(&mut self, event: EventId) -> Result<(), Infallible> {
            self.log.borrow_mut().push((self.id, event));
            Ok(())
        }
    }

    /// Sink that records what it saw and fails on one chosen event.
    #[derive(Debug, Default)]
    pub struct Recorder {
        pub seen: Vec<EventId>,
        pub fail_on: Option<EventId>,
    }

    #[derive(Debug, PartialEq, Eq, thiserror::Error)]
    #[error("recorder refused event {0}")]
    pub struct Refused(pub EventId);

    impl EventSink for Recorder {
        type Error = Refused;

        fn deliver(&mut self, event: EventId) -> Result<(), Refused> {
            if self.fail_on == Some(event) {
                return Err(Refused(event));
            }
            self.seen.push(event);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::Recorder;
    use super::*;
    use crate::builder::{always, StateTableBuilder};
    use crate::core::State;
    use std::convert::Infallible;
    use std::sync::Arc;

    #[test]
    fn shared_machine_receives_events_from_every_bus() {
        let mut builder: StateTableBuilder<u32, Infallible> = StateTableBuilder::new("counter");
        builder
            .register_state(State::new(0).on_enter(|hits: &mut u32, _| {
                *hits += 1;
                Ok(None)
            }))
            .unwrap();
        builder.link_states(0, 0, 0).unwrap();
        builder.register_event_translator(0, 1, always(0)).unwrap();
        let table = Arc::new(builder.build().unwrap());

        let machine = Rc::new(RefCell::new(StateMachine::new("shared", table, 0)));
        machine.borrow_mut().start(0).unwrap();

        let mut market_data = DynamicEventBus::new();
        let mut timers = SingleEventBus::new();
        market_data.subscribe(1, Rc::clone(&machine)).unwrap();
        timers.subscribe(1, Rc::clone(&machine)).unwrap();

        market_data.fire_event(1).unwrap();
        timers.fire_event(1).unwrap();

        assert_eq!(*machine.borrow().context(), 3);
    }

    #[test]
    fn boxed_sinks_can_be_mixed() {
        let mut bus: DynamicEventBus<Box<Recorder>> = DynamicEventBus::new();
        bus.subscribe(1, Box::default()).unwrap();
        bus.fire_event(4).unwrap();

        assert_eq!(bus.get(1).map(|r| r.seen.clone()), Some(vec![4]));
    }
}
