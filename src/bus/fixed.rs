//! Fixed-capacity, append-only bus.

use super::{deliver_to, BusError, DeliveryError, EventBus, EventSink, SubscriberId};
use crate::core::EventId;

/// Fixed-capacity, append-only bus for a population settled after warm-up.
///
/// Storage is allocated once up front; firing never allocates.
/// Unsubscribe always fails.
#[derive(Debug)]
pub struct StaticEventBus<M> {
    capacity: usize,
    machines: Vec<(SubscriberId, M)>,
}

impl<M> StaticEventBus<M> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            machines: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<M: EventSink> EventBus<M> for StaticEventBus<M> {
    fn subscribe(&mut self, id: SubscriberId, machine: M) -> Result<(), BusError> {
        if self.machines.iter().any(|(existing, _)| *existing == id) {
            return Err(BusError::DuplicateSubscriber(id));
        }
        if self.machines.len() >= self.capacity {
            return Err(BusError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        self.machines.push((id, machine));
        Ok(())
    }

    fn unsubscribe(&mut self, _id: SubscriberId) -> Result<M, BusError> {
        Err(BusError::UnsubscribeUnsupported)
    }

    fn fire_event(&mut self, event: EventId) -> Result<(), DeliveryError<M::Error>> {
        for (id, machine) in &mut self.machines {
            deliver_to(*id, machine, event)?;
        }
        Ok(())
    }

    fn get(&self, id: SubscriberId) -> Option<&M> {
        self.machines
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, machine)| machine)
    }

    fn len(&self) -> usize {
        self.machines.len()
    }
}
