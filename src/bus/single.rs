//! Bus for a single dedicated machine.

use super::{deliver_to, BusError, DeliveryError, EventBus, EventSink, SubscriberId};
use crate::core::EventId;

/// Bus holding exactly one machine.
#[derive(Debug)]
pub struct SingleEventBus<M> {
    slot: Option<(SubscriberId, M)>,
}

impl<M> SingleEventBus<M> {
    pub fn new() -> Self {
        Self { slot: None }
    }
}

impl<M> Default for SingleEventBus<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: EventSink> EventBus<M> for SingleEventBus<M> {
    fn subscribe(&mut self, id: SubscriberId, machine: M) -> Result<(), BusError> {
        match &self.slot {
            Some((existing, _)) if *existing == id => Err(BusError::DuplicateSubscriber(id)),
            Some(_) => Err(BusError::CapacityExceeded { capacity: 1 }),
            None => {
                self.slot = Some((id, machine));
                Ok(())
            }
        }
    }

    fn unsubscribe(&mut self, _id: SubscriberId) -> Result<M, BusError> {
        Err(BusError::UnsubscribeUnsupported)
    }

    fn fire_event(&mut self, event: EventId) -> Result<(), DeliveryError<M::Error>> {
        match &mut self.slot {
            Some((id, machine)) => deliver_to(*id, machine, event),
            None => Ok(()),
        }
    }

    fn get(&self, id: SubscriberId) -> Option<&M> {
        self.slot
            .as_ref()
            .filter(|(existing, _)| *existing == id)
            .map(|(_, machine)| machine)
    }

    fn len(&self) -> usize {
        usize::from(self.slot.is_some())
    }
}
