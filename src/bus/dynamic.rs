//! Keyed bus whose subscribers come and go at runtime.

use super::{deliver_to, BusError, DeliveryError, EventBus, EventSink, SubscriberId};
use crate::core::EventId;
use std::collections::HashMap;

/// Keyed, insertion-ordered bus for a population that changes at runtime.
///
/// Machines live in a `Vec` in subscription order; a side index maps each id
/// to its slot for O(1) average lookup.
#[derive(Debug)]
pub struct DynamicEventBus<M> {
    machines: Vec<(SubscriberId, M)>,
    index: HashMap<SubscriberId, usize>,
}

impl<M> DynamicEventBus<M> {
    pub fn new() -> Self {
        Self {
            machines: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            machines: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    pub fn get_mut(&mut self, id: SubscriberId) -> Option<&mut M> {
        let slot = *self.index.get(&id)?;
        self.machines.get_mut(slot).map(|(_, machine)| machine)
    }

    /// Subscriber ids in delivery order.
    pub fn ids(&self) -> impl Iterator<Item = SubscriberId> + '_ {
        self.machines.iter().map(|(id, _)| *id)
    }
}

impl<M> Default for DynamicEventBus<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: EventSink> EventBus<M> for DynamicEventBus<M> {
    fn subscribe(&mut self, id: SubscriberId, machine: M) -> Result<(), BusError> {
        if self.index.contains_key(&id) {
            return Err(BusError::DuplicateSubscriber(id));
        }
        self.index.insert(id, self.machines.len());
        self.machines.push((id, machine));
        Ok(())
    }

    fn unsubscribe(&mut self, id: SubscriberId) -> Result<M, BusError> {
        let slot = self
            .index
            .remove(&id)
            .ok_or(BusError::UnknownSubscriber(id))?;
        let (_, machine) = self.machines.remove(slot);
        for (later, _) in &self.machines[slot..] {
            if let Some(position) = self.index.get_mut(later) {
                *position -= 1;
            }
        }
        Ok(machine)
    }

    fn fire_event(&mut self, event: EventId) -> Result<(), DeliveryError<M::Error>> {
        for (id, machine) in &mut self.machines {
            deliver_to(*id, machine, event)?;
        }
        Ok(())
    }

    fn get(&self, id: SubscriberId) -> Option<&M> {
        let slot = *self.index.get(&id)?;
        self.machines.get(slot).map(|(_, machine)| machine)
    }

    fn len(&self) -> usize {
        self.machines.len()
    }
}
