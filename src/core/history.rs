//! State transition history tracking.
//!
//! Machines can optionally keep a bounded log of the states they entered.
//! Long-lived machines (service lifecycles) turn this on for diagnostics;
//! per-request machines leave it off to stay allocation-free.

use super::label::{StateId, TransitionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Record of a single state entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    /// State being left; `None` for the initial entry or a forced jump
    pub from: Option<StateId>,
    /// State being entered
    pub to: StateId,
    /// Transition taken; `None` for the initial entry or a forced jump
    pub transition: Option<TransitionId>,
    /// When the entry happened
    pub timestamp: DateTime<Utc>,
}

/// Bounded, ordered history of state entries.
///
/// Once `capacity` records are held, recording a new one drops the oldest.
///
/// # Example
///
/// ```rust
/// use switchyard::core::{StateHistory, StateTransition};
/// use chrono::Utc;
///
/// let mut history = StateHistory::with_capacity(8);
/// history.record(StateTransition { from: None, to: 0, transition: None, timestamp: Utc::now() });
/// history.record(StateTransition { from: Some(0), to: 2, transition: Some(1), timestamp: Utc::now() });
///
/// assert_eq!(history.get_path(), vec![0, 2]);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateHistory {
    capacity: usize,
    transitions: VecDeque<StateTransition>,
}

impl StateHistory {
    pub const DEFAULT_CAPACITY: usize = 256;

    /// Create an empty history holding at most `capacity` records.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            transitions: VecDeque::with_capacity(capacity.clamp(1, Self::DEFAULT_CAPACITY)),
        }
    }

    /// Append a record, evicting the oldest one when full.
    pub fn record(&mut self, transition: StateTransition) {
        if self.transitions.len() == self.capacity {
            self.transitions.pop_front();
        }
        self.transitions.push_back(transition);
    }

    /// States entered, in order.
    ///
    /// Starts with the `from` of the oldest record when there is one, so a
    /// history that began with a real transition still shows its origin.
    pub fn get_path(&self) -> Vec<StateId> {
        let mut path = Vec::with_capacity(self.transitions.len() + 1);
        if let Some(origin) = self.transitions.front().and_then(|t| t.from) {
            path.push(origin);
        }
        path.extend(self.transitions.iter().map(|t| t.to));
        path
    }

    /// Elapsed time between the oldest and newest record.
    pub fn duration(&self) -> Option<Duration> {
        let first = self.transitions.front()?;
        let last = self.transitions.back()?;
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    pub fn transitions(&self) -> impl ExactSizeIterator<Item = &StateTransition> {
        self.transitions.iter()
    }

    pub fn last(&self) -> Option<&StateTransition> {
        self.transitions.back()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

impl Default for StateHistory {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}
