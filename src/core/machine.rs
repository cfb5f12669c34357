//! State machine instance that walks a shared [`StateTable`].

use super::entry::Entry;
use super::history::{StateHistory, StateTransition};
use super::label::{EventId, Label, StateId, TransitionId};
use super::table::StateTable;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while driving a machine.
#[derive(Debug, Error)]
pub enum MachineError<E> {
    #[error("State {0} is not registered")]
    UnknownState(StateId),

    #[error("Entry action of state {state} failed: {source}")]
    Entry {
        state: StateId,
        #[source]
        source: E,
    },
}

impl<E> MachineError<E> {
    /// The entry-action error, if that is what this is.
    pub fn into_entry_error(self) -> Option<E> {
        match self {
            Self::Entry { source, .. } => Some(source),
            Self::UnknownState(_) => None,
        }
    }
}

/// One running machine: a shared table, a current state and a private context.
///
/// Not internally synchronized. Drive an instance from one thread at a time;
/// the `&mut self` receivers enforce that within safe code.
pub struct StateMachine<C, E> {
    name: String,
    table: Arc<StateTable<C, E>>,
    current: Option<StateId>,
    context: C,
    history: Option<StateHistory>,
}

impl<C, E> StateMachine<C, E> {
    /// Create a machine that has not been started yet.
    pub fn new(name: impl Into<String>, table: Arc<StateTable<C, E>>, context: C) -> Self {
        Self {
            name: name.into(),
            table,
            current: None,
            context,
            history: None,
        }
    }

    /// Keep a bounded history of state entries.
    pub fn with_history(mut self, capacity: usize) -> Self {
        self.history = Some(StateHistory::with_capacity(capacity));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &Arc<StateTable<C, E>> {
        &self.table
    }

    /// Current state id, `None` until started.
    pub fn current_state(&self) -> Option<StateId> {
        self.current
    }

    /// Current state as a typed label.
    pub fn current_label<L: Label>(&self) -> Option<L> {
        self.current.and_then(L::from_id)
    }

    pub fn is_started(&self) -> bool {
        self.current.is_some()
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    pub fn into_context(self) -> C {
        self.context
    }

    pub fn history(&self) -> Option<&StateHistory> {
        self.history.as_ref()
    }

    /// Enter `initial` and run its entry action with [`Entry::INITIAL`].
    ///
    /// On an entry failure the machine is already in `initial`.
    pub fn start(&mut self, initial: StateId) -> Result<(), MachineError<E>> {
        let follow_up = self.switch(initial, Entry::INITIAL)?;
        self.drain(follow_up)
    }

    /// Handle one external event.
    ///
    /// Ignored (no state change, no side effects) when the machine has not
    /// started, when the current state has no translator for `event`, when
    /// the translator yields no transition, or when the transition is not
    /// linked from the current state. Otherwise the state switch commits
    /// first and the new state's entry action runs second; an entry failure
    /// is returned with the switch already in place.
    pub fn on_event_received(&mut self, event: EventId) -> Result<(), MachineError<E>> {
        self.drain(Some(event))
    }

    /// Typed variant of [`on_event_received`](Self::on_event_received).
    pub fn fire<L: Label>(&mut self, event: L) -> Result<(), MachineError<E>> {
        self.on_event_received(event.id())
    }

    /// Jump straight into `state`, bypassing translation and links, and run
    /// its entry action as if reached through `transition`.
    pub fn force_state(
        &mut self,
        state: StateId,
        transition: Option<TransitionId>,
    ) -> Result<(), MachineError<E>> {
        let entry = Entry {
            previous: self.current,
            transition,
        };
        let follow_up = self.switch(state, entry)?;
        self.drain(follow_up)
    }

    fn drain(&mut self, mut pending: Option<EventId>) -> Result<(), MachineError<E>> {
        while let Some(event) = pending {
            pending = self.dispatch(event)?;
        }
        Ok(())
    }

    fn dispatch(&mut self, event: EventId) -> Result<Option<EventId>, MachineError<E>> {
        let Some(current) = self.current else {
            tracing::trace!(machine = %self.name, event, "not started, event ignored");
            return Ok(None);
        };
        let Some(transition) = self.table.translate(current, event, &self.context) else {
            tracing::trace!(machine = %self.name, state = current, event, "no transition for event");
            return Ok(None);
        };
        let Some(next) = self.table.next_state(current, transition) else {
            tracing::trace!(
                machine = %self.name,
                state = current,
                event,
                transition,
                "transition not linked from state"
            );
            return Ok(None);
        };
        self.switch(next, Entry::via(current, transition))
    }

    fn switch(&mut self, next: StateId, entry: Entry) -> Result<Option<EventId>, MachineError<E>> {
        let state = self
            .table
            .state(next)
            .ok_or(MachineError::UnknownState(next))?;

        self.current = Some(next);
        if let Some(history) = self.history.as_mut() {
            history.record(StateTransition {
                from: entry.previous,
                to: next,
                transition: entry.transition,
                timestamp: Utc::now(),
            });
        }
        tracing::trace!(
            machine = %self.name,
            from = ?entry.previous,
            to = state.name(),
            transition = ?entry.transition,
            "state entered"
        );

        state
            .enter(&mut self.context, entry)
            .map_err(|source| MachineError::Entry {
                state: next,
                source,
            })
    }
}

impl<C: std::fmt::Debug, E> std::fmt::Debug for StateMachine<C, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMachine")
            .field("name", &self.name)
            .field("table", &self.table.name())
            .field("current", &self.current)
            .field("context", &self.context)
            .finish()
    }
}
