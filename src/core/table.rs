//! States and the frozen, dense state table.

use super::entry::{Entry, EntryAction, Translator};
use super::label::{EventId, Label, StateId, TransitionId};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// A state in a table: an id, a diagnostic name and an optional entry action.
///
/// States hold no mutable data. The same table, and therefore the same
/// `State`, is shared by every machine instance built from it; per-instance
/// data lives in the machine's context.
pub struct State<C, E> {
    id: StateId,
    name: Cow<'static, str>,
    on_enter: Option<EntryAction<C, E>>,
}

impl<C, E> State<C, E> {
    /// Create a state without an entry action.
    pub fn new(id: StateId) -> Self {
        Self {
            id,
            name: Cow::Owned(format!("state-{id}")),
            on_enter: None,
        }
    }

    /// Create a state whose id and name come from a [`Label`].
    pub fn labelled<L: Label>(label: L) -> Self {
        Self {
            id: label.id(),
            name: Cow::Borrowed(label.name()),
            on_enter: None,
        }
    }

    /// Override the diagnostic name.
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the entry action.
    pub fn on_enter<F>(mut self, action: F) -> Self
    where
        F: Fn(&mut C, Entry) -> Result<Option<EventId>, E> + Send + Sync + 'static,
    {
        self.on_enter = Some(Arc::new(action));
        self
    }

    /// Set a pre-built (possibly wrapped) entry action.
    pub fn with_entry_action(mut self, action: EntryAction<C, E>) -> Self {
        self.on_enter = Some(action);
        self
    }

    pub fn id(&self) -> StateId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_entry_action(&self) -> bool {
        self.on_enter.is_some()
    }

    pub(crate) fn enter(&self, context: &mut C, entry: Entry) -> Result<Option<EventId>, E> {
        match &self.on_enter {
            Some(action) => action(context, entry),
            None => Ok(None),
        }
    }
}

impl<C, E> Clone for State<C, E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            on_enter: self.on_enter.clone(),
        }
    }
}

impl<C, E> fmt::Debug for State<C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("has_entry_action", &self.on_enter.is_some())
            .finish()
    }
}

/// Immutable lookup table walked by [`StateMachine`](crate::core::StateMachine).
///
/// Produced by [`StateTableBuilder::build`](crate::builder::StateTableBuilder::build).
/// Rows are indexed by state id; the transition and translator grids are
/// rectangular and stored row-major, so every lookup is one multiply and
/// one index. Absent cells are `None`.
pub struct StateTable<C, E> {
    name: String,
    states: Vec<Option<State<C, E>>>,
    next_states: Vec<Option<StateId>>,
    transition_width: usize,
    translators: Vec<Option<Translator<C>>>,
    event_width: usize,
}

impl<C, E> StateTable<C, E> {
    pub(crate) fn from_parts(
        name: String,
        states: Vec<Option<State<C, E>>>,
        next_states: Vec<Option<StateId>>,
        transition_width: usize,
        translators: Vec<Option<Translator<C>>>,
        event_width: usize,
    ) -> Self {
        debug_assert_eq!(next_states.len(), states.len() * transition_width);
        debug_assert_eq!(translators.len(), states.len() * event_width);
        Self {
            name,
            states,
            next_states,
            transition_width,
            translators,
            event_width,
        }
    }

    /// Table name, used as a prefix in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of state slots (`max state id + 1`), registered or not.
    pub fn state_slots(&self) -> usize {
        self.states.len()
    }

    /// Number of registered states.
    pub fn state_count(&self) -> usize {
        self.states.iter().filter(|s| s.is_some()).count()
    }

    /// Look up a registered state.
    #[inline]
    pub fn state(&self, id: StateId) -> Option<&State<C, E>> {
        self.states.get(id as usize).and_then(Option::as_ref)
    }

    /// Next state for `(state, transition)`, if linked.
    #[inline]
    pub fn next_state(&self, state: StateId, transition: TransitionId) -> Option<StateId> {
        let transition = transition as usize;
        if transition >= self.transition_width {
            return None;
        }
        self.next_states
            .get(state as usize * self.transition_width + transition)
            .copied()
            .flatten()
    }

    /// Translator registered for `(state, event)`.
    #[inline]
    pub fn translator(&self, state: StateId, event: EventId) -> Option<&Translator<C>> {
        let event = event as usize;
        if event >= self.event_width {
            return None;
        }
        self.translators
            .get(state as usize * self.event_width + event)
            .and_then(Option::as_ref)
    }

    /// Translate `event` in `state` against `context`.
    #[inline]
    pub fn translate(&self, state: StateId, event: EventId, context: &C) -> Option<TransitionId> {
        self.translator(state, event)
            .and_then(|translate| translate(context, event))
    }
}

impl<C, E> fmt::Debug for StateTable<C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateTable")
            .field("name", &self.name)
            .field("states", &self.state_count())
            .field("transition_width", &self.transition_width)
            .field("event_width", &self.event_width)
            .finish()
    }
}
