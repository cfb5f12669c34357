//! Builder for constructing state tables.

use crate::builder::error::BuildError;
use crate::core::{EventId, State, StateId, StateTable, TransitionId, Translator};
use std::collections::HashMap;
use std::sync::Arc;

/// Collects states, links and translators, then freezes them into a
/// [`StateTable`].
///
/// Registration is map-backed and checks for duplicates on every call; it
/// runs once at startup. Every registration returns a `Result` and a failed
/// call changes nothing.
pub struct StateTableBuilder<C, E> {
    name: String,
    states: HashMap<StateId, State<C, E>>,
    links: HashMap<(StateId, TransitionId), StateId>,
    translators: HashMap<(StateId, EventId), Translator<C>>,
}

impl<C, E> StateTableBuilder<C, E> {
    /// Create a new builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            states: HashMap::new(),
            links: HashMap::new(),
            translators: HashMap::new(),
        }
    }

    /// Register a state. Fails if its id is already taken.
    pub fn register_state(&mut self, state: State<C, E>) -> Result<(), BuildError> {
        if self.states.contains_key(&state.id()) {
            return Err(BuildError::DuplicateState(state.id()));
        }
        self.states.insert(state.id(), state);
        Ok(())
    }

    /// Link `(state, transition)` to `next`.
    ///
    /// Both states must be registered and the pair must not be linked yet.
    pub fn link_states(
        &mut self,
        state: StateId,
        transition: TransitionId,
        next: StateId,
    ) -> Result<(), BuildError> {
        self.ensure_registered(state)?;
        self.ensure_registered(next)?;
        if self.links.contains_key(&(state, transition)) {
            return Err(BuildError::DuplicateLink { state, transition });
        }
        self.links.insert((state, transition), next);
        Ok(())
    }

    /// Register the translator used when `event` arrives in `state`.
    pub fn register_event_translator<F>(
        &mut self,
        state: StateId,
        event: EventId,
        translator: F,
    ) -> Result<(), BuildError>
    where
        F: Fn(&C, EventId) -> Option<TransitionId> + Send + Sync + 'static,
    {
        self.register_shared_translator(state, event, Arc::new(translator))
    }

    /// Register an already shared translator for `(state, event)`.
    pub fn register_shared_translator(
        &mut self,
        state: StateId,
        event: EventId,
        translator: Translator<C>,
    ) -> Result<(), BuildError> {
        self.ensure_translatable(state, event)?;
        self.translators.insert((state, event), translator);
        Ok(())
    }

    /// Register one translator for `event` in each of `states`.
    ///
    /// All states are checked before anything is inserted, so a failure
    /// leaves every cell untouched.
    pub fn register_event_translator_for<F>(
        &mut self,
        states: &[StateId],
        event: EventId,
        translator: F,
    ) -> Result<(), BuildError>
    where
        F: Fn(&C, EventId) -> Option<TransitionId> + Send + Sync + 'static,
    {
        for (i, &state) in states.iter().enumerate() {
            self.ensure_translatable(state, event)?;
            if states[..i].contains(&state) {
                return Err(BuildError::DuplicateTranslator { state, event });
            }
        }
        let translator: Translator<C> = Arc::new(translator);
        for &state in states {
            self.translators
                .insert((state, event), Arc::clone(&translator));
        }
        Ok(())
    }

    pub fn is_registered(&self, state: StateId) -> bool {
        self.states.contains_key(&state)
    }

    /// Freeze into dense arrays.
    pub fn build(self) -> Result<StateTable<C, E>, BuildError> {
        let Some(max_state) = self.states.keys().copied().max() else {
            return Err(BuildError::NoStates);
        };
        let state_slots = max_state as usize + 1;
        let transition_width = self
            .links
            .keys()
            .map(|&(_, transition)| transition as usize + 1)
            .max()
            .unwrap_or(0);
        let event_width = self
            .translators
            .keys()
            .map(|&(_, event)| event as usize + 1)
            .max()
            .unwrap_or(0);

        let mut states: Vec<Option<State<C, E>>> = (0..state_slots).map(|_| None).collect();
        for (id, state) in self.states {
            states[id as usize] = Some(state);
        }

        let mut next_states = vec![None; state_slots * transition_width];
        for ((state, transition), next) in self.links {
            next_states[state as usize * transition_width + transition as usize] = Some(next);
        }

        let mut translators: Vec<Option<Translator<C>>> =
            (0..state_slots * event_width).map(|_| None).collect();
        for ((state, event), translator) in self.translators {
            translators[state as usize * event_width + event as usize] = Some(translator);
        }

        tracing::debug!(
            table = %self.name,
            states = state_slots,
            transitions = transition_width,
            events = event_width,
            "state table built"
        );

        Ok(StateTable::from_parts(
            self.name,
            states,
            next_states,
            transition_width,
            translators,
            event_width,
        ))
    }

    fn ensure_registered(&self, state: StateId) -> Result<(), BuildError> {
        if self.states.contains_key(&state) {
            Ok(())
        } else {
            Err(BuildError::UnknownState(state))
        }
    }

    fn ensure_translatable(&self, state: StateId, event: EventId) -> Result<(), BuildError> {
        self.ensure_registered(state)?;
        if self.translators.contains_key(&(state, event)) {
            return Err(BuildError::DuplicateTranslator { state, event });
        }
        Ok(())
    }
}
