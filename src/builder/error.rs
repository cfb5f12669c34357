//! Build errors for state tables.

use crate::core::{EventId, StateId, TransitionId};
use thiserror::Error;

/// Errors returned by [`StateTableBuilder`](crate::builder::StateTableBuilder).
///
/// A failed registration leaves the builder untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("State {0} is already registered")]
    DuplicateState(StateId),

    #[error("State {0} is not registered")]
    UnknownState(StateId),

    #[error("State {state} already links transition {transition}")]
    DuplicateLink {
        state: StateId,
        transition: TransitionId,
    },

    #[error("State {state} already translates event {event}")]
    DuplicateTranslator { state: StateId, event: EventId },

    #[error("No states registered. Call .register_state(state) before .build()")]
    NoStates,
}
