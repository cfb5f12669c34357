//! Builder API for state table construction.
//!
//! This module provides the table builder, translator helpers and the
//! `label_enum!` macro for naming ids with minimal boilerplate.

pub mod error;
pub mod macros;
pub mod table;

pub use error::BuildError;
pub use table::StateTableBuilder;

use crate::core::{EventId, TransitionId};

/// Translator that maps every event to the same transition.
///
/// # Example
///
/// ```
/// use switchyard::builder::{always, StateTableBuilder};
/// use switchyard::core::State;
/// use std::convert::Infallible;
///
/// let mut builder: StateTableBuilder<(), Infallible> = StateTableBuilder::new("doc");
/// builder.register_state(State::new(0)).unwrap();
/// builder.register_event_translator(0, 4, always(1)).unwrap();
///
/// let table = builder.build().unwrap();
/// assert_eq!(table.translate(0, 4, &()), Some(1));
/// ```
pub fn always<C>(
    transition: TransitionId,
) -> impl Fn(&C, EventId) -> Option<TransitionId> + Send + Sync + 'static {
    move |_: &C, _: EventId| Some(transition)
}

/// Translator for tables whose event ids double as transition ids.
pub fn identity<C>() -> impl Fn(&C, EventId) -> Option<TransitionId> + Send + Sync + 'static {
    |_: &C, event: EventId| Some(event)
}
