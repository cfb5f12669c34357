//! Switchyard: table-driven state machines for trading-system plumbing
//!
//! A state machine here is a frozen lookup table plus a small per-instance
//! context. Tables are built once, shared through `Arc` by any number of
//! machines, and walked with dense integer ids, so dispatching an event is
//! a couple of array lookups and one closure call.
//!
//! # Core Concepts
//!
//! - **Table**: states, `(state, transition) -> next state` links and
//!   `(state, event) -> transition` translators, built with
//!   [`StateTableBuilder`](builder::StateTableBuilder)
//! - **Machine**: a current state and a context walking a shared table
//! - **Entry actions**: run on every state entry and may hand back a
//!   follow-up event, processed before the call returns
//! - **Bus**: synchronous fan-out of one event to many machines
//!
//! On top of the engine sit two specializations: the [`request`] protocol
//! (send, wait, retry with backoff, exactly-once completion) and the
//! service [`lifecycle`].
//!
//! # Example
//!
//! ```rust
//! use std::convert::Infallible;
//! use std::sync::Arc;
//! use switchyard::builder::{always, StateTableBuilder};
//! use switchyard::core::{State, StateMachine};
//!
//! let mut builder: StateTableBuilder<u32, Infallible> = StateTableBuilder::new("toggle");
//! builder.register_state(State::new(0)).unwrap();
//! builder
//!     .register_state(State::new(1).on_enter(|flips: &mut u32, _| {
//!         *flips += 1;
//!         Ok(None)
//!     }))
//!     .unwrap();
//! builder.link_states(0, 0, 1).unwrap();
//! builder.link_states(1, 0, 0).unwrap();
//! builder.register_event_translator_for(&[0, 1], 7, always(0)).unwrap();
//! let table = Arc::new(builder.build().unwrap());
//!
//! let mut machine = StateMachine::new("toggle-1", table, 0);
//! machine.start(0).unwrap();
//! machine.on_event_received(7).unwrap();
//! machine.on_event_received(9).unwrap(); // no translator, ignored
//!
//! assert_eq!(machine.current_state(), Some(1));
//! assert_eq!(*machine.context(), 1);
//! ```

pub mod builder;
pub mod bus;
pub mod config;
pub mod core;
pub mod lifecycle;
pub mod logging;
pub mod request;

// Re-export commonly used types
pub use builder::{BuildError, StateTableBuilder};
pub use bus::{DynamicEventBus, EventBus, EventSink, SingleEventBus, StaticEventBus};
pub use self::core::{
    Entry, EventId, Label, MachineError, State, StateHistory, StateId, StateMachine, StateTable,
    StateTransition, TransitionId,
};

/// Everything needed to define and drive a machine.
pub mod prelude {
    pub use crate::builder::{always, identity, BuildError, StateTableBuilder};
    pub use crate::bus::{
        BusError, DeliveryError, DynamicEventBus, EventBus, EventSink, SingleEventBus,
        StaticEventBus, SubscriberId,
    };
    pub use crate::core::{
        recovering, Entry, EntryAction, EventId, Label, MachineError, State, StateId,
        StateMachine, StateTable, TransitionId, Translator,
    };
    pub use crate::label_enum;
}
