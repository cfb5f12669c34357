//! Core state machine types and logic.
//!
//! This module contains the table-driven engine:
//! - Dense integer ids named through the `Label` trait
//! - States with optional entry actions, and per-cell event translators
//! - The frozen `StateTable` shared by every instance built from it
//! - `StateMachine`, which walks a table for one private context
//! - Bounded history tracking
//!
//! The engine is policy-free: entry-action failures propagate to the
//! caller unless a state opts into [`recovering`].

mod entry;
mod history;
mod label;
mod machine;
mod table;

pub use entry::{recovering, Entry, EntryAction, Translator};
pub use history::{StateHistory, StateTransition};
pub use label::{label_name, EventId, Label, StateId, TransitionId};
pub use machine::{MachineError, StateMachine};
pub use table::{State, StateTable};
