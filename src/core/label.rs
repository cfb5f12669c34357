//! Typed names for the dense integer ids walked by the engine.
//!
//! The engine only ever sees `u16` ids. Specializations give those ids
//! names by implementing [`Label`] on a plain enum, usually through the
//! [`label_enum!`](crate::label_enum) macro.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Identifier of a state. Dense, starting at zero.
pub type StateId = u16;

/// Identifier of a transition, scoped per source state.
pub type TransitionId = u16;

/// Identifier of an external event.
pub type EventId = u16;

/// Trait for enums that name state, transition or event ids.
///
/// All methods are pure. `from_id(x.id())` must return `Some(x)`.
///
/// # Example
///
/// ```rust
/// use switchyard::core::Label;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
/// enum Light {
///     Red,
///     Green,
/// }
///
/// impl Label for Light {
///     fn id(self) -> u16 {
///         self as u16
///     }
///
///     fn from_id(id: u16) -> Option<Self> {
///         match id {
///             0 => Some(Self::Red),
///             1 => Some(Self::Green),
///             _ => None,
///         }
///     }
///
///     fn name(self) -> &'static str {
///         match self {
///             Self::Red => "Red",
///             Self::Green => "Green",
///         }
///     }
/// }
///
/// assert_eq!(Light::from_id(Light::Green.id()), Some(Light::Green));
/// ```
pub trait Label:
    Copy + Eq + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Dense numeric id used for table indexing.
    fn id(self) -> u16;

    /// Reverse lookup of [`Label::id`].
    fn from_id(id: u16) -> Option<Self>;

    /// Name for display and logging.
    fn name(self) -> &'static str;

    /// Check if this label marks a terminal state.
    ///
    /// Default implementation returns `false`.
    fn is_final(self) -> bool {
        false
    }

    /// Check if this label marks an error state.
    ///
    /// Default implementation returns `false`.
    fn is_error(self) -> bool {
        false
    }
}

/// Resolve a raw id to its label name, falling back to `"?"`.
pub fn label_name<L: Label>(id: u16) -> &'static str {
    L::from_id(id).map_or("?", Label::name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
    enum TestState {
        Initial,
        Processing,
        Complete,
        Failed,
    }

    impl Label for TestState {
        fn id(self) -> u16 {
            self as u16
        }

        fn from_id(id: u16) -> Option<Self> {
            match id {
                0 => Some(Self::Initial),
                1 => Some(Self::Processing),
                2 => Some(Self::Complete),
                3 => Some(Self::Failed),
                _ => None,
            }
        }

        fn name(self) -> &'static str {
            match self {
                Self::Initial => "Initial",
                Self::Processing => "Processing",
                Self::Complete => "Complete",
                Self::Failed => "Failed",
            }
        }

        fn is_final(self) -> bool {
            matches!(self, Self::Complete | Self::Failed)
        }

        fn is_error(self) -> bool {
            matches!(self, Self::Failed)
        }
    }

    #[test]
    fn id_round_trips_through_from_id() {
        for state in [
            TestState::Initial,
            TestState::Processing,
            TestState::Complete,
            TestState::Failed,
        ] {
            assert_eq!(TestState::from_id(state.id()), Some(state));
        }
        assert_eq!(TestState::from_id(4), None);
    }

    #[test]
    fn is_final_identifies_terminal_states() {
        assert!(!TestState::Initial.is_final());
        assert!(!TestState::Processing.is_final());
        assert!(TestState::Complete.is_final());
        assert!(TestState::Failed.is_final());
        assert!(TestState::Failed.is_error());
        assert!(!TestState::Complete.is_error());
    }

    #[test]
    fn label_name_falls_back_for_unknown_ids() {
        assert_eq!(label_name::<TestState>(1), "Processing");
        assert_eq!(label_name::<TestState>(99), "?");
    }

    #[test]
    fn label_serializes_by_variant_name() {
        let json = serde_json::to_string(&TestState::Processing).unwrap();
        assert_eq!(json, "\"Processing\"");
        let back: TestState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TestState::Processing);
    }
}
