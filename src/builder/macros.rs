//! Macros for ergonomic label declaration.

/// Declare an enum and implement [`Label`](crate::core::Label) for it.
///
/// Variants are numbered densely from zero in declaration order, which is
/// what the state table expects.
///
/// # Example
///
/// ```
/// use switchyard::label_enum;
/// use switchyard::core::Label;
///
/// label_enum! {
///     pub enum OrderState {
///         New,
///         Working,
///         Filled,
///         Rejected,
///     }
///     final: [Filled, Rejected]
///     error: [Rejected]
/// }
///
/// assert_eq!(OrderState::Working.id(), 1);
/// assert_eq!(OrderState::from_id(2), Some(OrderState::Filled));
/// assert!(OrderState::Rejected.is_error());
/// ```
#[macro_export]
macro_rules! label_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }

        $(final: [$($final:ident),* $(,)?])?
        $(error: [$($error:ident),* $(,)?])?
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
        #[repr(u16)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $name {
            /// Every variant in id order.
            pub const ALL: &'static [$name] = &[$($name::$variant),*];
        }

        impl $crate::core::Label for $name {
            fn id(self) -> u16 {
                self as u16
            }

            fn from_id(id: u16) -> Option<Self> {
                Self::ALL.get(id as usize).copied()
            }

            fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }

            fn is_final(self) -> bool {
                match self {
                    $($(Self::$final => true,)*)?
                    #[allow(unreachable_patterns)]
                    _ => false,
                }
            }

            fn is_error(self) -> bool {
                match self {
                    $($(Self::$error => true,)*)?
                    #[allow(unreachable_patterns)]
                    _ => false,
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::core::Label;

    label_enum! {
        enum TestState {
            Initial,
            Processing,
            Complete,
            Failed,
        }
        final: [Complete, Failed]
        error: [Failed]
    }

    #[test]
    fn label_enum_macro_generates_trait() {
        let state = TestState::Initial;
        assert_eq!(state.name(), "Initial");
        assert!(!state.is_final());
        assert!(!state.is_error());

        let failed = TestState::Failed;
        assert!(failed.is_final());
        assert!(failed.is_error());
    }

    #[test]
    fn label_enum_ids_are_dense_in_declaration_order() {
        for (i, state) in TestState::ALL.iter().enumerate() {
            assert_eq!(state.id() as usize, i);
            assert_eq!(TestState::from_id(i as u16), Some(*state));
        }
        assert_eq!(TestState::from_id(4), None);
    }

    #[test]
    fn label_enum_works_without_final_error() {
        label_enum! {
            enum MinimalState {
                One,
                Two,
            }
        }

        let state = MinimalState::Two;
        assert_eq!(state.id(), 1);
        assert!(!state.is_final());
        assert!(!state.is_error());
    }
}
