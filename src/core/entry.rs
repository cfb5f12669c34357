//! Entry actions, event translators and the recovery wrapper.

use super::label::{EventId, StateId, TransitionId};
use std::fmt::Display;
use std::sync::Arc;

/// How a state was entered.
///
/// `previous` and `transition` are both `None` on the initial entry made by
/// [`StateMachine::start`](crate::core::StateMachine::start).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Entry {
    pub previous: Option<StateId>,
    pub transition: Option<TransitionId>,
}

impl Entry {
    /// Entry made when a machine starts, not caused by a transition.
    pub const INITIAL: Entry = Entry {
        previous: None,
        transition: None,
    };

    pub fn via(previous: StateId, transition: TransitionId) -> Self {
        Self {
            previous: Some(previous),
            transition: Some(transition),
        }
    }

    pub fn is_initial(&self) -> bool {
        self.previous.is_none() && self.transition.is_none()
    }
}

/// Hook run when a state is entered.
///
/// Returning `Ok(Some(event))` hands a follow-up event back to the engine,
/// which dispatches it before the current call returns.
pub type EntryAction<C, E> =
    Arc<dyn Fn(&mut C, Entry) -> Result<Option<EventId>, E> + Send + Sync>;

/// Maps an external event to a transition for one (state, event) cell.
/// `None` means the event is ignored.
pub type Translator<C> = Arc<dyn Fn(&C, EventId) -> Option<TransitionId> + Send + Sync>;

/// Wrap `action` so that a failure is logged and turned into a follow-up
/// event chosen by `on_error` (or swallowed when it returns `None`).
///
/// The engine itself always propagates entry failures; this is the opt-in
/// policy for machines that must never leave an error unhandled.
pub fn recovering<C, E, F>(action: EntryAction<C, E>, on_error: F) -> EntryAction<C, E>
where
    C: 'static,
    E: Display + 'static,
    F: Fn(&mut C, &E) -> Option<EventId> + Send + Sync + 'static,
{
    Arc::new(move |context: &mut C, entry: Entry| match action(context, entry) {
        Ok(next) => Ok(next),
        Err(err) => {
            tracing::error!(error = %err, ?entry, "entry action failed, recovering");
            Ok(on_error(context, &err))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn initial_entry_has_no_origin() {
        assert!(Entry::INITIAL.is_initial());
        assert!(!Entry::via(1, 2).is_initial());
        assert_eq!(Entry::via(1, 2).previous, Some(1));
        assert_eq!(Entry::via(1, 2).transition, Some(2));
    }

    #[test]
    fn recovering_converts_error_into_follow_up_event() {
        let failing: EntryAction<u32, Boom> = Arc::new(|count: &mut u32, _| {
            *count += 1;
            Err(Boom)
        });
        let wrapped = recovering(failing, |_: &mut u32, _: &Boom| Some(7));

        let mut count = 0;
        let result = wrapped(&mut count, Entry::INITIAL);

        assert!(matches!(result, Ok(Some(7))));
        assert_eq!(count, 1);
    }

    #[test]
    fn recovering_passes_success_through() {
        let ok: EntryAction<(), Boom> = Arc::new(|_: &mut (), _| Ok(Some(3)));
        let wrapped = recovering(ok, |_: &mut (), _: &Boom| None);

        assert!(matches!(wrapped(&mut (), Entry::INITIAL), Ok(Some(3))));
    }
}
