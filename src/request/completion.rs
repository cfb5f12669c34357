//! Exactly-once completion of a request.

use super::error::RequestError;
use super::types::Response;
use std::cell::RefCell;
use std::rc::Rc;

/// Terminal outcome of a request.
pub type Outcome = Result<Response, RequestError>;

/// Single-shot completion shared between a request machine and its caller.
///
/// The first call to [`complete`](Self::complete) wins; later calls are
/// ignored and report `false`.
#[derive(Clone, Debug, Default)]
pub struct RequestResult {
    outcome: Rc<RefCell<Option<Outcome>>>,
}

impl RequestResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn complete(&self, outcome: Outcome) -> bool {
        let mut slot = self.outcome.borrow_mut();
        if slot.is_some() {
            tracing::debug!(?outcome, "request already completed, outcome dropped");
            return false;
        }
        *slot = Some(outcome);
        true
    }

    pub fn is_done(&self) -> bool {
        self.outcome.borrow().is_some()
    }

    pub fn is_success(&self) -> bool {
        matches!(*self.outcome.borrow(), Some(Ok(_)))
    }

    pub fn is_failed(&self) -> bool {
        matches!(*self.outcome.borrow(), Some(Err(_)))
    }

    /// Copy of the outcome, `None` while the request is in flight.
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome.borrow().clone()
    }

    pub fn error(&self) -> Option<RequestError> {
        self.outcome
            .borrow()
            .as_ref()
            .and_then(|outcome| outcome.as_ref().err().cloned())
    }
}
