//! Collaborators shared by the integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use switchyard::request::{
    Destination, ManualTimerService, Request, RequestContext, RequestExecution, RequestSender,
    RequestStateMachine, RetrySetting, SendError,
};

pub const SECOND: u64 = 1_000_000_000;
pub const CLIENT_KEY: u64 = 42;
pub const DESTINATION: Destination = 7;

/// Sender that records every request and can be told to refuse.
#[derive(Debug, Default)]
pub struct RecordingSender {
    sent: RefCell<Vec<(Destination, u64)>>,
    refuse_with: Cell<Option<SendError>>,
}

impl RecordingSender {
    pub fn refuse_with(&self, error: SendError) {
        self.refuse_with.set(Some(error));
    }

    pub fn sent(&self) -> usize {
        self.sent.borrow().len()
    }
}

impl RequestSender for RecordingSender {
    fn send_request(&self, destination: Destination, request: &Request) -> Result<(), SendError> {
        if let Some(error) = self.refuse_with.get() {
            return Err(error);
        }
        self.sent
            .borrow_mut()
            .push((destination, request.client_key));
        Ok(())
    }
}

pub struct Harness {
    pub sender: Rc<RecordingSender>,
    pub timers: Rc<ManualTimerService>,
    pub request: RequestStateMachine,
}

impl Harness {
    pub fn new(setting: RetrySetting) -> Self {
        Self::build(setting, |context| context)
    }

    /// Like [`new`](Self::new), with a chance to adjust the context.
    pub fn build(
        setting: RetrySetting,
        customize: impl FnOnce(RequestContext) -> RequestContext,
    ) -> Self {
        let sender = Rc::new(RecordingSender::default());
        let timers = Rc::new(ManualTimerService::new());
        let execution = Rc::new(RequestExecution::new(
            setting,
            sender.clone(),
            timers.clone(),
        ));
        let table = RequestStateMachine::table().unwrap();
        let context = RequestContext::new(
            execution,
            DESTINATION,
            Request::new(CLIENT_KEY, "new_order"),
        );
        Self {
            sender,
            timers,
            request: RequestStateMachine::new(table, customize(context)),
        }
    }

    /// Advance virtual time and feed whatever fired into the request.
    pub fn advance(&mut self, delta_ns: u64) -> usize {
        let fired = self.timers.advance(delta_ns);
        let count = fired.len();
        for event in fired {
            self.request.on_timer(event).unwrap();
        }
        count
    }
}
