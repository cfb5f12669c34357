//! The request protocol machine: send, wait, retry, done.

use super::context::RequestContext;
use super::error::RequestError;
use super::timer::{TimerEvent, TimerKind};
use super::types::Response;
use super::completion::RequestResult;
use crate::builder::{always, BuildError, StateTableBuilder};
use crate::core::{
    Entry, EventId, Label, MachineError, State, StateMachine, StateTable, TransitionId,
};
use crate::label_enum;
use std::convert::Infallible;
use std::sync::Arc;

label_enum! {
    /// States of a request.
    pub enum RequestState {
        Idle,
        SendAndWait,
        Retry,
        Done,
    }
    final: [Done]
}

label_enum! {
    /// Inputs to a request machine.
    pub enum RequestEvent {
        Send,
        Response,
        RequestTimeout,
        RetryDelayTimeout,
        Failure,
        SendFailed,
    }
}

label_enum! {
    /// Edges of the request table.
    pub enum RequestTransition {
        Send,
        Pending,
        Retry,
        Complete,
        Fail,
        Timeout,
        SendFailed,
        Abandon,
    }
}

/// Table shared by every request machine.
pub type RequestTable = StateTable<RequestContext, Infallible>;

/// Entry actions never fail; the only engine error left is a bad state id.
pub type RequestMachineError = MachineError<Infallible>;

fn link(
    builder: &mut StateTableBuilder<RequestContext, Infallible>,
    from: RequestState,
    via: RequestTransition,
    to: RequestState,
) -> Result<(), BuildError> {
    builder.link_states(from.id(), via.id(), to.id())
}

fn translate(
    builder: &mut StateTableBuilder<RequestContext, Infallible>,
    state: RequestState,
    event: RequestEvent,
    transition: RequestTransition,
) -> Result<(), BuildError> {
    builder.register_event_translator(state.id(), event.id(), always(transition.id()))
}

/// Classify the response stashed in the context.
///
/// A last response completes; a continuation yields `pending`.
fn classify_response(
    pending: Option<RequestTransition>,
) -> impl Fn(&RequestContext, EventId) -> Option<TransitionId> + Send + Sync + 'static {
    move |context: &RequestContext, _: EventId| match context.last_response() {
        Some(response) if response.last => Some(RequestTransition::Complete.id()),
        Some(_) => pending.map(Label::id),
        None => None,
    }
}

fn request_timed_out(context: &RequestContext, _: EventId) -> Option<TransitionId> {
    let transition = if context.can_retry() {
        RequestTransition::Retry
    } else {
        RequestTransition::Timeout
    };
    Some(transition.id())
}

fn enter_send_and_wait(
    context: &mut RequestContext,
    entry: Entry,
) -> Result<Option<EventId>, Infallible> {
    match entry.transition.and_then(RequestTransition::from_id) {
        Some(RequestTransition::Send) => {
            if entry.previous == Some(RequestState::Retry.id()) {
                let attempt = context.increment_retry_count();
                tracing::debug!(
                    correlation_id = %context.correlation_id(),
                    attempt,
                    "resending request"
                );
            }
            if let Err(err) = context.send_and_start_request_timeout() {
                context.set_cause(RequestError::SendFailed(err));
                return Ok(Some(RequestEvent::SendFailed.id()));
            }
        }
        Some(RequestTransition::Pending) => context.restart_request_timeout(),
        _ => {}
    }
    Ok(None)
}

fn enter_retry(context: &mut RequestContext, _: Entry) -> Result<Option<EventId>, Infallible> {
    context.start_retry_delay_timer();
    Ok(None)
}

fn enter_done(context: &mut RequestContext, entry: Entry) -> Result<Option<EventId>, Infallible> {
    context.cancel_active_timer();
    let outcome = match entry.transition.and_then(RequestTransition::from_id) {
        Some(RequestTransition::Complete) => context
            .last_response()
            .cloned()
            .ok_or(RequestError::Failed),
        Some(RequestTransition::Timeout) => Err(context.take_cause().unwrap_or(
            RequestError::TimedOut {
                attempts: context.retry_count().saturating_add(1),
            },
        )),
        Some(RequestTransition::Abandon) => Err(RequestError::Abandoned),
        _ => Err(context.take_cause().unwrap_or(RequestError::Failed)),
    };
    tracing::debug!(
        correlation_id = %context.correlation_id(),
        client_key = context.client_key(),
        retries = context.retry_count(),
        ?outcome,
        "request done"
    );
    context.complete(outcome);
    Ok(None)
}

/// Build the request table.
///
/// Build it once and share the `Arc` across every request.
pub fn build_request_table() -> Result<RequestTable, BuildError> {
    use RequestEvent as Ev;
    use RequestState as St;
    use RequestTransition as Tr;

    let mut builder = StateTableBuilder::new("request");
    builder.register_state(State::labelled(St::Idle))?;
    builder.register_state(State::labelled(St::SendAndWait).on_enter(enter_send_and_wait))?;
    builder.register_state(State::labelled(St::Retry).on_enter(enter_retry))?;
    builder.register_state(State::labelled(St::Done).on_enter(enter_done))?;

    link(&mut builder, St::Idle, Tr::Send, St::SendAndWait)?;
    link(&mut builder, St::Idle, Tr::Abandon, St::Done)?;

    link(&mut builder, St::SendAndWait, Tr::Retry, St::Retry)?;
    link(&mut builder, St::SendAndWait, Tr::Complete, St::Done)?;
    link(&mut builder, St::SendAndWait, Tr::Fail, St::Done)?;
    link(&mut builder, St::SendAndWait, Tr::Timeout, St::Done)?;
    link(&mut builder, St::SendAndWait, Tr::SendFailed, St::Done)?;

    link(&mut builder, St::Retry, Tr::Send, St::SendAndWait)?;
    link(&mut builder, St::Retry, Tr::Pending, St::SendAndWait)?;
    link(&mut builder, St::Retry, Tr::Complete, St::Done)?;
    link(&mut builder, St::Retry, Tr::Fail, St::Done)?;

    // anything but Send abandons an idle request
    translate(&mut builder, St::Idle, Ev::Send, Tr::Send)?;
    for event in [
        Ev::Response,
        Ev::RequestTimeout,
        Ev::RetryDelayTimeout,
        Ev::Failure,
        Ev::SendFailed,
    ] {
        translate(&mut builder, St::Idle, event, Tr::Abandon)?;
    }

    // a stray retry-delay timeout in SendAndWait has no translator
    translate(&mut builder, St::SendAndWait, Ev::Send, Tr::Fail)?;
    translate(&mut builder, St::SendAndWait, Ev::SendFailed, Tr::SendFailed)?;
    builder.register_event_translator(
        St::SendAndWait.id(),
        Ev::Response.id(),
        classify_response(None),
    )?;
    builder.register_event_translator(
        St::SendAndWait.id(),
        Ev::RequestTimeout.id(),
        request_timed_out,
    )?;

    translate(&mut builder, St::Retry, Ev::Send, Tr::Send)?;
    translate(&mut builder, St::Retry, Ev::RetryDelayTimeout, Tr::Send)?;
    builder.register_event_translator(
        St::Retry.id(),
        Ev::Response.id(),
        classify_response(Some(Tr::Pending)),
    )?;

    builder.register_event_translator_for(
        &[St::SendAndWait.id(), St::Retry.id()],
        Ev::Failure.id(),
        always(Tr::Fail.id()),
    )?;

    builder.build()
}

/// Drives one request through the protocol.
///
/// ```
/// use std::rc::Rc;
/// use switchyard::request::*;
///
/// struct Accept;
/// impl RequestSender for Accept {
///     fn send_request(&self, _: Destination, _: &Request) -> Result<(), SendError> {
///         Ok(())
///     }
/// }
///
/// let timers = Rc::new(ManualTimerService::new());
/// let execution = Rc::new(RequestExecution::new(
///     RetrySetting::new(5_000, 1_000, 1),
///     Rc::new(Accept),
///     timers.clone(),
/// ));
/// let table = RequestStateMachine::table().unwrap();
/// let context = RequestContext::new(execution, 1, Request::new(42, "ping"));
/// let mut request = RequestStateMachine::new(table, context);
///
/// request.start().unwrap();
/// request.on_response(Response::ok(42)).unwrap();
///
/// assert_eq!(request.state(), Some(RequestState::Done));
/// assert!(request.result().is_success());
/// ```
#[derive(Debug)]
pub struct RequestStateMachine {
    machine: StateMachine<RequestContext, Infallible>,
}

impl RequestStateMachine {
    /// Build a fresh shared request table.
    pub fn table() -> Result<Arc<RequestTable>, BuildError> {
        build_request_table().map(Arc::new)
    }

    pub fn new(table: Arc<RequestTable>, context: RequestContext) -> Self {
        let name = format!("request-{}", context.client_key());
        Self {
            machine: StateMachine::new(name, table, context),
        }
    }

    /// Enter IDLE. Nothing is sent yet.
    pub fn init(&mut self) -> Result<(), RequestMachineError> {
        self.machine.start(RequestState::Idle.id())
    }

    /// Send the request, entering IDLE first if needed.
    pub fn start(&mut self) -> Result<(), RequestMachineError> {
        if !self.machine.is_started() {
            self.init()?;
        }
        self.machine.fire(RequestEvent::Send)
    }

    /// Feed a response for this request.
    ///
    /// While the request is in flight, successful responses pass through the
    /// user handler first; a handler error becomes the failure cause. A
    /// response in IDLE abandons the request without reaching the handler.
    /// An error result code fails the request whether or not the response
    /// is the last one.
    pub fn on_response(&mut self, response: Response) -> Result<(), RequestMachineError> {
        let context = self.machine.context();
        if response.client_key != context.client_key() {
            tracing::trace!(
                expected = context.client_key(),
                received = response.client_key,
                "response for another request ignored"
            );
            return Ok(());
        }
        match self.state() {
            None => {
                tracing::trace!(client_key = response.client_key, "response before init ignored");
                return Ok(());
            }
            Some(RequestState::Done) => {
                tracing::trace!(client_key = response.client_key, "late response absorbed");
                return Ok(());
            }
            // nothing was sent yet: abandon without consulting the handler
            Some(RequestState::Idle) => return self.machine.fire(RequestEvent::Response),
            Some(RequestState::SendAndWait | RequestState::Retry) => {}
        }

        let context = self.machine.context_mut();
        if !response.result.is_ok() {
            context.set_cause(RequestError::Rejected(response.result));
            context.set_last_response(response);
            return self.machine.fire(RequestEvent::Failure);
        }
        if let Err(err) = context.handle_response(&response) {
            tracing::error!(
                correlation_id = %context.correlation_id(),
                error = %err,
                "response handler failed"
            );
            context.set_cause(RequestError::Handler(err.to_string()));
            return self.machine.fire(RequestEvent::Failure);
        }
        context.set_last_response(response);
        self.machine.fire(RequestEvent::Response)
    }

    /// Feed an expired timer for this request.
    pub fn on_timer(&mut self, event: TimerEvent) -> Result<(), RequestMachineError> {
        if event.client_key != self.machine.context().client_key() {
            tracing::trace!(?event, "timer for another request ignored");
            return Ok(());
        }
        let event = match event.kind {
            TimerKind::RequestTimeout => RequestEvent::RequestTimeout,
            TimerKind::RetryDelay => RequestEvent::RetryDelayTimeout,
        };
        self.machine.fire(event)
    }

    /// Fail the request from outside, e.g. when the destination went away.
    pub fn on_failure(&mut self, cause: RequestError) -> Result<(), RequestMachineError> {
        if self.is_done() {
            return Ok(());
        }
        self.machine.context_mut().set_cause(cause);
        self.machine.fire(RequestEvent::Failure)
    }

    pub fn state(&self) -> Option<RequestState> {
        self.machine.current_label()
    }

    pub fn is_done(&self) -> bool {
        self.state().is_some_and(Label::is_final)
    }

    /// Handle to the completion; clones share the same outcome.
    pub fn result(&self) -> RequestResult {
        self.machine.context().result().clone()
    }

    pub fn context(&self) -> &RequestContext {
        self.machine.context()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_table_builds() {
        let table = build_request_table().unwrap();
        assert_eq!(table.state_count(), 4);
        assert_eq!(
            table.next_state(RequestState::Retry.id(), RequestTransition::Pending.id()),
            Some(RequestState::SendAndWait.id())
        );
    }

    #[test]
    fn done_has_no_translators() {
        let table = build_request_table().unwrap();
        for event in RequestEvent::ALL {
            assert!(table.translator(RequestState::Done.id(), event.id()).is_none());
        }
    }

    #[test]
    fn stray_timeouts_are_not_translated() {
        let table = build_request_table().unwrap();
        assert!(table
            .translator(
                RequestState::SendAndWait.id(),
                RequestEvent::RetryDelayTimeout.id()
            )
            .is_none());
        assert!(table
            .translator(RequestState::Retry.id(), RequestEvent::RequestTimeout.id())
            .is_none());
    }
}
