//! Per-request execution state.

use super::completion::{Outcome, RequestResult};
use super::error::RequestError;
use super::sender::{RequestSender, SendError};
use super::setting::RetrySetting;
use super::timer::{TimerEvent, TimerHandle, TimerKind, TimerService};
use super::types::{Destination, Request, Response, ResultCode};
use std::fmt;
use std::rc::Rc;
use uuid::Uuid;

/// Error type user response handlers may return.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Inspects every successful response before the machine classifies it.
pub type ResponseHandler = Box<dyn FnMut(&Response) -> Result<(), HandlerError>>;

/// What every request of one type shares: its retry policy and the
/// collaborators used to send and to arm timers.
pub struct RequestExecution {
    setting: RetrySetting,
    sender: Rc<dyn RequestSender>,
    timers: Rc<dyn TimerService>,
}

impl RequestExecution {
    pub fn new(
        setting: RetrySetting,
        sender: Rc<dyn RequestSender>,
        timers: Rc<dyn TimerService>,
    ) -> Self {
        Self {
            setting,
            sender,
            timers,
        }
    }

    pub fn setting(&self) -> &RetrySetting {
        &self.setting
    }

    pub fn timers(&self) -> &Rc<dyn TimerService> {
        &self.timers
    }
}

impl fmt::Debug for RequestExecution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecution")
            .field("setting", &self.setting)
            .finish_non_exhaustive()
    }
}

/// Context of one in-flight request.
///
/// Holds at most one armed timer at a time; every arm is preceded by a
/// cancel of whatever was armed before.
pub struct RequestContext {
    execution: Rc<RequestExecution>,
    destination: Destination,
    request: Request,
    correlation_id: Uuid,
    retry_count: u32,
    start_time_ns: Option<u64>,
    active_timer: Option<TimerHandle>,
    cause: Option<RequestError>,
    last_response: Option<Response>,
    handler: Option<ResponseHandler>,
    result: RequestResult,
}

impl RequestContext {
    pub fn new(execution: Rc<RequestExecution>, destination: Destination, request: Request) -> Self {
        Self {
            execution,
            destination,
            request,
            correlation_id: Uuid::new_v4(),
            retry_count: 0,
            start_time_ns: None,
            active_timer: None,
            cause: None,
            last_response: None,
            handler: None,
            result: RequestResult::new(),
        }
    }

    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&Response) -> Result<(), HandlerError> + 'static,
    {
        self.handler = Some(Box::new(handler));
        self
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn client_key(&self) -> u64 {
        self.request.client_key
    }

    pub fn destination(&self) -> Destination {
        self.destination
    }

    /// Random id attached to every log line about this request.
    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn start_time_ns(&self) -> Option<u64> {
        self.start_time_ns
    }

    pub fn result(&self) -> &RequestResult {
        &self.result
    }

    pub fn last_response(&self) -> Option<&Response> {
        self.last_response.as_ref()
    }

    pub fn has_active_timer(&self) -> bool {
        self.active_timer.is_some()
    }

    pub fn setting(&self) -> &RetrySetting {
        &self.execution.setting
    }

    pub(crate) fn can_retry(&self) -> bool {
        self.execution.setting.can_retry(self.retry_count)
    }

    pub(crate) fn increment_retry_count(&mut self) -> u32 {
        self.retry_count = self.retry_count.saturating_add(1);
        self.retry_count
    }

    pub(crate) fn set_cause(&mut self, cause: RequestError) {
        self.cause = Some(cause);
    }

    pub(crate) fn take_cause(&mut self) -> Option<RequestError> {
        self.cause.take()
    }

    pub(crate) fn set_last_response(&mut self, response: Response) {
        self.last_response = Some(response);
    }

    /// Run the user handler, if any, against a successful response.
    pub(crate) fn handle_response(&mut self, response: &Response) -> Result<(), HandlerError> {
        match self.handler.as_mut() {
            Some(handler) => handler(response),
            None => Ok(()),
        }
    }

    /// Send the request and arm the request timeout.
    ///
    /// The first send also stamps the start time. Nothing is armed when the
    /// sender refuses the request.
    pub(crate) fn send_and_start_request_timeout(&mut self) -> Result<(), SendError> {
        self.cancel_active_timer();
        if self.start_time_ns.is_none() {
            self.start_time_ns = Some(self.execution.timers.now_ns());
        }
        if let Err(err) = self
            .execution
            .sender
            .send_request(self.destination, &self.request)
        {
            tracing::warn!(
                correlation_id = %self.correlation_id,
                client_key = self.request.client_key,
                destination = self.destination,
                error = %err,
                "request send failed"
            );
            return Err(err);
        }
        self.arm(TimerKind::RequestTimeout, self.execution.setting.timeout_ns);
        Ok(())
    }

    /// Replace the active timer with a fresh request timeout, without resending.
    pub(crate) fn restart_request_timeout(&mut self) {
        self.cancel_active_timer();
        self.arm(TimerKind::RequestTimeout, self.execution.setting.timeout_ns);
    }

    pub(crate) fn start_retry_delay_timer(&mut self) {
        self.cancel_active_timer();
        let delay_ns = self.execution.setting.compute_delay_ns(self.retry_count);
        self.arm(TimerKind::RetryDelay, delay_ns);
    }

    pub(crate) fn cancel_active_timer(&mut self) {
        if let Some(timer) = self.active_timer.take() {
            timer.cancel();
            tracing::debug!(
                correlation_id = %self.correlation_id,
                kind = ?timer.event().kind,
                "timer cancelled"
            );
        }
    }

    fn arm(&mut self, kind: TimerKind, delay_ns: u64) {
        debug_assert!(self.active_timer.is_none(), "timer armed twice");
        let event = TimerEvent {
            client_key: self.request.client_key,
            kind,
        };
        self.active_timer = Some(self.execution.timers.arm(delay_ns, event));
    }

    /// Fulfil the result. `false` when it was already fulfilled.
    pub(crate) fn complete(&mut self, outcome: Outcome) -> bool {
        let code = match &outcome {
            Ok(_) => ResultCode::Ok,
            Err(RequestError::TimedOut { .. }) => ResultCode::Timeout,
            Err(RequestError::Rejected(code)) => *code,
            Err(_) => ResultCode::Failed,
        };
        let accepted = self.result.complete(outcome);
        if accepted {
            self.request.result = Some(code);
        }
        accepted
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("correlation_id", &self.correlation_id)
            .field("destination", &self.destination)
            .field("request", &self.request)
            .field("retry_count", &self.retry_count)
            .field("active_timer", &self.active_timer)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}
