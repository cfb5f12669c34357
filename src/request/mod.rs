//! Reliable request/response protocol with timeout and retry.
//!
//! A request walks `Idle -> SendAndWait -> {Retry, Done}`:
//!
//! ```text
//!          Send                   RetryDelayTimeout,
//!   Idle ────────▶ SendAndWait ◀── pending response ──┐
//!    │                │    │                           │
//!    │                │    └── RequestTimeout ──▶ Retry
//!    │ other          │                            │
//!    ▼                ▼                            │
//!   Done ◀────────────┴────────────────────────────┘
//! ```
//!
//! Every path out of `SendAndWait` or `Retry` cancels the armed timer, so a
//! stale timer can never act on a finished request. A continuation response
//! received while waiting to retry skips the backoff and resumes waiting.
//! Each request ends with exactly one outcome on its [`RequestResult`].

mod completion;
mod context;
mod error;
mod machine;
mod sender;
mod setting;
mod timer;
mod types;

pub use completion::{Outcome, RequestResult};
pub use context::{HandlerError, RequestContext, RequestExecution, ResponseHandler};
pub use error::RequestError;
pub use machine::{
    build_request_table, RequestEvent, RequestMachineError, RequestState, RequestStateMachine,
    RequestTable, RequestTransition,
};
pub use sender::{RequestSender, SendError};
pub use setting::{Growth, RetrySetting, SettingViolation, UNLIMITED_RETRIES};
pub use timer::{ManualTimerService, TimerEvent, TimerHandle, TimerKind, TimerService};
pub use types::{Destination, Request, Response, ResultCode};
