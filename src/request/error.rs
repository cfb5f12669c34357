//! Terminal failures of a request.

use super::sender::SendError;
use super::types::ResultCode;
use thiserror::Error;

/// Why a request ended without success.
///
/// Exactly one of these (or a success) is delivered per request through
/// [`RequestResult`](super::RequestResult).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Request could not be sent: {0}")]
    SendFailed(#[from] SendError),

    #[error("Request rejected with result {0}")]
    Rejected(ResultCode),

    #[error("Request timed out after {attempts} attempt(s)")]
    TimedOut { attempts: u32 },

    #[error("Response handler failed: {0}")]
    Handler(String),

    #[error("Request abandoned before it was sent")]
    Abandoned,

    #[error("Request failed")]
    Failed,
}
