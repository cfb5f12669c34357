//! Outbound side of the protocol.

use super::types::{Destination, Request};
use thiserror::Error;

/// Synchronous status reported by a sender that could not accept a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("Back pressure from destination")]
    Backpressure,

    #[error("Insufficient space in outbound buffer")]
    InsufficientSpace,

    #[error("Destination is closed")]
    Closed,
}

/// Puts a request on the wire. Never blocks.
///
/// A failed send is terminal for the request; it is not retried the way a
/// timeout is.
pub trait RequestSender {
    fn send_request(&self, destination: Destination, request: &Request) -> Result<(), SendError>;
}
