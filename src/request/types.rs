//! Request and response values carried through the protocol.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies the service a request is sent to.
pub type Destination = u32;

/// Outcome code carried by a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultCode {
    Ok,
    Failed,
    Timeout,
    NotFound,
    Rejected,
}

impl ResultCode {
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "OK",
            Self::Failed => "FAILED",
            Self::Timeout => "TIMEOUT",
            Self::NotFound => "NOT_FOUND",
            Self::Rejected => "REJECTED",
        };
        f.write_str(name)
    }
}

/// An outbound request.
///
/// `client_key` ties responses and timer events back to the request that
/// owns them. `result` is filled in when the request reaches its end.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub client_key: u64,
    pub request_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub result: Option<ResultCode>,
}

impl Request {
    pub fn new(client_key: u64, request_type: impl Into<String>) -> Self {
        Self {
            client_key,
            request_type: request_type.into(),
            payload: serde_json::Value::Null,
            result: None,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// An inbound response, possibly one of several for the same request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub client_key: u64,
    /// `false` while more continuations are expected.
    pub last: bool,
    pub result: ResultCode,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Response {
    /// Final successful response.
    pub fn ok(client_key: u64) -> Self {
        Self {
            client_key,
            last: true,
            result: ResultCode::Ok,
            payload: serde_json::Value::Null,
        }
    }

    /// Successful continuation; more responses follow.
    pub fn pending(client_key: u64) -> Self {
        Self {
            last: false,
            ..Self::ok(client_key)
        }
    }

    /// Final failed response.
    pub fn failed(client_key: u64, result: ResultCode) -> Self {
        Self {
            result,
            ..Self::ok(client_key)
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_constructors_set_flags() {
        assert!(Response::ok(1).last);
        assert!(!Response::pending(1).last);
        assert_eq!(Response::pending(1).result, ResultCode::Ok);
        assert_eq!(Response::failed(1, ResultCode::NotFound).result, ResultCode::NotFound);
    }

    #[test]
    fn request_deserializes_without_optional_fields() {
        let request: Request =
            serde_json::from_str(r#"{"client_key": 9, "request_type": "subscribe"}"#).unwrap();

        assert_eq!(request, Request::new(9, "subscribe"));
    }
}
