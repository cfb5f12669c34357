//! Business-logic hooks and the status side channel.

use super::labels::{LifecycleEvent, ServiceStatus};
use thiserror::Error;

/// Failure raised by a service hook.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ServiceError(pub String);

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<&str> for ServiceError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ServiceError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

/// What an entry hook returns: optionally the next event to process.
pub type HookResult = Result<Option<LifecycleEvent>, ServiceError>;

/// Business logic plugged into the lifecycle.
///
/// Every method has a no-op default. A hook that fails moves the service
/// to STOP, except the STOP and STOPPED hooks whose failures are only
/// logged.
pub trait ServiceHooks {
    /// Called on thread start in [`ServiceMode::Start`](super::ServiceMode::Start).
    fn idle_start(&mut self) -> Result<(), ServiceError> {
        Ok(())
    }

    /// Called on thread start in [`ServiceMode::Recovery`](super::ServiceMode::Recovery).
    fn idle_recover(&mut self) -> Result<(), ServiceError> {
        Ok(())
    }

    fn waiting_for_warmup_services_enter(&mut self) -> HookResult {
        Ok(None)
    }

    fn warmup_enter(&mut self) -> HookResult {
        Ok(None)
    }

    fn reset_enter(&mut self) -> HookResult {
        Ok(None)
    }

    fn waiting_for_services_enter(&mut self) -> HookResult {
        Ok(None)
    }

    fn ready_enter(&mut self) -> HookResult {
        Ok(None)
    }

    fn recovery_enter(&mut self) -> HookResult {
        Ok(None)
    }

    fn active_enter(&mut self) -> HookResult {
        Ok(None)
    }

    /// Returning `Ok(None)` means the service thread may be stopped now.
    fn stop_enter(&mut self) -> HookResult {
        Ok(None)
    }

    fn stopped_enter(&mut self) -> Result<(), ServiceError> {
        Ok(())
    }

    /// Whether the service finished releasing its resources.
    fn is_stopped(&self) -> bool {
        true
    }
}

/// Receives status broadcasts.
pub trait StatusSink {
    fn broadcast(&self, service: &str, status: ServiceStatus);
}

/// Status sink that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingStatusSink;

impl StatusSink for TracingStatusSink {
    fn broadcast(&self, service: &str, status: ServiceStatus) {
        tracing::info!(service, ?status, "service status");
    }
}
