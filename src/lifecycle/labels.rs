//! Names for lifecycle states and events, and the statuses a service announces.

use crate::label_enum;
use serde::{Deserialize, Serialize};

label_enum! {
    /// Lifecycle states of a service.
    pub enum LifecycleState {
        Idle,
        WaitingForWarmupServices,
        Warmup,
        Reset,
        WaitingForServices,
        Ready,
        Recovery,
        Active,
        Stop,
        Stopped,
    }
    final: [Stopped]
    error: [Stop]
}

label_enum! {
    /// Lifecycle events. Each event drives the transition with the same id.
    pub enum LifecycleEvent {
        ThreadStartWarmup,
        ThreadStartNoWarmup,
        Warmup,
        WarmupComplete,
        Wait,
        ResetComplete,
        Ready,
        Activate,
        Timeout,
        ThreadStop,
        Recover,
        Reset,
        Fail,
        Stop,
    }
}

/// Status a service announces to the services that depend on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceStatus {
    Initializing,
    Warmup,
    Up,
    Down,
}

impl LifecycleState {
    /// Status broadcast on entering this state, if any.
    pub fn status(self) -> Option<ServiceStatus> {
        match self {
            Self::WaitingForServices | Self::Ready => Some(ServiceStatus::Initializing),
            Self::Warmup => Some(ServiceStatus::Warmup),
            Self::Active => Some(ServiceStatus::Up),
            Self::Stop | Self::Stopped => Some(ServiceStatus::Down),
            Self::Idle | Self::WaitingForWarmupServices | Self::Reset | Self::Recovery => None,
        }
    }
}

/// How a service comes up from IDLE.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceMode {
    /// Fresh start
    #[default]
    Start,
    /// Restart after a failure, restoring state first
    Recovery,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Label;

    #[test]
    fn only_stopped_is_final() {
        let finals: Vec<_> = LifecycleState::ALL
            .iter()
            .filter(|state| state.is_final())
            .collect();
        assert_eq!(finals, vec![&LifecycleState::Stopped]);
    }

    #[test]
    fn status_per_state() {
        assert_eq!(LifecycleState::Active.status(), Some(ServiceStatus::Up));
        assert_eq!(LifecycleState::Ready.status(), Some(ServiceStatus::Initializing));
        assert_eq!(LifecycleState::Stop.status(), Some(ServiceStatus::Down));
        assert_eq!(LifecycleState::Reset.status(), None);
    }
}
