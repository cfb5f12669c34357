//! Lifecycle table and the per-service driver.
//!
//! Hook failures never escape the machine: they are turned into `Fail`,
//! which every live state links to STOP.

use super::hooks::{ServiceError, ServiceHooks, StatusSink};
use super::labels::{LifecycleEvent, LifecycleState, ServiceMode};
use crate::builder::{identity, BuildError, StateTableBuilder};
use crate::core::{
    recovering, Entry, EntryAction, EventId, Label, MachineError, State, StateHistory, StateMachine,
    StateTable,
};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use thiserror::Error;

/// Errors from driving a service lifecycle.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Service {0} thread is already running")]
    AlreadyStarted(String),

    #[error("Service {0} thread has already stopped")]
    NotStarted(String),

    #[error("Mode can only be changed in Idle, service is in {0:?}")]
    ModeChangeOutsideIdle(LifecycleState),

    #[error(transparent)]
    Machine(#[from] MachineError<ServiceError>),
}

/// Per-service data the lifecycle table operates on.
pub struct ServiceContext<H> {
    name: String,
    hooks: H,
    status: Rc<dyn StatusSink>,
    mode: ServiceMode,
    warmup: bool,
    warmup_completed: bool,
    thread_started: bool,
}

impl<H> ServiceContext<H> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn mode(&self) -> ServiceMode {
        self.mode
    }
}

impl<H: fmt::Debug> fmt::Debug for ServiceContext<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceContext")
            .field("name", &self.name)
            .field("hooks", &self.hooks)
            .field("mode", &self.mode)
            .field("warmup", &self.warmup)
            .field("warmup_completed", &self.warmup_completed)
            .field("thread_started", &self.thread_started)
            .finish_non_exhaustive()
    }
}

/// Lifecycle table for services with hooks of type `H`.
pub type LifecycleTable<H> = StateTable<ServiceContext<H>, ServiceError>;

const LINKS: &[(LifecycleState, LifecycleEvent, LifecycleState)] = {
    use LifecycleEvent as Ev;
    use LifecycleState as St;
    &[
        (St::Idle, Ev::ThreadStartWarmup, St::WaitingForWarmupServices),
        (St::Idle, Ev::ThreadStartNoWarmup, St::WaitingForServices),
        (St::WaitingForWarmupServices, Ev::Warmup, St::Warmup),
        (St::Warmup, Ev::WarmupComplete, St::Reset),
        (St::Warmup, Ev::Wait, St::WaitingForWarmupServices),
        (St::Reset, Ev::ResetComplete, St::WaitingForServices),
        (St::Reset, Ev::ThreadStop, St::Stopped),
        (St::WaitingForServices, Ev::Ready, St::Ready),
        (St::WaitingForServices, Ev::ResetComplete, St::Ready),
        (St::WaitingForServices, Ev::Activate, St::Active),
        (St::WaitingForServices, Ev::Timeout, St::Stop),
        (St::WaitingForServices, Ev::ThreadStop, St::Stopped),
        (St::Ready, Ev::Wait, St::WaitingForServices),
        (St::Ready, Ev::Recover, St::Recovery),
        (St::Ready, Ev::Activate, St::Active),
        (St::Ready, Ev::ThreadStop, St::Stopped),
        (St::Recovery, Ev::Wait, St::WaitingForServices),
        (St::Recovery, Ev::Activate, St::Active),
        (St::Active, Ev::Wait, St::WaitingForServices),
        (St::Active, Ev::Ready, St::Ready),
        (St::Active, Ev::Reset, St::Reset),
        (St::Active, Ev::ThreadStop, St::Stopped),
        (St::Stop, Ev::ThreadStop, St::Stopped),
    ]
};

fn entry_action<H: ServiceHooks + 'static>(
    state: LifecycleState,
) -> EntryAction<ServiceContext<H>, ServiceError> {
    let action: EntryAction<ServiceContext<H>, ServiceError> =
        Arc::new(move |context: &mut ServiceContext<H>,
                       entry: Entry|
              -> Result<Option<EventId>, ServiceError> {
            tracing::info!(service = %context.name, state = state.name(), "service state entered");
            // leaving WARMUP by any edge, including Wait and Fail
            if state != LifecycleState::Warmup
                && entry.previous == Some(LifecycleState::Warmup.id())
            {
                context.warmup_completed = true;
            }
            if let Some(status) = state.status() {
                context.status.broadcast(&context.name, status);
            }
            let hooks = &mut context.hooks;
            let next = match state {
                LifecycleState::Idle => None,
                LifecycleState::WaitingForWarmupServices => {
                    hooks.waiting_for_warmup_services_enter()?
                }
                LifecycleState::Warmup => hooks.warmup_enter()?,
                LifecycleState::Reset => hooks.reset_enter()?,
                LifecycleState::WaitingForServices => hooks.waiting_for_services_enter()?,
                LifecycleState::Ready => hooks.ready_enter()?,
                LifecycleState::Recovery => hooks.recovery_enter()?,
                LifecycleState::Active => hooks.active_enter()?,
                LifecycleState::Stop => {
                    let next = hooks.stop_enter()?;
                    if next.is_none() {
                        tracing::info!(service = %context.name, "service thread may be stopped");
                    }
                    next
                }
                LifecycleState::Stopped => {
                    hooks.stopped_enter()?;
                    None
                }
            };
            Ok(next.map(Label::id))
        });

    match state {
        LifecycleState::Stop | LifecycleState::Stopped => {
            recovering(action, |_: &mut ServiceContext<H>, _: &ServiceError| None)
        }
        _ => recovering(action, |_: &mut ServiceContext<H>, _: &ServiceError| {
            Some(LifecycleEvent::Fail.id())
        }),
    }
}

/// Build the lifecycle table for hooks of type `H`.
pub fn build_lifecycle_table<H: ServiceHooks + 'static>(
) -> Result<LifecycleTable<H>, BuildError> {
    let mut builder = StateTableBuilder::new("lifecycle");
    for &state in LifecycleState::ALL {
        let action = entry_action::<H>(state);
        builder.register_state(State::labelled(state).with_entry_action(action))?;
    }

    for &(from, event, to) in LINKS {
        builder.link_states(from.id(), event.id(), to.id())?;
        builder.register_event_translator(from.id(), event.id(), identity())?;
    }

    for &state in LifecycleState::ALL {
        if matches!(state, LifecycleState::Stop | LifecycleState::Stopped) {
            continue;
        }
        for event in [LifecycleEvent::Fail, LifecycleEvent::Stop] {
            builder.link_states(state.id(), event.id(), LifecycleState::Stop.id())?;
            builder.register_event_translator(state.id(), event.id(), identity())?;
        }
    }

    builder.build()
}

/// A service's lifecycle: thread start, warmup, readiness, activity, stop.
///
/// Created in IDLE. Hook failures never escape: they move the service to
/// STOP instead.
pub struct LifecycleMachine<H: ServiceHooks + 'static> {
    machine: StateMachine<ServiceContext<H>, ServiceError>,
}

impl<H: ServiceHooks + 'static> LifecycleMachine<H> {
    /// Build a fresh lifecycle table for this hook type.
    pub fn table() -> Result<Arc<LifecycleTable<H>>, BuildError> {
        build_lifecycle_table().map(Arc::new)
    }

    /// Create a service in IDLE.
    ///
    /// `warmup` selects whether thread start goes through the warmup branch.
    pub fn new(
        table: Arc<LifecycleTable<H>>,
        name: impl Into<String>,
        hooks: H,
        status: Rc<dyn StatusSink>,
        warmup: bool,
    ) -> Result<Self, LifecycleError> {
        let name = name.into();
        let context = ServiceContext {
            name: name.clone(),
            hooks,
            status,
            mode: ServiceMode::default(),
            warmup,
            warmup_completed: false,
            thread_started: false,
        };
        let mut machine = StateMachine::new(name, table, context)
            .with_history(StateHistory::DEFAULT_CAPACITY);
        machine.start(LifecycleState::Idle.id())?;
        Ok(Self { machine })
    }

    /// Run the IDLE hook for the current mode, then leave IDLE.
    pub fn on_thread_start(&mut self) -> Result<(), LifecycleError> {
        let context = self.machine.context_mut();
        if context.thread_started {
            return Err(LifecycleError::AlreadyStarted(context.name.clone()));
        }
        context.thread_started = true;
        tracing::info!(service = %context.name, mode = ?context.mode, "service thread started");

        let idle = match context.mode {
            ServiceMode::Start => context.hooks.idle_start(),
            ServiceMode::Recovery => context.hooks.idle_recover(),
        };
        if let Err(err) = idle {
            tracing::error!(service = %context.name, error = %err, "idle hook failed");
            return self.send(LifecycleEvent::Fail);
        }

        let event = if context.warmup {
            LifecycleEvent::ThreadStartWarmup
        } else {
            LifecycleEvent::ThreadStartNoWarmup
        };
        self.send(event)
    }

    /// Send `ThreadStop`.
    ///
    /// The thread only counts as stopped once the service reached STOPPED;
    /// from a state with no `ThreadStop` link the event is ignored and the
    /// thread stays started.
    pub fn on_thread_stop(&mut self) -> Result<(), LifecycleError> {
        let context = self.machine.context();
        if !context.thread_started {
            return Err(LifecycleError::NotStarted(context.name.clone()));
        }
        tracing::info!(service = %context.name, "service thread stopping");
        self.send(LifecycleEvent::ThreadStop)?;

        if self.state() == LifecycleState::Stopped {
            self.machine.context_mut().thread_started = false;
        } else {
            tracing::warn!(
                service = %self.name(),
                state = ?self.state(),
                "thread stop ignored in this state"
            );
        }
        Ok(())
    }

    /// Feed a lifecycle event.
    pub fn send(&mut self, event: LifecycleEvent) -> Result<(), LifecycleError> {
        Ok(self.machine.fire(event)?)
    }

    pub fn state(&self) -> LifecycleState {
        self.machine
            .current_label()
            .unwrap_or(LifecycleState::Idle)
    }

    /// Choose how the service starts. Only allowed in IDLE.
    pub fn set_mode(&mut self, mode: ServiceMode) -> Result<(), LifecycleError> {
        let state = self.state();
        if state != LifecycleState::Idle {
            tracing::warn!(service = %self.name(), ?state, "mode can only be changed in Idle");
            return Err(LifecycleError::ModeChangeOutsideIdle(state));
        }
        self.machine.context_mut().mode = mode;
        Ok(())
    }

    pub fn mode(&self) -> ServiceMode {
        self.machine.context().mode
    }

    /// Whether the service has left WARMUP at least once, whichever way.
    pub fn warmup_completed(&self) -> bool {
        self.machine.context().warmup_completed
    }

    pub fn has_thread_started(&self) -> bool {
        self.machine.context().thread_started
    }

    /// STOPPED, and the hooks report their resources released.
    pub fn is_stopped(&self) -> bool {
        self.state() == LifecycleState::Stopped && self.machine.context().hooks.is_stopped()
    }

    pub fn history(&self) -> Option<&StateHistory> {
        self.machine.history()
    }

    pub fn name(&self) -> &str {
        self.machine.name()
    }

    pub fn hooks(&self) -> &H {
        &self.machine.context().hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.machine.context_mut().hooks
    }
}

impl<H: ServiceHooks + fmt::Debug + 'static> fmt::Debug for LifecycleMachine<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleMachine")
            .field("state", &self.state())
            .field("context", self.machine.context())
            .finish()
    }
}
