//! Service lifecycle on top of the table engine.
//!
//! ```text
//! Idle ─▶ WaitingForWarmupServices ─▶ Warmup ─▶ Reset ─┐
//!  │                                                   ▼
//!  └──────────────────────────────────────▶ WaitingForServices ◀─▶ Ready ─▶ Recovery
//!                                                   │              │          │
//!                                                   └────────▶ Active ◀───────┘
//!
//! any live state ── Fail / Stop ──▶ Stop ── ThreadStop ──▶ Stopped
//! ```
//!
//! Entering `WaitingForServices` or `Ready` broadcasts `Initializing`,
//! `Warmup` broadcasts `Warmup`, `Active` broadcasts `Up`, and `Stop` and
//! `Stopped` broadcast `Down`. Exactly one broadcast goes out per entry.

mod hooks;
mod labels;
mod machine;

pub use hooks::{HookResult, ServiceError, ServiceHooks, StatusSink, TracingStatusSink};
pub use labels::{LifecycleEvent, LifecycleState, ServiceMode, ServiceStatus};
pub use machine::{
    build_lifecycle_table, LifecycleError, LifecycleMachine, LifecycleTable, ServiceContext,
};
