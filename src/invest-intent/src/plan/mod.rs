//! Recurring investment plans.
//!
//! A plan stores the raw task inputs together with a cron schedule and the
//! owner's signature. The scheduling backend replays the inputs through
//! [`crate::task::run_task`] on every tick; nothing is normalized here beyond
//! a positivity check.

pub mod backend;
pub mod config;
pub mod controller;
pub mod schedule;
pub mod signer;

pub use backend::{BackendError, CancelRequest, MemoryScheduler, SchedulerBackend};
pub use config::{PlanInput, RecurringPlanConfig, Trigger};
pub use controller::{
    activate, deactivate, find_current_config, validate_inputs, ActivateParams, PlanController,
    PlanForm, PlanState,
};
pub use schedule::Frequency;
pub use signer::{ConfigSigner, LocalSigner, SignerError};
