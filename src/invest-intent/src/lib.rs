//! Aave v3 "invest" task: turns loosely typed investment settings into a
//! fee-bounded intent (`approve` + `supply`) and manages recurring plans that
//! replay those settings on a schedule.
//!
//! Pipeline: [`registry`] → [`amount`] → [`encoder`] → [`intent`], driven by
//! [`task::run_task`]. The [`plan`] module sits above it and never builds
//! intents itself; each scheduled execution re-runs the task with the stored
//! raw inputs.

pub mod account;
pub mod amount;
pub mod encoder;
pub mod errors;
pub mod intent;
pub mod plan;
pub mod reader;
pub mod registry;
pub mod task;


pub use errors::{InvestError, PlanError};
pub use intent::{build_invest_intent, IntentBuilder, InvestRequest};
pub use registry::{Registry, Token};
pub use task::{run_task, Settler, TaskContext, TaskInputs, TaskResult};
