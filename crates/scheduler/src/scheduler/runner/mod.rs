//! Scheduler runner -- owns the registry and drives routines.
//!
//! Split into focused submodules:
//! - `core`: Scheduler struct, constructor, and accessor methods
//! - `execution`: `start`, `tick`, and the per-node step protocol
//! - `cancellation`: canceling a chain through its root handle
//! - `context`: what a routine sees while it is being stepped

mod cancellation;
mod context;
mod core;
mod execution;

pub use self::context::Context;
pub use self::core::{new_shared_scheduler, Scheduler, SharedScheduler};
