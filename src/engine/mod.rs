// src/engine/mod.rs

//! Task and queue execution.
//!
//! [`task`] drives one task's full lifecycle on top of the process
//! supervisor: precondition checks, the one-second observation loop, timeout
//! and external-terminate handling, exit finalisation.
//!
//! [`queue`] owns the queue-level semantics: dependency-aware insertion (with
//! the acyclicity check), sequential line-order execution, stop, and the pure
//! status roll-up the daemon reconciles with every tick.

pub mod queue;
pub mod task;

pub use queue::{add_task, calculate_queue_status, roll_up, start_queue, stop_queue};
pub use task::{run_task, terminate_task};
