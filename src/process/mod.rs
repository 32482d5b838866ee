// src/process/mod.rs

//! Child process supervision.
//!
//! Commands run through the operator's shell (`$SHELL -c`) inside their own
//! session, so a signal to the (negative) process group reaches every
//! descendant. [`supervisor`] owns spawn/wait/kill; [`signal`] maps the `-s`
//! flag onto raw signal numbers.

pub mod signal;
pub mod supervisor;

pub use signal::Signal;
pub use supervisor::{ChildHandle, ChildSupervisor};
