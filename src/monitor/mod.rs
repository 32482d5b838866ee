// src/monitor/mod.rs

//! Filesystem monitoring.
//!
//! Three layers, leaves first:
//! - [`event`]: the typed event vocabulary shared by the whole crate.
//! - [`source`]: the native (inotify) event source, one watch descriptor per
//!   directory.
//! - [`recursive`]: the recursive monitor that owns the watch set, grows it
//!   as the tree mutates, and projects raw events through the filters.

pub mod event;
pub mod recursive;
pub mod source;

pub use event::{EventClasses, EventKind, MonitorResult};
pub use recursive::RecursiveMonitor;
pub use source::{FsEventSource, RawEvent};
