//! Core of the `plexorc` orchestrator: a maintenance-aware task loop.
//!
//! The orchestration loop repeatedly executes an ordered task list while
//! polling a maintenance-window oracle, transparently suspending and
//! resuming the in-flight task's whole process tree whenever a window is
//! active, and appending per-loop timing statistics to a durable JSON
//! store. The binary crate wires these pieces to the real media-server and
//! download-client HTTP clients.

pub mod error;
pub mod executor;
pub mod io;
pub mod markers;
pub mod oracle;
pub mod orchestrator;
pub mod paths;
pub mod proctree;
pub mod registry;
pub mod stats;
pub mod tasklist;
pub mod timefmt;

pub use error::{OrcError, Result};
