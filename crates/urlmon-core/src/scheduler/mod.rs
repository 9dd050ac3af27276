//! Task scheduling: admission gate and bounded dispatcher.
//!
//! Tasks are admitted in input order through a counting gate so that at most
//! `concurrency` probes are in flight; results come back indexed by input position.

mod gate;
mod run;
mod task;

pub use gate::{AdmissionGate, Permit};
pub use run::{DispatchError, Dispatcher};
pub use task::{CheckResult, Task};

#[cfg(test)]
mod tests;
