//! Background transfer supervision.
//!
//! [`TransferSupervisor`] runs one engine invocation per submitted upload,
//! keeps a registry of task snapshots, aggregates progress into a single
//! event stream, and wires per-task cancellation tokens under one root.

mod supervisor;
mod types;

pub use supervisor::TransferSupervisor;
pub use types::{TaskEvent, TaskState, TransferTask, UploadSpec};
