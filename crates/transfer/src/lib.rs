//! Upload strategy selection, resumable session tracking, and the transfer
//! engine.
//!
//! Small payloads go up in a single PUT; everything else runs through a
//! server-tracked resumable session fed by a strictly sequential chunk
//! loop. Failures are classified and handled by an explicit retry state
//! machine: one credential refresh per task at most, bounded backoff for
//! transient errors, immediate surfacing of everything else.

mod engine;
mod error;
mod retry;
mod session;
mod source;
mod strategy;

pub use engine::{EngineConfig, TransferEngine, UploadRequest};
pub use error::{TransferError, UserAction};
pub use retry::{Action, RetryPolicy, RetryState};
pub use session::{ResumableSession, SessionStatus};
pub use source::FileSource;
pub use strategy::{
    CHUNK_ALIGNMENT, DEFAULT_CHUNK_SIZE, SIMPLE_UPLOAD_THRESHOLD, UploadStrategy,
    align_chunk_size, plan_next_chunk,
};
