//! Remote drive API surface: wire types, error classification, and the
//! `DriveClient` seam the transfer engine talks through.
//!
//! The HTTP implementation targets a Graph-style drive API (item-addressed
//! uploads, resumable upload sessions acknowledged by byte ranges). Only the
//! endpoints the transfer engine needs are modeled; directory CRUD is kept
//! as plain convenience calls on the concrete client.

pub mod client;
pub mod error;
pub mod http;
pub mod range;
pub mod types;

pub use client::{ApiFuture, DriveClient};
pub use error::{ApiError, FailureKind};
pub use http::HttpDriveClient;
pub use range::{ContentRange, ExpectedRange};
pub use types::{ChunkOutcome, DriveItem, UploadSessionInfo};
