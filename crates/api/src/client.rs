//! Abstract drive transport.
//!
//! The transfer engine only ever talks through [`DriveClient`]. Using a
//! trait keeps upload logic decoupled from HTTP and testable with mocks.

use std::future::Future;
use std::pin::Pin;

use crate::error::ApiError;
use crate::range::ContentRange;
use crate::types::{ChunkOutcome, DriveItem, UploadSessionInfo};

/// Boxed future returned by [`DriveClient`] methods.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Abstract connection to the remote drive.
pub trait DriveClient: Send + Sync {
    /// Opens a resumable upload session for a new file under `parent_id`.
    fn create_upload_session(
        &self,
        credential: &str,
        parent_id: &str,
        file_name: &str,
    ) -> ApiFuture<'_, UploadSessionInfo>;

    /// Sends one chunk to a session's upload endpoint.
    ///
    /// Upload endpoints are pre-authorized; no credential is attached.
    fn upload_chunk(
        &self,
        upload_url: &str,
        range: ContentRange,
        bytes: Vec<u8>,
    ) -> ApiFuture<'_, ChunkOutcome>;

    /// Uploads a whole payload in a single request.
    fn upload_simple(
        &self,
        credential: &str,
        parent_id: &str,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> ApiFuture<'_, DriveItem>;

    /// Best-effort teardown of a resumable session.
    fn delete_session(&self, upload_url: &str) -> ApiFuture<'_, ()>;
}
