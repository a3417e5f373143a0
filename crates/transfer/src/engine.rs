//! The transfer engine: drives one upload from local file to remote item.
//!
//! Strategy is picked from the payload size. The resumable path runs a
//! strictly sequential chunk loop; every failed request goes through the
//! retry state machine, which grants at most one credential refresh per
//! task and bounded backoff for transient failures. Cancellation and
//! session expiry are checked between chunks, before any bytes move.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use nimbus_api::{ApiError, ChunkOutcome, DriveClient, DriveItem};
use nimbus_credentials::{CredentialBroker, IdentityProvider, RefreshError};

use crate::error::TransferError;
use crate::retry::{Action, RetryPolicy, RetryState};
use crate::session::ResumableSession;
use crate::source::FileSource;
use crate::strategy::{
    DEFAULT_CHUNK_SIZE, SIMPLE_UPLOAD_THRESHOLD, UploadStrategy, align_chunk_size, plan_next_chunk,
};

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Payloads below this go up in a single request.
    pub simple_upload_threshold: u64,
    /// Requested chunk size; rounded down to the alignment the upload
    /// endpoint requires.
    pub chunk_size: u64,
    pub retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            simple_upload_threshold: SIMPLE_UPLOAD_THRESHOLD,
            chunk_size: DEFAULT_CHUNK_SIZE,
            retry: RetryPolicy::default(),
        }
    }
}

/// One upload job.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub account_id: String,
    /// Destination folder: an item id, or `"root"` for the drive root.
    pub parent_id: String,
    pub file_name: String,
    pub content_type: String,
    pub path: PathBuf,
}

/// Executes uploads against a [`DriveClient`], renewing credentials
/// through the broker when the server rejects them.
pub struct TransferEngine<C, P: IdentityProvider> {
    client: Arc<C>,
    broker: Arc<CredentialBroker<P>>,
    config: EngineConfig,
}

impl<C: DriveClient, P: IdentityProvider> TransferEngine<C, P> {
    pub fn new(client: Arc<C>, broker: Arc<CredentialBroker<P>>, config: EngineConfig) -> Self {
        Self {
            client,
            broker,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Uploads one file, reporting whole-payload progress (0..=100) through
    /// `on_progress`. Progress never moves backwards.
    pub async fn upload(
        &self,
        request: &UploadRequest,
        cancel: &CancellationToken,
        mut on_progress: impl FnMut(u8) + Send,
    ) -> Result<DriveItem, TransferError> {
        let path = request.path.clone();
        let source = task::spawn_blocking(move || FileSource::open(&path))
            .await
            .map_err(join_error)??;
        let total = source.size();

        let strategy =
            UploadStrategy::select_with_threshold(total, self.config.simple_upload_threshold);
        info!(
            file = %request.file_name,
            account = %request.account_id,
            total,
            ?strategy,
            "starting upload"
        );

        match strategy {
            UploadStrategy::Simple => {
                self.run_simple(request, cancel, source, &mut on_progress)
                    .await
            }
            UploadStrategy::Resumable => {
                self.run_resumable(request, cancel, source, total, &mut on_progress)
                    .await
            }
        }
    }

    async fn run_simple(
        &self,
        request: &UploadRequest,
        cancel: &CancellationToken,
        source: FileSource,
        on_progress: &mut (dyn FnMut(u8) + Send),
    ) -> Result<DriveItem, TransferError> {
        let bytes = task::spawn_blocking(move || {
            let mut source = source;
            source.read_all()
        })
        .await
        .map_err(join_error)??;

        let mut credential = self.credential(&request.account_id)?;
        let mut retry = RetryState::new();
        loop {
            if cancel.is_cancelled() {
                return Err(TransferError::Cancelled);
            }
            let attempt = self
                .client
                .upload_simple(
                    &credential,
                    &request.parent_id,
                    &request.file_name,
                    &request.content_type,
                    bytes.clone(),
                )
                .await;
            match attempt {
                Ok(item) => {
                    on_progress(100);
                    info!(file = %request.file_name, item = %item.id, "upload complete");
                    return Ok(item);
                }
                Err(err) => {
                    credential = self
                        .handle_failure(err, &mut retry, &request.account_id, credential)
                        .await?;
                }
            }
        }
    }

    async fn run_resumable(
        &self,
        request: &UploadRequest,
        cancel: &CancellationToken,
        mut source: FileSource,
        total: u64,
        on_progress: &mut (dyn FnMut(u8) + Send),
    ) -> Result<DriveItem, TransferError> {
        let mut credential = self.credential(&request.account_id)?;
        let mut retry = RetryState::new();

        let info = loop {
            if cancel.is_cancelled() {
                return Err(TransferError::Cancelled);
            }
            let attempt = self
                .client
                .create_upload_session(&credential, &request.parent_id, &request.file_name)
                .await;
            match attempt {
                Ok(info) => break info,
                Err(err) => {
                    credential = self
                        .handle_failure(err, &mut retry, &request.account_id, credential)
                        .await?;
                }
            }
        };

        let mut session = ResumableSession::from_info(&info, total);
        let chunk_size = align_chunk_size(self.config.chunk_size);
        debug!(
            session = %session.session_id,
            expires_at = %session.expires_at,
            chunk_size,
            "resumable session open"
        );

        while let Some(range) = plan_next_chunk(session.bytes_acked, total, chunk_size) {
            if cancel.is_cancelled() {
                session.cancel();
                self.abort_session(&session).await;
                return Err(TransferError::Cancelled);
            }
            // Fail fast on a dead session; no request is worth sending.
            if session.is_expired(Utc::now()) {
                session.expire();
                warn!(session = %session.session_id, "session deadline passed");
                return Err(TransferError::SessionExpired);
            }

            let (start, len) = (range.start, range.byte_len());
            let (returned, read) = task::spawn_blocking(move || {
                let mut source = source;
                let read = source.read_range(start, len);
                (source, read)
            })
            .await
            .map_err(join_error)?;
            source = returned;
            let bytes = read?;

            match self.client.upload_chunk(&session.upload_url, range, bytes).await {
                Ok(ChunkOutcome::Accepted {
                    next_expected_ranges,
                }) => {
                    session.ack(range.end);
                    session.update_pending(&next_expected_ranges);
                    retry.on_progress();
                    on_progress(session.progress_percent());
                    debug!(acked = session.bytes_acked, total, "chunk accepted");
                }
                Ok(ChunkOutcome::Completed { item }) => {
                    session.complete();
                    on_progress(100);
                    info!(file = %request.file_name, item = %item.id, "upload complete");
                    return Ok(item);
                }
                Err(err) => {
                    credential = self
                        .handle_failure(err, &mut retry, &request.account_id, credential)
                        .await?;
                }
            }
        }

        // The server acked every byte but never returned the item.
        Err(TransferError::Permanent(
            "upload session ended without a completed item".to_string(),
        ))
    }

    /// Decides what a failed request means for the task and performs the
    /// recovery step. Returns the credential to use for the retry.
    async fn handle_failure(
        &self,
        err: ApiError,
        retry: &mut RetryState,
        account_id: &str,
        credential: String,
    ) -> Result<String, TransferError> {
        let kind = err.kind();
        match retry.on_failure(kind, &self.config.retry) {
            Action::RefreshCredential => {
                warn!(account = %account_id, error = %err, "credential rejected; refreshing");
                self.refresh_credential(account_id).await
            }
            Action::RetryAfterBackoff(delay) => {
                warn!(error = %err, ?delay, "transient failure; backing off");
                tokio::time::sleep(delay).await;
                Ok(credential)
            }
            Action::Fail => Err(TransferError::from_failure(kind, &err)),
        }
    }

    fn credential(&self, account_id: &str) -> Result<String, TransferError> {
        self.broker.current(account_id).map_err(map_refresh_error)
    }

    /// Refreshes through the broker, absorbing transient provider outages
    /// with the same backoff budget as network failures.
    async fn refresh_credential(&self, account_id: &str) -> Result<String, TransferError> {
        let mut attempts = 0u32;
        loop {
            match self.broker.refresh(account_id).await {
                Ok(token) => return Ok(token),
                Err(RefreshError::ProviderUnavailable(msg)) => {
                    if attempts >= self.config.retry.max_transient_retries {
                        return Err(TransferError::ProviderUnavailable(msg));
                    }
                    let delay = self.config.retry.backoff_base * 2u32.pow(attempts);
                    attempts += 1;
                    warn!(account = %account_id, ?delay, "identity provider unavailable; backing off");
                    tokio::time::sleep(delay).await;
                }
                Err(other) => return Err(map_refresh_error(other)),
            }
        }
    }

    async fn abort_session(&self, session: &ResumableSession) {
        if let Err(err) = self.client.delete_session(&session.upload_url).await {
            debug!(session = %session.session_id, error = %err, "session cleanup failed");
        }
    }
}

fn map_refresh_error(err: RefreshError) -> TransferError {
    match err {
        RefreshError::NoSuchAccount(id) => {
            TransferError::Permanent(format!("account removed: {id}"))
        }
        RefreshError::ConsentRequired => TransferError::ConsentRequired,
        RefreshError::ProviderUnavailable(msg) => TransferError::ProviderUnavailable(msg),
        RefreshError::Store(msg) => TransferError::Permanent(format!("credential store: {msg}")),
    }
}

fn join_error(err: task::JoinError) -> TransferError {
    TransferError::Permanent(format!("blocking task failed: {err}"))
}
