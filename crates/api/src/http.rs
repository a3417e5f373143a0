//! Reqwest-backed [`DriveClient`] implementation.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::client::{ApiFuture, DriveClient};
use crate::error::ApiError;
use crate::range::ContentRange;
use crate::types::{ChunkOutcome, Collection, DriveItem, UploadSessionInfo};

/// Characters escaped in path segments (file and folder names).
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'/')
    .add(b'\\');

/// Default per-request transport timeout.
///
/// This is the short per-chunk bound; session expiry is a separate, longer
/// deadline enforced by the engine.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Graph-style error envelope: `{"error": {"code", "message"}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Body of an intermediate (202) chunk acknowledgment.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChunkAck {
    #[serde(default)]
    next_expected_ranges: Vec<String>,
}

/// HTTP client for the remote drive API.
pub struct HttpDriveClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpDriveClient {
    /// Creates a client against the given API base URL (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    /// URL addressing a child item by parent id and name.
    ///
    /// The drive root is addressed directly rather than by item id.
    fn item_url(&self, parent_id: &str, file_name: &str, suffix: &str) -> String {
        let name = utf8_percent_encode(file_name, PATH_SEGMENT);
        if parent_id == "root" {
            format!("{}/me/drive/root:/{name}:/{suffix}", self.base_url)
        } else {
            format!(
                "{}/me/drive/items/{parent_id}:/{name}:/{suffix}",
                self.base_url
            )
        }
    }

    /// Converts a non-success response into [`ApiError::Status`].
    async fn status_error(resp: reqwest::Response) -> ApiError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(env) => ApiError::Status {
                status,
                code: env.error.code,
                message: env.error.message,
            },
            Err(_) => ApiError::Status {
                status,
                code: String::new(),
                message: body,
            },
        }
    }

    async fn json_or_error<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, ApiError> {
        if resp.status().is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| ApiError::UnexpectedBody(e.to_string()))
        } else {
            Err(Self::status_error(resp).await)
        }
    }

    /// Lists the children of an item (`"root"` for the drive root).
    pub async fn list_children(
        &self,
        credential: &str,
        item_id: &str,
    ) -> Result<Vec<DriveItem>, ApiError> {
        let url = if item_id == "root" {
            format!("{}/me/drive/root/children", self.base_url)
        } else {
            format!("{}/me/drive/items/{item_id}/children", self.base_url)
        };
        let resp = self.http.get(url).bearer_auth(credential).send().await?;
        let collection: Collection<DriveItem> = Self::json_or_error(resp).await?;
        Ok(collection.value)
    }

    /// Creates a folder under `parent_id`, renaming on conflict.
    pub async fn create_folder(
        &self,
        credential: &str,
        parent_id: &str,
        folder_name: &str,
    ) -> Result<DriveItem, ApiError> {
        let url = if parent_id == "root" {
            format!("{}/me/drive/root/children", self.base_url)
        } else {
            format!("{}/me/drive/items/{parent_id}/children", self.base_url)
        };
        let body = serde_json::json!({
            "name": folder_name,
            "folder": {},
            "@microsoft.graph.conflictBehavior": "rename",
        });
        let resp = self
            .http
            .post(url)
            .bearer_auth(credential)
            .json(&body)
            .send()
            .await?;
        Self::json_or_error(resp).await
    }

    /// Deletes an item (moves it to the recycle bin).
    pub async fn delete_item(&self, credential: &str, item_id: &str) -> Result<(), ApiError> {
        let url = format!("{}/me/drive/items/{item_id}", self.base_url);
        let resp = self.http.delete(url).bearer_auth(credential).send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(Self::status_error(resp).await)
        }
    }
}

impl DriveClient for HttpDriveClient {
    fn create_upload_session(
        &self,
        credential: &str,
        parent_id: &str,
        file_name: &str,
    ) -> ApiFuture<'_, UploadSessionInfo> {
        let url = self.item_url(parent_id, file_name, "createUploadSession");
        let credential = credential.to_string();
        let body = serde_json::json!({
            "item": {
                "@microsoft.graph.conflictBehavior": "rename",
                "name": file_name,
            }
        });
        Box::pin(async move {
            debug!(url = %url, "creating upload session");
            let resp = self
                .http
                .post(url)
                .bearer_auth(&credential)
                .json(&body)
                .send()
                .await?;
            Self::json_or_error(resp).await
        })
    }

    fn upload_chunk(
        &self,
        upload_url: &str,
        range: ContentRange,
        bytes: Vec<u8>,
    ) -> ApiFuture<'_, ChunkOutcome> {
        let upload_url = upload_url.to_string();
        Box::pin(async move {
            let resp = self
                .http
                .put(&upload_url)
                .header("Content-Range", range.to_string())
                .body(bytes)
                .send()
                .await?;

            let status = resp.status();
            if status == StatusCode::ACCEPTED {
                let ack: ChunkAck = Self::json_or_error(resp).await?;
                Ok(ChunkOutcome::Accepted {
                    next_expected_ranges: ack.next_expected_ranges,
                })
            } else if status.is_success() {
                let item: DriveItem = Self::json_or_error(resp).await?;
                Ok(ChunkOutcome::Completed { item })
            } else {
                Err(Self::status_error(resp).await)
            }
        })
    }

    fn upload_simple(
        &self,
        credential: &str,
        parent_id: &str,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> ApiFuture<'_, DriveItem> {
        let url = format!(
            "{}?@microsoft.graph.conflictBehavior=rename",
            self.item_url(parent_id, file_name, "content")
        );
        let credential = credential.to_string();
        let content_type = content_type.to_string();
        Box::pin(async move {
            let resp = self
                .http
                .put(url)
                .bearer_auth(&credential)
                .header("Content-Type", content_type)
                .body(bytes)
                .send()
                .await?;
            Self::json_or_error(resp).await
        })
    }

    fn delete_session(&self, upload_url: &str) -> ApiFuture<'_, ()> {
        let upload_url = upload_url.to_string();
        Box::pin(async move {
            let resp = self.http.delete(&upload_url).send().await?;
            if resp.status().is_success() {
                Ok(())
            } else {
                // Teardown is best-effort for callers, but surface the error
                // so they can log it.
                warn!(url = %upload_url, status = resp.status().as_u16(), "session delete rejected");
                Err(Self::status_error(resp).await)
            }
        })
    }
}
