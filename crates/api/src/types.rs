use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for a file stored on the remote drive.
///
/// Returned by simple uploads and by the final chunk of a resumable
/// session; in both cases this is the authoritative record of the item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileFacet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<FolderFacet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_date_time: Option<DateTime<Utc>>,
}

impl DriveItem {
    /// Returns `true` if the item is a folder.
    pub fn is_folder(&self) -> bool {
        self.folder.is_some()
    }
}

/// File-specific facet of a drive item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFacet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Folder-specific facet of a drive item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderFacet {
    #[serde(default)]
    pub child_count: i64,
}

/// A newly created resumable upload session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSessionInfo {
    pub upload_url: String,
    pub expiration_date_time: DateTime<Utc>,
    /// Byte ranges the server still expects, e.g. `"0-"` or `"0-12345"`.
    #[serde(default)]
    pub next_expected_ranges: Vec<String>,
}

/// Server response to one chunk PUT.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkOutcome {
    /// Intermediate chunk accepted; the server reports what it still wants.
    Accepted { next_expected_ranges: Vec<String> },
    /// Final chunk accepted; the upload is complete.
    Completed { item: DriveItem },
}

/// Response wrapper for collection endpoints (`{"value": [...]}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Collection<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}
