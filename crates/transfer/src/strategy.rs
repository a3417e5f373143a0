//! Upload strategy selection and chunk planning.

use nimbus_api::ContentRange;

/// Payloads strictly below this size are uploaded in a single PUT.
pub const SIMPLE_UPLOAD_THRESHOLD: u64 = 4 * 1024 * 1024;

/// Default chunk size for resumable sessions: 10 MiB.
///
/// Large chunks keep per-chunk overhead (round-trips, acknowledgments) low.
pub const DEFAULT_CHUNK_SIZE: u64 = 10 * 1024 * 1024;

/// The upload endpoint requires every chunk except the last to be a
/// multiple of this alignment: 320 KiB.
pub const CHUNK_ALIGNMENT: u64 = 320 * 1024;

/// How a payload reaches the remote drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStrategy {
    /// One PUT carrying the whole payload.
    Simple,
    /// A chunked resumable session.
    Resumable,
}

impl UploadStrategy {
    /// Picks the strategy for a payload of `size_bytes`.
    ///
    /// Exactly at the threshold the resumable path is chosen: the
    /// session-creation round-trip is worth it once a payload is big
    /// enough to resume.
    pub fn select(size_bytes: u64) -> Self {
        if size_bytes < SIMPLE_UPLOAD_THRESHOLD {
            UploadStrategy::Simple
        } else {
            UploadStrategy::Resumable
        }
    }

    /// Strategy selection against a caller-supplied threshold.
    pub fn select_with_threshold(size_bytes: u64, threshold: u64) -> Self {
        if size_bytes < threshold {
            UploadStrategy::Simple
        } else {
            UploadStrategy::Resumable
        }
    }
}

/// Rounds a requested chunk size down to the nearest alignment multiple,
/// never below one alignment unit.
pub fn align_chunk_size(requested: u64) -> u64 {
    let aligned = (requested / CHUNK_ALIGNMENT) * CHUNK_ALIGNMENT;
    aligned.max(CHUNK_ALIGNMENT)
}

/// Plans the next chunk of a payload, starting at `bytes_acked`.
///
/// Returns `None` once the payload is fully acknowledged. Chunks are
/// sequential and non-overlapping; the final chunk ends at `total - 1`
/// and may be shorter than `chunk_size`.
pub fn plan_next_chunk(bytes_acked: u64, total: u64, chunk_size: u64) -> Option<ContentRange> {
    if bytes_acked >= total || total == 0 {
        return None;
    }
    let end = (bytes_acked + chunk_size).min(total) - 1;
    Some(ContentRange::new(bytes_acked, end, total))
}
