//! Resumable upload session state.

use chrono::{DateTime, Utc};
use nimbus_api::range::{ExpectedRange, parse_expected_ranges};
use nimbus_api::types::UploadSessionInfo;

/// Lifecycle of a resumable session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Open,
    Completed,
    Expired,
    Cancelled,
}

/// One chunked upload session against the remote drive.
///
/// `bytes_acked` and `pending_ranges` advance only on server
/// acknowledgment of a chunk; an expired session refuses further writes.
#[derive(Debug, Clone)]
pub struct ResumableSession {
    pub session_id: String,
    pub upload_url: String,
    pub total_bytes: u64,
    pub bytes_acked: u64,
    pub pending_ranges: Vec<ExpectedRange>,
    pub expires_at: DateTime<Utc>,
    pub status: SessionStatus,
}

impl ResumableSession {
    /// Builds session state from the server's session-creation response.
    pub fn from_info(info: &UploadSessionInfo, total_bytes: u64) -> Self {
        let pending = parse_expected_ranges(&info.next_expected_ranges);
        // A fresh session normally expects "0-"; trust the server if it
        // says otherwise.
        let bytes_acked = pending.first().map(|r| r.start).unwrap_or(0);
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            upload_url: info.upload_url.clone(),
            total_bytes,
            bytes_acked,
            pending_ranges: pending,
            expires_at: info.expiration_date_time,
            status: SessionStatus::Open,
        }
    }

    /// Records a server acknowledgment up to and including byte `end`.
    ///
    /// Never moves backwards: a duplicate acknowledgment is a no-op.
    pub fn ack(&mut self, end: u64) {
        self.bytes_acked = self.bytes_acked.max(end + 1);
    }

    /// Replaces the pending ranges with the server's latest report.
    pub fn update_pending(&mut self, raw_ranges: &[String]) {
        self.pending_ranges = parse_expected_ranges(raw_ranges);
    }

    /// Returns `true` if the session deadline has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whole-payload progress in percent, floored.
    pub fn progress_percent(&self) -> u8 {
        if self.total_bytes == 0 {
            return 100;
        }
        ((self.bytes_acked * 100) / self.total_bytes) as u8
    }

    pub fn complete(&mut self) {
        self.bytes_acked = self.total_bytes;
        self.pending_ranges.clear();
        self.status = SessionStatus::Completed;
    }

    pub fn cancel(&mut self) {
        self.status = SessionStatus::Cancelled;
    }

    pub fn expire(&mut self) {
        self.status = SessionStatus::Expired;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn info(expires_in_secs: i64) -> UploadSessionInfo {
        UploadSessionInfo {
            upload_url: "https://up.example.com/s/1".into(),
            expiration_date_time: Utc::now() + Duration::seconds(expires_in_secs),
            next_expected_ranges: vec!["0-".into()],
        }
    }

    #[test]
    fn fresh_session_starts_at_zero() {
        let session = ResumableSession::from_info(&info(3600), 1000);
        assert_eq!(session.bytes_acked, 0);
        assert_eq!(session.status, SessionStatus::Open);
        assert_eq!(session.progress_percent(), 0);
        assert!(!session.is_expired(Utc::now()));
    }

    #[test]
    fn ack_advances_monotonically() {
        let mut session = ResumableSession::from_info(&info(3600), 1000);
        session.ack(499);
        assert_eq!(session.bytes_acked, 500);
        assert_eq!(session.progress_percent(), 50);

        // A stale acknowledgment never regresses progress.
        session.ack(99);
        assert_eq!(session.bytes_acked, 500);
    }

    #[test]
    fn acked_bytes_accumulate_to_total() {
        let mut session = ResumableSession::from_info(&info(3600), 900);
        for end in [299u64, 599, 899] {
            session.ack(end);
        }
        assert_eq!(session.bytes_acked, 900);
        session.complete();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.progress_percent(), 100);
    }

    #[test]
    fn progress_floors() {
        let mut session = ResumableSession::from_info(&info(3600), 3);
        session.ack(0);
        // 1/3 = 33.33..% floors to 33.
        assert_eq!(session.progress_percent(), 33);
    }

    #[test]
    fn expiry_uses_wall_clock() {
        let session = ResumableSession::from_info(&info(-1), 1000);
        assert!(session.is_expired(Utc::now()));
    }

    #[test]
    fn pending_ranges_follow_server_report() {
        let mut session = ResumableSession::from_info(&info(3600), 1000);
        session.update_pending(&["500-".to_string()]);
        assert_eq!(session.pending_ranges.len(), 1);
        assert_eq!(session.pending_ranges[0].start, 500);
    }

    #[test]
    fn resumed_session_honors_server_offset() {
        let mut i = info(3600);
        i.next_expected_ranges = vec!["640-".into()];
        let session = ResumableSession::from_info(&i, 1000);
        assert_eq!(session.bytes_acked, 640);
    }
}
