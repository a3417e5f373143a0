//! Byte-range conventions of the resumable upload protocol.

use std::fmt;
use std::str::FromStr;

/// An inclusive byte range within a payload of known total size.
///
/// Renders exactly as the `Content-Range` header the upload endpoint
/// mandates: `bytes {start}-{end}/{total}`. The final chunk of a payload
/// must end at `total - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub start: u64,
    pub end: u64,
    pub total: u64,
}

impl ContentRange {
    pub fn new(start: u64, end: u64, total: u64) -> Self {
        Self { start, end, total }
    }

    /// Number of bytes covered by this range (inclusive bounds).
    pub fn byte_len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Returns `true` if this is the last chunk of the payload.
    pub fn is_final(&self) -> bool {
        self.end == self.total - 1
    }
}

impl fmt::Display for ContentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bytes {}-{}/{}", self.start, self.end, self.total)
    }
}

/// A range the server still expects, as reported in `nextExpectedRanges`.
///
/// The wire form is `"start-"` (open-ended) or `"start-end"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedRange {
    pub start: u64,
    pub end: Option<u64>,
}

impl FromStr for ExpectedRange {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s.split_once('-').ok_or(())?;
        let start = start.parse().map_err(|_| ())?;
        let end = if end.is_empty() {
            None
        } else {
            Some(end.parse().map_err(|_| ())?)
        };
        Ok(Self { start, end })
    }
}

/// Parses the server's expected-range list, skipping malformed entries.
pub fn parse_expected_ranges(ranges: &[String]) -> Vec<ExpectedRange> {
    ranges.iter().filter_map(|r| r.parse().ok()).collect()
}
