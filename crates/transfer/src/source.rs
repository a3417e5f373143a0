//! Local payload access for uploads.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// A local file being uploaded.
///
/// Reads are blocking; the engine runs them on the blocking pool.
#[derive(Debug)]
pub struct FileSource {
    file: File,
    size: u64,
}

impl FileSource {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Self { file, size })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Reads exactly `len` bytes starting at `start`.
    ///
    /// A short file is an error: chunk planning derives `len` from the
    /// size observed at open, so anything less means the file changed
    /// underneath the transfer.
    pub fn read_range(&mut self, start: u64, len: u64) -> io::Result<Vec<u8>> {
        self.file.seek(SeekFrom::Start(start))?;
        let mut buf = vec![0u8; len as usize];
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Reads the whole payload, for the single-request upload path.
    pub fn read_all(&mut self) -> io::Result<Vec<u8>> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut buf = Vec::with_capacity(self.size as usize);
        self.file.read_to_end(&mut buf)?;
        Ok(buf)
    }
}
