//! Per-part buffers that spill to a temporary file.
//!
//! Parts larger than the in-memory limit are written through an [`OverflowBuffer`]
//! while the archive is being read. Writes land in memory; [`OverflowBuffer::flush_to_disk`]
//! moves them to a backing file that is created on first use.

use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Prefix of every backing file name.
pub const TEMP_PREFIX: &str = "longan-";

/// Buffered writer for one oversized part.
#[derive(Debug)]
pub struct OverflowBuffer {
    /// Bytes written since the last flush
    pending: Vec<u8>,

    /// Backing file, created lazily on the first non-empty flush
    file: Option<NamedTempFile>,

    /// Bytes already on disk
    flushed: u64,

    /// Directory for the backing file; the system temp dir when unset
    dir: Option<PathBuf>,
}

impl OverflowBuffer {
    pub fn new(dir: Option<&Path>) -> Self {
        Self {
            pending: Vec::new(),
            file: None,
            flushed: 0,
            dir: dir.map(Path::to_path_buf),
        }
    }

    /// Total bytes held, on disk and pending.
    pub fn len(&self) -> u64 {
        self.flushed + self.pending.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes that have not been flushed yet.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Location of the backing file, once it exists.
    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(NamedTempFile::path)
    }

    /// Move pending bytes to the backing file.
    ///
    /// On failure the pending bytes are kept, so the flush can be retried.
    pub fn flush_to_disk(&mut self) -> io::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        if self.file.is_none() {
            let builder = {
                let mut b = tempfile::Builder::new();
                b.prefix(TEMP_PREFIX);
                b
            };
            let file = match &self.dir {
                Some(dir) => builder.tempfile_in(dir)?,
                None => builder.tempfile()?,
            };
            self.file = Some(file);
        }

        let flushed = self.flushed;
        let Some(file) = self.file.as_mut() else {
            return Ok(());
        };
        if let Err(err) = file.write_all(&self.pending).and_then(|_| file.flush()) {
            // drop whatever made it to disk so a retry starts from a clean offset
            let handle = file.as_file_mut();
            handle.set_len(flushed)?;
            handle.seek(SeekFrom::Start(flushed))?;
            return Err(err);
        }

        self.flushed += self.pending.len() as u64;
        self.pending.clear();
        Ok(())
    }

    /// A reader over the full contents, starting at offset 0.
    ///
    /// Without a backing file this reads the in-memory bytes. Otherwise pending bytes
    /// are flushed first and a fresh handle on the backing file is returned.
    pub fn reader(&mut self) -> io::Result<OverflowReader<'_>> {
        if self.file.is_none() {
            return Ok(OverflowReader::Memory(Cursor::new(&self.pending)));
        }
        self.flush_to_disk()?;
        match &self.file {
            Some(file) => Ok(OverflowReader::File(file.reopen()?)),
            None => Ok(OverflowReader::Memory(Cursor::new(&self.pending))),
        }
    }

    /// Read the full contents into memory.
    pub fn read_all(&mut self) -> io::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(usize::try_from(self.len()).unwrap_or(0));
        self.reader()?.read_to_end(&mut out)?;
        Ok(out)
    }

    /// Release memory and delete the backing file. Closing twice is a no-op.
    pub fn close(&mut self) -> io::Result<()> {
        self.pending = Vec::new();
        self.flushed = 0;
        match self.file.take() {
            Some(file) => file.close(),
            None => Ok(()),
        }
    }
}

impl Write for OverflowBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_to_disk()
    }
}

/// Read handle returned by [`OverflowBuffer::reader`].
pub enum OverflowReader<'a> {
    Memory(Cursor<&'a Vec<u8>>),
    File(File),
}

impl Read for OverflowReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            OverflowReader::Memory(cursor) => cursor.read(buf),
            OverflowReader::File(file) => file.read(buf),
        }
    }
}

/// Overflow buffers keyed by member name.
pub type OverflowMap = std::collections::HashMap<String, Mutex<OverflowBuffer>>;

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_memory_only_reader() {
        let dir = tempfile::tempdir().unwrap();
        let mut buf = OverflowBuffer::new(Some(dir.path()));
        buf.write_all(b"hello").unwrap();
        assert!(buf.path().is_none());
        assert_eq!(buf.read_all().unwrap(), b"hello");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_spill_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let data = payload(70_000);
        let mut buf = OverflowBuffer::new(Some(dir.path()));

        buf.write_all(&data[..40_000]).unwrap();
        buf.flush().unwrap();
        assert_eq!(buf.pending_len(), 0);
        buf.write_all(&data[40_000..]).unwrap();
        assert_eq!(buf.len(), data.len() as u64);

        // reader flushes the tail before handing out a file handle
        let back = buf.read_all().unwrap();
        assert_eq!(back, data);
        assert_eq!(buf.pending_len(), 0);

        let path = buf.path().unwrap().to_path_buf();
        assert!(path.starts_with(dir.path()));
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with(TEMP_PREFIX)
        );

        // independent handles both start at offset 0
        let mut first = Vec::new();
        buf.reader().unwrap().read_to_end(&mut first).unwrap();
        assert_eq!(first.len(), data.len());
    }

    #[test]
    fn test_close_removes_file_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut buf = OverflowBuffer::new(Some(dir.path()));
        buf.write_all(&payload(1024)).unwrap();
        buf.flush().unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        buf.close().unwrap();
        buf.close().unwrap();
        assert!(buf.is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_flush_into_missing_dir_keeps_pending() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let mut buf = OverflowBuffer::new(Some(&missing));
        buf.write_all(b"keep me").unwrap();

        assert!(buf.flush_to_disk().is_err());
        assert_eq!(buf.pending_len(), 7);
        assert_eq!(buf.read_all().unwrap(), b"keep me");
    }
}
