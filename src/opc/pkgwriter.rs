//! Writing parts into a ZIP archive.
//!
//! The assembler does not decide what goes into the package or in which order; it
//! writes entries exactly as it is handed them, each Deflate-compressed, switching an
//! entry to ZIP64 when its own size requires it.

use crate::error::Result;
use std::io::{self, Seek, Write};
use zip::write::{SimpleFileOptions, ZipWriter};

/// Entries at or above this size need ZIP64 extra fields.
pub const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Whether an entry of `size` bytes must be written as ZIP64.
#[inline]
pub fn needs_zip64(size: u64) -> bool {
    size >= ZIP64_THRESHOLD
}

fn entry_options(size: u64) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .large_file(needs_zip64(size))
}

/// Sequential archive writer.
pub struct ZipAssembler<W: Write + Seek> {
    zip: ZipWriter<W>,
    entries: usize,
}

impl<W: Write + Seek> ZipAssembler<W> {
    pub fn new(sink: W) -> Self {
        Self {
            zip: ZipWriter::new(sink),
            entries: 0,
        }
    }

    /// Write one entry from memory.
    pub fn add_part(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.zip
            .start_file(name, entry_options(bytes.len() as u64))?;
        self.zip.write_all(bytes)?;
        self.entries += 1;
        Ok(())
    }

    /// Write one entry of `size` bytes produced by `fill`.
    ///
    /// `size` only selects the ZIP64 mode; `fill` may write any number of bytes.
    pub fn add_with<F>(&mut self, name: &str, size: u64, fill: F) -> Result<()>
    where
        F: FnOnce(&mut dyn Write) -> io::Result<()>,
    {
        self.zip.start_file(name, entry_options(size))?;
        fill(&mut self.zip)?;
        self.entries += 1;
        Ok(())
    }

    /// Number of entries written so far.
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Write the central directory and return the sink.
    pub fn finish(self) -> Result<W> {
        Ok(self.zip.finish()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use zip::ZipArchive;

    #[test]
    fn test_zip64_decision() {
        assert!(!needs_zip64(0));
        assert!(!needs_zip64(u32::MAX as u64 - 1));
        assert!(needs_zip64(u32::MAX as u64));
        assert!(needs_zip64(1 << 33));
    }

    #[test]
    fn test_entries_keep_order() {
        let mut asm = ZipAssembler::new(Cursor::new(Vec::new()));
        asm.add_part("b.xml", b"<b/>").unwrap();
        asm.add_with("a.bin", 3, |w| w.write_all(b"abc")).unwrap();
        assert_eq!(asm.len(), 2);
        let bytes = asm.finish().unwrap().into_inner();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        assert_eq!(archive.by_index(0).unwrap().name(), "b.xml");

        let mut entry = archive.by_index(1).unwrap();
        assert_eq!(entry.name(), "a.bin");
        assert_eq!(entry.compression(), zip::CompressionMethod::Deflated);
        let mut content = Vec::new();
        entry.read_to_end(&mut content).unwrap();
        assert_eq!(content, b"abc");
    }
}
