//! Reading a package archive into part storage.
//!
//! Entries are read in archive order under two limits: a running total of declared
//! uncompressed sizes, and a per-entry size above which the entry is streamed into an
//! [`OverflowBuffer`] instead of memory.

use crate::error::{Error, Result};
use crate::opc::constants::member;
use crate::opc::overflow::OverflowBuffer;
use crate::options::Limits;
use std::collections::HashMap;
use std::io::{Read, Seek, Write};
use std::path::Path;
use zip::ZipArchive;

/// Read buffer used when streaming an entry to disk.
const COPY_CHUNK: usize = 64 * 1024;

/// Member names that producers sometimes write with different casing.
const CANONICAL_NAMES: &[&str] = &[
    member::CONTENT_TYPES,
    "docProps/app.xml",
    "docProps/core.xml",
];

/// Parts read from an archive.
#[derive(Debug, Default)]
pub struct Ingested {
    /// Entries held in memory, keyed by member name
    pub parts: HashMap<String, Vec<u8>>,

    /// Entries larger than the per-part limit
    pub overflow: HashMap<String, OverflowBuffer>,

    /// Number of entries whose name starts with the slide part prefix
    pub slide_parts: usize,

    /// Sum of declared uncompressed sizes
    pub total: u64,
}

/// Normalize an archive entry name into a member name.
///
/// Backslashes become forward slashes and well-known names get their canonical case.
pub fn normalize_member_name(name: &str) -> String {
    let name = name.replace('\\', "/");
    CANONICAL_NAMES
        .iter()
        .find(|canonical| canonical.eq_ignore_ascii_case(&name))
        .map_or(name, |canonical| canonical.to_string())
}

/// Whether `name` starts with `ppt/slides/slide`, ignoring ASCII case.
pub fn is_slide_member(name: &str) -> bool {
    starts_with_ignore_case(name, member::SLIDE_PREFIX)
}

/// Whether `name` starts with `prefix`, ignoring ASCII case.
pub fn starts_with_ignore_case(name: &str, prefix: &str) -> bool {
    let prefix = prefix.as_bytes();
    name.len() >= prefix.len() && name.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix)
}

/// Read every entry of the archive.
///
/// Fails with [`Error::UnzipSizeLimit`] as soon as the running total passes
/// `limits.total`; overflow files created up to that point are removed when the
/// partial result is dropped.
pub fn ingest<R: Read + Seek>(
    reader: R,
    limits: &Limits,
    tmp_dir: Option<&Path>,
) -> Result<Ingested> {
    let mut archive = ZipArchive::new(reader)?;
    let mut out = Ingested::default();

    for index in 0..archive.len() {
        let (name, size) = {
            let entry = archive.by_index(index)?;
            if entry.is_dir() {
                continue;
            }
            (normalize_member_name(entry.name()), entry.size())
        };

        out.total = out.total.saturating_add(size);
        if out.total > limits.total {
            return Err(Error::UnzipSizeLimit {
                limit: limits.total,
            });
        }

        if is_slide_member(&name) {
            out.slide_parts += 1;
        }

        if size > limits.part {
            match spill(&mut archive, index, limits.part, tmp_dir) {
                Ok(buf) => {
                    tracing::debug!(part = %name, size, "entry kept in overflow file");
                    out.overflow.insert(name, buf);
                    continue;
                },
                Err(err) => {
                    tracing::warn!(
                        part = %name,
                        error = %err,
                        "failed to stream entry to disk, buffering in memory"
                    );
                },
            }
        }

        let mut entry = archive.by_index(index)?;
        let capacity = usize::try_from(size.min(limits.part)).unwrap_or(0);
        let mut data = Vec::with_capacity(capacity);
        entry.read_to_end(&mut data)?;
        out.parts.insert(name, data);
    }

    tracing::debug!(
        entries = out.parts.len() + out.overflow.len(),
        overflow = out.overflow.len(),
        total = out.total,
        "archive ingested"
    );
    Ok(out)
}

/// Stream entry `index` into an overflow buffer, flushing whenever `threshold`
/// pending bytes accumulate.
fn spill<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    index: usize,
    threshold: u64,
    tmp_dir: Option<&Path>,
) -> Result<OverflowBuffer> {
    let mut entry = archive.by_index(index)?;
    let mut buf = OverflowBuffer::new(tmp_dir);
    let mut chunk = vec![0u8; COPY_CHUNK];

    loop {
        let n = match entry.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        buf.write_all(&chunk[..n])?;
        if buf.pending_len() as u64 >= threshold {
            buf.flush_to_disk()?;
        }
    }
    buf.flush_to_disk()?;

    Ok(buf)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    /// Build an in-memory archive from `(name, bytes)` pairs.
    pub(crate) fn archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, data) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    fn limits(total: u64, part: u64) -> Limits {
        Limits { total, part }
    }

    #[test]
    fn test_normalize_member_name() {
        assert_eq!(normalize_member_name("[content_types].xml"), "[Content_Types].xml");
        assert_eq!(normalize_member_name("DOCPROPS/APP.XML"), "docProps/app.xml");
        assert_eq!(
            normalize_member_name("ppt\\slides\\slide1.xml"),
            "ppt/slides/slide1.xml"
        );
        assert_eq!(normalize_member_name("ppt/Slides/x.xml"), "ppt/Slides/x.xml");
    }

    #[test]
    fn test_ingest_counts_slides_and_normalizes() {
        let bytes = archive(&[
            ("[content_types].xml", b"<Types/>".as_slice()),
            ("ppt/slides/slide1.xml", b"<p:sld/>".as_slice()),
            ("PPT/Slides/Slide2.xml", b"<p:sld/>".as_slice()),
            ("ppt/slides/_rels/slide1.xml.rels", b"<Relationships/>".as_slice()),
        ]);
        let got = ingest(Cursor::new(bytes), &Limits::default(), None).unwrap();
        assert_eq!(got.slide_parts, 2);
        assert!(got.parts.contains_key("[Content_Types].xml"));
        assert_eq!(got.parts.len(), 4);
        assert!(got.overflow.is_empty());
    }

    #[test]
    fn test_size_limit_carries_limit() {
        let bytes = archive(&[("a.xml", [b'a'; 600].as_slice()), ("b.xml", [b'b'; 600].as_slice())]);
        let err = ingest(Cursor::new(bytes), &limits(1000, 1000), None).unwrap_err();
        match err {
            Error::UnzipSizeLimit { limit } => assert_eq!(limit, 1000),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_overflow_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let part_limit = 128u64;
        let big: Vec<u8> = (0..=part_limit).map(|i| (i % 200) as u8).collect();
        let exact = vec![b'x'; part_limit as usize];
        let bytes = archive(&[
            ("ppt/media/big.bin", big.as_slice()),
            ("ppt/media/exact.bin", exact.as_slice()),
        ]);

        let mut got = ingest(
            Cursor::new(bytes),
            &limits(1 << 20, part_limit),
            Some(dir.path()),
        )
        .unwrap();

        // one byte over the limit spills, exactly at the limit stays in memory
        assert!(got.parts.contains_key("ppt/media/exact.bin"));
        let buf = got.overflow.get_mut("ppt/media/big.bin").unwrap();
        assert_eq!(buf.read_all().unwrap(), big);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        for (_, mut buf) in got.overflow.drain() {
            buf.close().unwrap();
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_overflow_failure_falls_back_to_memory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");
        let big = vec![b'z'; 300];
        let bytes = archive(&[("ppt/media/big.bin", big.as_slice())]);

        let got = ingest(Cursor::new(bytes), &limits(1 << 20, 100), Some(&missing)).unwrap();
        assert!(got.overflow.is_empty());
        assert_eq!(got.parts["ppt/media/big.bin"], big);
    }

    #[test]
    fn test_malformed_archive_is_zip_error() {
        let err = ingest(Cursor::new(b"not a zip".to_vec()), &Limits::default(), None).unwrap_err();
        assert!(matches!(err, Error::Zip(_)));
    }
}
