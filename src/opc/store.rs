//! Raw byte storage for package parts.
//!
//! Every part is backed by exactly one of: resident bytes, or an [`OverflowBuffer`].
//! Decoded structures live in [`crate::opc::cache::PartCache`]; this store keeps the
//! bytes they were decoded from, plus every part that was never decoded.

use crate::opc::overflow::{OverflowBuffer, OverflowMap};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::io::{self, Write};

#[derive(Debug, Default)]
pub struct PartStore {
    resident: RwLock<HashMap<String, Vec<u8>>>,
    overflow: RwLock<OverflowMap>,
}

impl PartStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from freshly ingested parts.
    pub fn from_parts(
        resident: HashMap<String, Vec<u8>>,
        overflow: HashMap<String, OverflowBuffer>,
    ) -> Self {
        Self {
            resident: RwLock::new(resident),
            overflow: RwLock::new(
                overflow
                    .into_iter()
                    .map(|(path, buf)| (path, Mutex::new(buf)))
                    .collect(),
            ),
        }
    }

    /// Store resident bytes for `path`, replacing any previous backing.
    ///
    /// A replaced overflow buffer is closed; its close error is returned.
    pub fn insert(&self, path: &str, bytes: Vec<u8>) -> io::Result<()> {
        let previous = self.overflow.write().remove(path);
        self.resident.write().insert(path.to_string(), bytes);
        match previous {
            Some(buf) => buf.into_inner().close(),
            None => Ok(()),
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.resident.read().contains_key(path) || self.overflow.read().contains_key(path)
    }

    pub fn is_overflow(&self, path: &str) -> bool {
        self.overflow.read().contains_key(path)
    }

    /// A copy of the bytes backing `path`.
    ///
    /// Overflow parts are read back from their buffer each time; the bytes are not
    /// promoted to resident storage.
    pub fn read_bytes(&self, path: &str) -> io::Result<Option<Vec<u8>>> {
        if let Some(bytes) = self.resident.read().get(path) {
            return Ok(Some(bytes.clone()));
        }
        let overflow = self.overflow.read();
        match overflow.get(path) {
            Some(buf) => Ok(Some(buf.lock().read_all()?)),
            None => Ok(None),
        }
    }

    /// Run `f` over the resident bytes of `path` without copying them.
    pub fn with_resident<R>(&self, path: &str, f: impl FnOnce(&[u8]) -> R) -> Option<R> {
        self.resident.read().get(path).map(|bytes| f(bytes))
    }

    /// Stream an overflow part into `sink`; returns the number of bytes copied.
    pub fn copy_overflow<W: Write + ?Sized>(
        &self,
        path: &str,
        sink: &mut W,
    ) -> io::Result<Option<u64>> {
        let overflow = self.overflow.read();
        let Some(buf) = overflow.get(path) else {
            return Ok(None);
        };
        let mut buf = buf.lock();
        let mut reader = buf.reader()?;
        Ok(Some(io::copy(&mut reader, sink)?))
    }

    /// Size in bytes of the part, if stored.
    pub fn len_of(&self, path: &str) -> Option<u64> {
        if let Some(bytes) = self.resident.read().get(path) {
            return Some(bytes.len() as u64);
        }
        self.overflow.read().get(path).map(|buf| buf.lock().len())
    }

    /// Drop the bytes of `path`, deleting its backing file if it has one.
    pub fn remove(&self, path: &str) -> io::Result<()> {
        self.resident.write().remove(path);
        match self.overflow.write().remove(path) {
            Some(buf) => buf.into_inner().close(),
            None => Ok(()),
        }
    }

    /// Member names of resident parts, unordered.
    pub fn resident_paths(&self) -> Vec<String> {
        self.resident.read().keys().cloned().collect()
    }

    /// Member names of overflow parts, unordered.
    pub fn overflow_paths(&self) -> Vec<String> {
        self.overflow.read().keys().cloned().collect()
    }

    /// Close every overflow buffer and clear both maps.
    ///
    /// All buffers are closed even when one fails; the first failure is returned.
    pub fn close(&self) -> io::Result<()> {
        let mut first_err = None;
        for (path, buf) in self.overflow.write().drain() {
            if let Err(err) = buf.into_inner().close() {
                tracing::warn!(part = %path, error = %err, "failed to remove overflow file");
                first_err.get_or_insert(err);
            }
        }
        self.resident.write().clear();
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
