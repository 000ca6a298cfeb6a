//! Lazy, memoized decoding of parts.

use crate::error::Result;
use crate::opc::compat::{NamespaceRegistry, root_attributes, strict_to_transitional};
use crate::opc::part::{PartHandle, XmlPart, handle};
use crate::opc::store::PartStore;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Decoded structures of one kind, keyed by member name.
///
/// Once a part is decoded its cached structure is canonical: later reads return the
/// same handle, and saving re-encodes the structure instead of the original bytes.
#[derive(Debug)]
pub struct PartCache<T> {
    parts: RwLock<HashMap<String, PartHandle<T>>>,
}

impl<T> Default for PartCache<T> {
    fn default() -> Self {
        Self {
            parts: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: XmlPart> PartCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached structure for `path`, decoding it on first access.
    ///
    /// Missing or empty bytes decode to `T::default()`. When two callers race to
    /// decode the same part, the first insert wins and both get that handle.
    pub fn decode(
        &self,
        path: &str,
        store: &PartStore,
        namespaces: &NamespaceRegistry,
    ) -> Result<PartHandle<T>> {
        if let Some(found) = self.parts.read().get(path) {
            return Ok(Arc::clone(found));
        }

        let bytes = store.read_bytes(path)?.unwrap_or_default();
        let value = if bytes.is_empty() {
            T::default()
        } else {
            let xml = strict_to_transitional(&bytes);
            if !namespaces.contains(path) {
                namespaces.record(path, root_attributes(&xml)?);
            }
            T::decode(&xml)?
        };
        tracing::trace!(part = %path, bytes = bytes.len(), "decoded part");

        let mut parts = self.parts.write();
        Ok(Arc::clone(
            parts.entry(path.to_string()).or_insert_with(|| handle(value)),
        ))
    }

    /// Install a structure for `path` that was built in memory.
    pub fn insert(&self, path: &str, value: T) -> PartHandle<T> {
        let h = handle(value);
        self.parts.write().insert(path.to_string(), Arc::clone(&h));
        h
    }

    /// The cached handle for `path`, without decoding.
    pub fn get(&self, path: &str) -> Option<PartHandle<T>> {
        self.parts.read().get(path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.parts.read().contains_key(path)
    }

    /// Drop the cached structure for `path`.
    pub fn invalidate(&self, path: &str) -> Option<PartHandle<T>> {
        self.parts.write().remove(path)
    }

    /// Every cached `(path, handle)` pair, unordered.
    pub fn entries(&self) -> Vec<(String, PartHandle<T>)> {
        self.parts
            .read()
            .iter()
            .map(|(path, h)| (path.clone(), Arc::clone(h)))
            .collect()
    }

    pub fn paths(&self) -> Vec<String> {
        self.parts.read().keys().cloned().collect()
    }

    pub fn clear(&self) {
        self.parts.write().clear();
    }
}
