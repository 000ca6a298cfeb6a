//! The codec seam between raw part bytes and decoded structures.

use crate::error::Result;
use crate::opc::compat::XmlAttr;
use crate::opc::xml::push_str_attr;
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared handle to a decoded part.
///
/// Each decoded structure carries its own lock so callers may hold one part
/// without blocking access to the others.
pub type PartHandle<T> = Arc<RwLock<T>>;

/// An XML part that can be decoded from, and encoded back to, package bytes.
///
/// Decoders receive bytes that already went through the Strict to Transitional
/// translation. Root element attributes are not part of the model: the encoder is
/// handed the attributes to write on its root element.
pub trait XmlPart: Default + Send + Sync + Sized + 'static {
    /// Decode the part. Empty input never reaches this method.
    fn from_xml(xml: &[u8]) -> Result<Self>;

    /// Encode the part body (without the XML declaration).
    fn to_xml(&self, root_attrs: &[XmlAttr]) -> String;

    /// Attributes the root element needs when none were recorded for the part.
    fn default_root_attrs() -> Vec<XmlAttr>;

    /// Decode, treating empty input as the default structure.
    fn decode(xml: &[u8]) -> Result<Self> {
        if xml.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        Self::from_xml(xml)
    }
}

/// Wrap a value in a fresh [`PartHandle`].
pub fn handle<T>(value: T) -> PartHandle<T> {
    Arc::new(RwLock::new(value))
}

/// Write `<name attrs...>` for a root element.
pub fn open_root(xml: &mut String, name: &str, root_attrs: &[XmlAttr]) {
    xml.push('<');
    xml.push_str(name);
    for attr in root_attrs {
        push_str_attr(xml, &attr.name, &attr.value);
    }
    xml.push('>');
}
