//! Namespace compatibility between the Strict and Transitional dialects.
//!
//! Three concerns live here, each applied at a single point of the pipeline:
//!
//! - [`strict_to_transitional`] rewrites Strict namespace URIs in raw part bytes
//!   before decoding, so every codec only ever sees the Transitional dialect.
//! - [`NamespaceRegistry`] remembers the attributes found on each part's root element
//!   and lets callers declare extra namespaces, merging markup-compatibility
//!   `Ignorable` prefixes as needed. Encoders write these attributes back verbatim.
//! - [`collapse_relationship_prefix`] is a post-encode byte fixup that restores the
//!   conventional `r` prefix for the relationships namespace.

use crate::error::Result;
use crate::opc::constants::namespace;
use crate::opc::xml::{attributes, push_str_attr};
use aho_corasick::AhoCorasick;
use memchr::memmem;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use quick_xml::Reader;
use quick_xml::events::Event;
use smallvec::SmallVec;
use std::borrow::Cow;
use std::collections::HashMap;

const STRICT_NAMESPACES: [&str; 4] = [
    namespace::STRICT_DOC_PROPS_VTYPES,
    namespace::STRICT_DML_MAIN,
    namespace::STRICT_EXTENDED_PROPERTIES,
    namespace::STRICT_PML_MAIN,
];

const TRANSITIONAL_NAMESPACES: [&str; 4] = [
    namespace::OFC_DOC_PROPS_VTYPES,
    namespace::DML_MAIN,
    namespace::OFC_EXTENDED_PROPERTIES,
    namespace::PML_MAIN,
];

static STRICT_MATCHER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::new(STRICT_NAMESPACES).expect("Failed to build strict namespace matcher")
});

/// Namespace prefixes that may be listed in `mc:Ignorable`.
pub const IGNORABLE_PREFIXES: &[&str] = &[
    "c14", "cdr14", "a14", "pic14", "x14", "xdr14", "x14ac", "dsp", "mso14", "dgm14", "x15",
    "x12ac", "x15ac", "xr", "xr2", "xr3", "xr4", "xr5", "xr6", "xr7", "xr8", "xr9", "xr10",
    "xr11", "xr12", "xr13", "xr14", "xr15", "x16", "x16r2", "mo", "mx", "mv", "o", "v",
];

const MC_DECLARATION: &str = "xmlns:mc";
const MC_IGNORABLE: &str = "mc:Ignorable";

const VERBOSE_RELATIONSHIP_PREFIX: &str = "xmlns:relationships=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\" relationships";

/// A single attribute of a part's root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttr {
    /// Qualified name (e.g. `xmlns:a`, `mc:Ignorable`)
    pub name: String,
    pub value: String,
}

impl XmlAttr {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// The declared prefix when this attribute is a namespace declaration.
    pub fn declared_prefix(&self) -> Option<&str> {
        self.name.strip_prefix("xmlns:")
    }
}

/// Root element attribute list; most roots declare only a handful of namespaces.
pub type RootAttrs = SmallVec<[XmlAttr; 8]>;

/// Rewrite Strict namespace URIs to their Transitional equivalents.
///
/// Borrows the input unchanged when no Strict URI occurs.
pub fn strict_to_transitional(bytes: &[u8]) -> Cow<'_, [u8]> {
    if !STRICT_MATCHER.is_match(bytes) {
        return Cow::Borrowed(bytes);
    }
    Cow::Owned(STRICT_MATCHER.replace_all_bytes(bytes, &TRANSITIONAL_NAMESPACES))
}

/// Replace the verbose relationships prefix some encoders emit with `r`.
pub fn collapse_relationship_prefix(xml: String) -> String {
    if memmem::find(xml.as_bytes(), VERBOSE_RELATIONSHIP_PREFIX.as_bytes()).is_none() {
        return xml;
    }
    xml.replace(VERBOSE_RELATIONSHIP_PREFIX, "r")
}

/// Read the attributes of the first element in `xml`.
pub fn root_attributes(xml: &[u8]) -> Result<RootAttrs> {
    let mut reader = Reader::from_reader(xml);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                return Ok(attributes(&e)?
                    .into_iter()
                    .map(|(name, value)| XmlAttr { name, value })
                    .collect());
            },
            Event::Eof => return Ok(RootAttrs::new()),
            _ => {},
        }
    }
}

/// Write recorded root attributes into the raw bytes of a part that was never decoded.
///
/// Attributes the root already carries keep their source value, except
/// `mc:Ignorable`, which takes the recorded one. Recorded attributes the root lacks
/// are appended. Borrows the input when nothing changes.
pub fn apply_root_attributes<'a>(xml: &'a [u8], attrs: &[XmlAttr]) -> Result<Cow<'a, [u8]>> {
    let mut reader = Reader::from_reader(xml);
    let (start, e, empty) = loop {
        let pos = reader.buffer_position() as usize;
        match reader.read_event()? {
            Event::Start(e) => break (pos, e, false),
            Event::Empty(e) => break (pos, e, true),
            Event::Eof => return Ok(Cow::Borrowed(xml)),
            _ => {},
        }
    };
    let end = (reader.buffer_position() as usize).min(xml.len());
    let source = attributes(&e)?;

    let mut changed = false;
    let mut tag = String::with_capacity(end - start + 128);
    tag.push('<');
    tag.push_str(std::str::from_utf8(e.name().as_ref())?);
    for (name, value) in &source {
        let recorded = attrs
            .iter()
            .filter(|a| a.name == MC_IGNORABLE)
            .find(|a| a.name == *name && a.value != *value);
        match recorded {
            Some(attr) => {
                changed = true;
                push_str_attr(&mut tag, name, &attr.value);
            },
            None => push_str_attr(&mut tag, name, value),
        }
    }
    for attr in attrs {
        if !source.iter().any(|(name, _)| *name == attr.name) {
            changed = true;
            push_str_attr(&mut tag, &attr.name, &attr.value);
        }
    }
    if !changed {
        return Ok(Cow::Borrowed(xml));
    }
    tag.push_str(if empty { "/>" } else { ">" });

    let mut out = Vec::with_capacity(xml.len() + tag.len());
    out.extend_from_slice(&xml[..start]);
    out.extend_from_slice(tag.as_bytes());
    out.extend_from_slice(&xml[end..]);
    Ok(Cow::Owned(out))
}

/// Append every attribute of `defaults` whose name is not already in `attrs`.
pub fn merge_defaults(attrs: &mut RootAttrs, defaults: &[XmlAttr]) {
    for attr in defaults {
        if !attrs.iter().any(|a| a.name == attr.name) {
            attrs.push(attr.clone());
        }
    }
}

/// Per-part record of root element attributes.
#[derive(Debug, Default)]
pub struct NamespaceRegistry {
    roots: RwLock<HashMap<String, RootAttrs>>,
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the attributes decoded from a part, unless a record already exists.
    pub fn record(&self, path: &str, attrs: RootAttrs) {
        self.roots.write().entry(path.to_string()).or_insert(attrs);
    }

    /// Replace the record for `path`.
    pub fn set(&self, path: &str, attrs: RootAttrs) {
        self.roots.write().insert(path.to_string(), attrs);
    }

    pub fn contains(&self, path: &str) -> bool {
        self.roots.read().contains_key(path)
    }

    /// The recorded attributes of `path`, if any.
    pub fn attrs_for(&self, path: &str) -> Option<RootAttrs> {
        self.roots.read().get(path).cloned()
    }

    /// Declare a namespace on the root element of `path`.
    ///
    /// The markup-compatibility namespace is declared alongside it, and prefixes on
    /// [`IGNORABLE_PREFIXES`] are merged into `mc:Ignorable`.
    pub fn register_namespace(&self, path: &str, attr: XmlAttr) {
        let mut roots = self.roots.write();
        let attrs = roots.entry(path.to_string()).or_default();

        if !attrs.iter().any(|a| a.name == attr.name) {
            attrs.push(attr.clone());
        }
        if !attrs.iter().any(|a| a.name == MC_DECLARATION) {
            attrs.push(XmlAttr::new(MC_DECLARATION, namespace::MC));
        }

        let Some(prefix) = attr.declared_prefix() else {
            return;
        };
        if !IGNORABLE_PREFIXES.contains(&prefix) {
            return;
        }
        match attrs.iter_mut().find(|a| a.name == MC_IGNORABLE) {
            Some(ignorable) => {
                if !ignorable.value.split_whitespace().any(|p| p == prefix) {
                    if !ignorable.value.trim().is_empty() {
                        ignorable.value.push(' ');
                    }
                    ignorable.value.push_str(prefix);
                }
            },
            None => attrs.push(XmlAttr::new(MC_IGNORABLE, prefix)),
        }
    }

    /// Forget the record for `path`.
    pub fn invalidate(&self, path: &str) {
        self.roots.write().remove(path);
    }

    pub fn clear(&self) {
        self.roots.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_translation() {
        let src = br#"<p:sld xmlns:a="http://purl.oclc.org/ooxml/drawingml/main" xmlns:p="http://purl.oclc.org/ooxml/presentationml/main"/>"#;
        let out = strict_to_transitional(src);
        let text = std::str::from_utf8(&out).unwrap();
        assert!(text.contains(r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main""#));
        assert!(
            text.contains(r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#)
        );
        assert!(!text.contains("purl.oclc.org"));
    }

    #[test]
    fn test_transitional_input_is_borrowed() {
        let src = br#"<p:sld xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"/>"#;
        assert!(matches!(strict_to_transitional(src), Cow::Borrowed(_)));
    }

    #[test]
    fn test_collapse_relationship_prefix() {
        let xml = format!("<p:sldId {}:id=\"rId2\"/>", VERBOSE_RELATIONSHIP_PREFIX);
        assert_eq!(collapse_relationship_prefix(xml), "<p:sldId r:id=\"rId2\"/>");
        assert_eq!(collapse_relationship_prefix("<a/>".to_string()), "<a/>");
    }

    #[test]
    fn test_root_attributes() {
        let src = br#"<?xml version="1.0"?><p:presentation xmlns:p="urn:p" saveSubsetFonts="1"><x/></p:presentation>"#;
        let attrs = root_attributes(src).unwrap();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0], XmlAttr::new("xmlns:p", "urn:p"));
        assert_eq!(attrs[1], XmlAttr::new("saveSubsetFonts", "1"));
    }

    #[test]
    fn test_register_namespace_merges_ignorable() {
        let registry = NamespaceRegistry::new();
        let path = "ppt/slides/slide1.xml";
        registry.record(path, RootAttrs::new());

        registry.register_namespace(
            path,
            XmlAttr::new("xmlns:a14", "http://schemas.microsoft.com/office/drawing/2010/main"),
        );
        registry.register_namespace(
            path,
            XmlAttr::new("xmlns:v", "urn:schemas-microsoft-com:vml"),
        );
        // registering twice does not duplicate anything
        registry.register_namespace(
            path,
            XmlAttr::new("xmlns:v", "urn:schemas-microsoft-com:vml"),
        );

        let attrs = registry.attrs_for(path).unwrap();
        let names: Vec<&str> = attrs.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["xmlns:a14", "xmlns:mc", "mc:Ignorable", "xmlns:v"]);
        let ignorable = attrs.iter().find(|a| a.name == "mc:Ignorable").unwrap();
        assert_eq!(ignorable.value, "a14 v");
    }

    #[test]
    fn test_unknown_prefix_is_not_ignorable() {
        let registry = NamespaceRegistry::new();
        registry.register_namespace(
            "ppt/presentation.xml",
            XmlAttr::new("xmlns:r", namespace::OFC_RELATIONSHIPS),
        );
        let attrs = registry.attrs_for("ppt/presentation.xml").unwrap();
        assert!(attrs.iter().any(|a| a.name == "xmlns:mc"));
        assert!(!attrs.iter().any(|a| a.name == "mc:Ignorable"));
    }

    #[test]
    fn test_record_keeps_first() {
        let registry = NamespaceRegistry::new();
        let mut first = RootAttrs::new();
        first.push(XmlAttr::new("xmlns:p", "one"));
        let mut second = RootAttrs::new();
        second.push(XmlAttr::new("xmlns:p", "two"));
        registry.record("a.xml", first);
        registry.record("a.xml", second);
        assert_eq!(registry.attrs_for("a.xml").unwrap()[0].value, "one");

        registry.invalidate("a.xml");
        assert!(!registry.contains("a.xml"));
    }

    #[test]
    fn test_apply_root_attributes() {
        let src = b"<?xml version=\"1.0\"?>\n<p:sldMaster xmlns:p=\"urn:p\" mc:Ignorable=\"p14\"><p:cSld/></p:sldMaster>";
        let attrs = [
            XmlAttr::new("xmlns:p", "ignored"),
            XmlAttr::new("mc:Ignorable", "p14 a14"),
            XmlAttr::new("xmlns:a14", "urn:a14"),
        ];
        let out = apply_root_attributes(src, &attrs).unwrap();
        assert_eq!(
            std::str::from_utf8(&out).unwrap(),
            "<?xml version=\"1.0\"?>\n<p:sldMaster xmlns:p=\"urn:p\" mc:Ignorable=\"p14 a14\" xmlns:a14=\"urn:a14\"><p:cSld/></p:sldMaster>"
        );
    }

    #[test]
    fn test_apply_root_attributes_unchanged_is_borrowed() {
        let src = br#"<p:sld xmlns:p="urn:p"/>"#;
        let out = apply_root_attributes(src, &[XmlAttr::new("xmlns:p", "urn:p")]).unwrap();
        assert!(matches!(out, Cow::Borrowed(_)));

        let out = apply_root_attributes(src, &[XmlAttr::new("xmlns:v", "urn:v")]).unwrap();
        assert_eq!(&out[..], br#"<p:sld xmlns:p="urn:p" xmlns:v="urn:v"/>"#);
    }

    #[test]
    fn test_merge_defaults() {
        let mut attrs = RootAttrs::new();
        attrs.push(XmlAttr::new("xmlns:p", "custom"));
        merge_defaults(
            &mut attrs,
            &[XmlAttr::new("xmlns:p", "default"), XmlAttr::new("xmlns:a", "a")],
        );
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].value, "custom");
        assert_eq!(attrs[1].name, "xmlns:a");
    }
}
