//! Small XML helpers shared by the part codecs.
//!
//! Parsing is done with `quick_xml` pull readers over borrowed byte slices, so
//! unmodeled elements can be captured verbatim by slicing the source between two
//! reader positions.

use crate::error::Result;
use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;
use quick_xml::Reader;
use quick_xml::events::{BytesRef, BytesStart};

/// Declaration written at the top of every encoded part.
pub const XML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";

// Static initialization: automaton is built only once, thread-safe
static XML_ESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .build(["&", "<", ">", "\"", "'"])
        .expect("Failed to build XML escaper")
});

/// Escape XML special characters.
///
/// # Examples
///
/// ```
/// use longan::opc::xml::escape_xml;
/// assert_eq!(escape_xml("a & b"), "a &amp; b");
/// assert_eq!(escape_xml("<tag>\"hello\"</tag>"), "&lt;tag&gt;&quot;hello&quot;&lt;/tag&gt;");
/// ```
#[inline]
pub fn escape_xml(s: &str) -> String {
    XML_ESCAPER.replace_all(s, &["&amp;", "&lt;", "&gt;", "&quot;", "&apos;"])
}

/// Get the unescaped value of the attribute whose qualified name is `key`.
pub fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Parse the attribute `key` as an unsigned integer, ignoring values that do not parse.
pub fn attr_u32(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<u32>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(atoi_simd::parse::<u32, false, false>(attr.value.as_ref()).ok());
        }
    }
    Ok(None)
}

/// Parse the attribute `key` as a signed integer (EMU coordinates may be negative).
pub fn attr_i64(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<i64>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(atoi_simd::parse::<i64, false, false>(attr.value.as_ref()).ok());
        }
    }
    Ok(None)
}

/// Collect every attribute of `e` as `(qualified name, unescaped value)` pairs.
pub fn attributes(e: &BytesStart<'_>) -> Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        out.push((key, attr.unescape_value()?.into_owned()));
    }
    Ok(out)
}

/// Capture a whole element verbatim.
///
/// `start` is the reader position recorded before the element's start event was read;
/// `e` is that start event. Consumes the reader up to and including the end tag.
pub fn capture_element(
    reader: &mut Reader<&[u8]>,
    src: &[u8],
    start: usize,
    e: &BytesStart<'_>,
) -> Result<String> {
    let end = e.to_end().into_owned();
    reader.read_to_end(end.name())?;
    capture_span(reader, src, start)
}

/// Capture the source bytes between `start` and the reader's current position.
pub fn capture_span(reader: &Reader<&[u8]>, src: &[u8], start: usize) -> Result<String> {
    let stop = (reader.buffer_position() as usize).min(src.len());
    Ok(std::str::from_utf8(&src[start.min(stop)..stop])?.to_string())
}

/// Append the character an entity reference stands for.
///
/// Named references outside the predefined five are kept as written.
pub fn push_entity(out: &mut String, entity: &BytesRef<'_>) -> Result<()> {
    let name = std::str::from_utf8(entity)?;
    let resolved = match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => name.strip_prefix('#').and_then(|num| {
            let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => num.parse::<u32>().ok(),
            };
            code.and_then(char::from_u32)
        }),
    };
    match resolved {
        Some(c) => out.push(c),
        None => {
            out.push('&');
            out.push_str(name);
            out.push(';');
        },
    }
    Ok(())
}

/// Write ` name="value"` for an integer value.
pub fn push_int_attr<I: itoa::Integer>(xml: &mut String, name: &str, value: I) {
    let mut buf = itoa::Buffer::new();
    xml.push(' ');
    xml.push_str(name);
    xml.push_str("=\"");
    xml.push_str(buf.format(value));
    xml.push('"');
}

/// Write ` name="value"`, escaping the value.
pub fn push_str_attr(xml: &mut String, name: &str, value: &str) {
    xml.push(' ');
    xml.push_str(name);
    xml.push_str("=\"");
    xml.push_str(&escape_xml(value));
    xml.push('"');
}
