//! Theme part (`ppt/theme/themeN.xml`).
//!
//! The theme is read-only: the color scheme and the major/minor Latin fonts are
//! decoded, and the element body is written back exactly as it was read.

use crate::error::Result;
use crate::opc::compat::XmlAttr;
use crate::opc::constants::namespace;
use crate::opc::part::{XmlPart, open_root};
use crate::opc::xml::attr_value;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Color slot names of a color scheme, in schema order.
pub const COLOR_SLOTS: [&str; 12] = [
    "dk1", "lt1", "dk2", "lt2", "accent1", "accent2", "accent3", "accent4", "accent5",
    "accent6", "hlink", "folHlink",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeColor {
    /// `a:srgbClr`, hex RGB
    Rgb(String),
    /// `a:sysClr`, with the last computed RGB value
    System { value: String, last: Option<String> },
    /// Any other color model, by element name
    Other(String),
}

impl ThemeColor {
    /// Hex RGB of the color when one is known.
    pub fn rgb(&self) -> Option<&str> {
        match self {
            ThemeColor::Rgb(rgb) => Some(rgb),
            ThemeColor::System { last, .. } => last.as_deref(),
            ThemeColor::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorScheme {
    pub name: String,
    pub colors: Vec<(String, ThemeColor)>,
}

impl ColorScheme {
    pub fn color(&self, slot: &str) -> Option<&ThemeColor> {
        self.colors
            .iter()
            .find_map(|(name, color)| (name == slot).then_some(color))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Theme {
    name: Option<String>,
    color_scheme: Option<ColorScheme>,
    major_font: Option<String>,
    minor_font: Option<String>,
    body: String,
}

impl Theme {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn color_scheme(&self) -> Option<&ColorScheme> {
        self.color_scheme.as_ref()
    }

    /// Latin typeface of the major (heading) font.
    pub fn major_font(&self) -> Option<&str> {
        self.major_font.as_deref()
    }

    /// Latin typeface of the minor (body) font.
    pub fn minor_font(&self) -> Option<&str> {
        self.minor_font.as_deref()
    }
}

fn parse_color(reader: &mut Reader<&[u8]>) -> Result<Option<ThemeColor>> {
    let mut color = None;
    let mut depth = 0usize;

    let mut read = |e: &BytesStart<'_>| -> Result<()> {
        if color.is_some() {
            return Ok(());
        }
        color = Some(match e.local_name().as_ref() {
            b"srgbClr" => ThemeColor::Rgb(attr_value(e, b"val")?.unwrap_or_default()),
            b"sysClr" => ThemeColor::System {
                value: attr_value(e, b"val")?.unwrap_or_default(),
                last: attr_value(e, b"lastClr")?,
            },
            other => ThemeColor::Other(String::from_utf8_lossy(other).into_owned()),
        });
        Ok(())
    };

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if depth == 0 {
                    read(&e)?;
                }
                depth += 1;
            },
            Event::Empty(e) if depth == 0 => read(&e)?,
            Event::End(_) => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            },
            Event::Eof => break,
            _ => {},
        }
    }
    Ok(color)
}

fn parse_color_scheme(reader: &mut Reader<&[u8]>, name: String) -> Result<ColorScheme> {
    let mut scheme = ColorScheme {
        name,
        colors: Vec::with_capacity(COLOR_SLOTS.len()),
    };
    let mut depth = 0usize;
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let slot = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if COLOR_SLOTS.contains(&slot.as_str()) {
                    if let Some(color) = parse_color(reader)? {
                        scheme.colors.push((slot, color));
                    }
                } else {
                    depth += 1;
                }
            },
            Event::End(_) => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            },
            Event::Eof => break,
            _ => {},
        }
    }
    Ok(scheme)
}

/// Typeface of the `a:latin` child of a font element.
fn parse_latin_typeface(reader: &mut Reader<&[u8]>) -> Result<Option<String>> {
    let mut typeface = None;
    let mut depth = 0usize;
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if depth == 0 && e.local_name().as_ref() == b"latin" {
                    typeface = attr_value(&e, b"typeface")?;
                }
                depth += 1;
            },
            Event::Empty(e) if depth == 0 && e.local_name().as_ref() == b"latin" => {
                typeface = attr_value(&e, b"typeface")?;
            },
            Event::End(_) => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            },
            Event::Eof => break,
            _ => {},
        }
    }
    Ok(typeface)
}

impl XmlPart for Theme {
    fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        let mut theme = Theme::default();
        let mut body_start = None;
        let mut depth = 0usize;

        loop {
            let pos = reader.buffer_position() as usize;
            match reader.read_event()? {
                Event::Start(e) if body_start.is_none() => {
                    theme.name = attr_value(&e, b"name")?;
                    body_start = Some(reader.buffer_position() as usize);
                },
                Event::Empty(e) if body_start.is_none() => {
                    theme.name = attr_value(&e, b"name")?;
                    break;
                },
                Event::Start(e) => match e.local_name().as_ref() {
                    b"clrScheme" if theme.color_scheme.is_none() => {
                        let name = attr_value(&e, b"name")?.unwrap_or_default();
                        theme.color_scheme = Some(parse_color_scheme(&mut reader, name)?);
                    },
                    b"majorFont" => theme.major_font = parse_latin_typeface(&mut reader)?,
                    b"minorFont" => theme.minor_font = parse_latin_typeface(&mut reader)?,
                    _ => depth += 1,
                },
                Event::End(_) => {
                    if depth == 0 {
                        if let Some(start) = body_start {
                            theme.body = std::str::from_utf8(&xml[start..pos])?.to_string();
                        }
                        break;
                    }
                    depth -= 1;
                },
                Event::Eof => break,
                _ => {},
            }
        }

        Ok(theme)
    }

    fn to_xml(&self, root_attrs: &[XmlAttr]) -> String {
        let mut xml = String::with_capacity(self.body.len() + 256);
        open_root(&mut xml, "a:theme", root_attrs);
        xml.push_str(&self.body);
        xml.push_str("</a:theme>");
        xml
    }

    fn default_root_attrs() -> Vec<XmlAttr> {
        vec![
            XmlAttr::new("xmlns:a", namespace::DML_MAIN),
            XmlAttr::new("name", "Office Theme"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THEME: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme"><a:themeElements><a:clrScheme name="Office"><a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1><a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="1F497D"/></a:dk2><a:accent1><a:srgbClr val="4F81BD"><a:lumMod val="75000"/></a:srgbClr></a:accent1></a:clrScheme><a:fontScheme name="Office"><a:majorFont><a:latin typeface="Calibri Light"/><a:ea typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/></a:minorFont></a:fontScheme><a:fmtScheme name="Office"/></a:themeElements><a:objectDefaults/></a:theme>"#;

    #[test]
    fn test_parse_theme() {
        let theme = Theme::from_xml(THEME.as_bytes()).unwrap();
        assert_eq!(theme.name(), Some("Office Theme"));
        assert_eq!(theme.major_font(), Some("Calibri Light"));
        assert_eq!(theme.minor_font(), Some("Calibri"));

        let scheme = theme.color_scheme().unwrap();
        assert_eq!(scheme.name, "Office");
        assert_eq!(scheme.colors.len(), 4);
        assert_eq!(scheme.color("dk1").and_then(ThemeColor::rgb), Some("000000"));
        assert_eq!(scheme.color("accent1"), Some(&ThemeColor::Rgb("4F81BD".into())));
        assert!(scheme.color("hlink").is_none());
    }

    #[test]
    fn test_body_is_written_back() {
        let theme = Theme::from_xml(THEME.as_bytes()).unwrap();
        let attrs = [
            XmlAttr::new("xmlns:a", namespace::DML_MAIN),
            XmlAttr::new("name", "Office Theme"),
        ];
        let xml = theme.to_xml(&attrs);
        let original = THEME.split_once('\n').unwrap().1;
        assert_eq!(xml, original);
    }
}
