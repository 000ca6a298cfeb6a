//! `[Content_Types].xml`: Default (by extension) and Override (by part name) rows.

use crate::error::Result;
use crate::opc::compat::XmlAttr;
use crate::opc::constants::namespace;
use crate::opc::packuri::PackURI;
use crate::opc::part::{XmlPart, open_root};
use crate::opc::xml::{attr_value, escape_xml};
use quick_xml::Reader;
use quick_xml::events::Event;

/// A Default row, mapping a file extension to a content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultType {
    pub extension: String,
    pub content_type: String,
}

/// An Override row, mapping one part name (with leading slash) to a content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideType {
    pub part_name: String,
    pub content_type: String,
}

/// Content type declarations of a package, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypes {
    defaults: Vec<DefaultType>,
    overrides: Vec<OverrideType>,
}

impl ContentTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an Override row. Existing rows for the same part are left alone.
    pub fn add_override(&mut self, part_name: &str, content_type: &str) {
        self.overrides.push(OverrideType {
            part_name: part_name.to_string(),
            content_type: content_type.to_string(),
        });
    }

    /// Remove every Override row naming `part_name`; returns how many were removed.
    pub fn remove_override(&mut self, part_name: &str) -> usize {
        let before = self.overrides.len();
        self.overrides.retain(|o| o.part_name != part_name);
        before - self.overrides.len()
    }

    /// Point every Override row for `part_name` at `content_type`.
    pub fn set_override_content_type(&mut self, part_name: &str, content_type: &str) -> bool {
        let mut found = false;
        for row in self.overrides.iter_mut().filter(|o| o.part_name == part_name) {
            row.content_type = content_type.to_string();
            found = true;
        }
        found
    }

    /// The first Override row naming `part_name`.
    pub fn override_for(&self, part_name: &str) -> Option<&str> {
        self.overrides
            .iter()
            .find(|o| o.part_name == part_name)
            .map(|o| o.content_type.as_str())
    }

    /// Content type of a part, checking overrides before extension defaults.
    pub fn content_type_for(&self, part: &PackURI) -> Option<&str> {
        if let Some(ct) = self.override_for(part.as_str()) {
            return Some(ct);
        }
        let ext = part.ext();
        self.defaults
            .iter()
            .find(|d| d.extension.eq_ignore_ascii_case(ext))
            .map(|d| d.content_type.as_str())
    }

    /// Number of Override rows naming `part_name`.
    pub fn override_count(&self, part_name: &str) -> usize {
        self.overrides
            .iter()
            .filter(|o| o.part_name == part_name)
            .count()
    }

    pub fn defaults(&self) -> &[DefaultType] {
        &self.defaults
    }

    pub fn overrides(&self) -> &[OverrideType] {
        &self.overrides
    }
}

impl XmlPart for ContentTypes {
    fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut types = Self::new();
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        loop {
            match reader.read_event()? {
                Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                    // <Default Extension="xml" ContentType="application/xml"/>
                    b"Default" => {
                        let extension = attr_value(&e, b"Extension")?;
                        let content_type = attr_value(&e, b"ContentType")?;
                        if let (Some(ext), Some(ct)) = (extension, content_type) {
                            types.defaults.push(DefaultType {
                                extension: ext,
                                content_type: ct,
                            });
                        }
                    },
                    // <Override PartName="/ppt/presentation.xml" ContentType="..."/>
                    b"Override" => {
                        let part_name = attr_value(&e, b"PartName")?;
                        let content_type = attr_value(&e, b"ContentType")?;
                        if let (Some(pn), Some(ct)) = (part_name, content_type) {
                            types.add_override(&pn, &ct);
                        }
                    },
                    _ => {},
                },
                Event::Eof => break,
                _ => {},
            }
        }

        Ok(types)
    }

    fn to_xml(&self, root_attrs: &[XmlAttr]) -> String {
        let mut xml =
            String::with_capacity(128 + (self.defaults.len() + self.overrides.len()) * 140);
        open_root(&mut xml, "Types", root_attrs);

        for d in &self.defaults {
            xml.push_str(r#"<Default Extension=""#);
            xml.push_str(&escape_xml(&d.extension));
            xml.push_str(r#"" ContentType=""#);
            xml.push_str(&escape_xml(&d.content_type));
            xml.push_str(r#""/>"#);
        }
        for o in &self.overrides {
            xml.push_str(r#"<Override PartName=""#);
            xml.push_str(&escape_xml(&o.part_name));
            xml.push_str(r#"" ContentType=""#);
            xml.push_str(&escape_xml(&o.content_type));
            xml.push_str(r#""/>"#);
        }

        xml.push_str("</Types>");
        xml
    }

    fn default_root_attrs() -> Vec<XmlAttr> {
        vec![XmlAttr::new("xmlns", namespace::OPC_CONTENT_TYPES)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::constants::content_type as CT;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>
  <Override PartName="/ppt/slides/slide1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>
</Types>"#;

    #[test]
    fn test_from_xml() {
        let types = ContentTypes::from_xml(SAMPLE.as_bytes()).unwrap();
        assert_eq!(types.defaults().len(), 2);
        assert_eq!(types.overrides().len(), 2);
        assert_eq!(
            types.override_for("/ppt/presentation.xml"),
            Some(CT::PML_PRESENTATION_MAIN)
        );
    }

    #[test]
    fn test_content_type_lookup_falls_back_to_extension() {
        let types = ContentTypes::from_xml(SAMPLE.as_bytes()).unwrap();
        let slide = PackURI::from_member("ppt/slides/slide1.xml");
        assert_eq!(types.content_type_for(&slide), Some(CT::PML_SLIDE));

        let rels = PackURI::from_member("ppt/slides/_rels/slide1.xml.rels");
        assert_eq!(types.content_type_for(&rels), Some(CT::OPC_RELATIONSHIPS));

        let png = PackURI::from_member("ppt/media/image1.png");
        assert_eq!(types.content_type_for(&png), None);
    }

    #[test]
    fn test_add_is_append_only_and_remove_takes_all() {
        let mut types = ContentTypes::new();
        types.add_override("/ppt/slides/slide2.xml", CT::PML_SLIDE);
        types.add_override("/ppt/slides/slide2.xml", CT::PML_SLIDE);
        assert_eq!(types.override_count("/ppt/slides/slide2.xml"), 2);

        assert_eq!(types.remove_override("/ppt/slides/slide2.xml"), 2);
        assert_eq!(types.override_count("/ppt/slides/slide2.xml"), 0);
        // removing again is a no-op
        assert_eq!(types.remove_override("/ppt/slides/slide2.xml"), 0);
    }

    #[test]
    fn test_to_xml_reparses() {
        let types = ContentTypes::from_xml(SAMPLE.as_bytes()).unwrap();
        let xml = types.to_xml(&ContentTypes::default_root_attrs());
        assert!(xml.starts_with(
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#
        ));
        assert_eq!(ContentTypes::from_xml(xml.as_bytes()).unwrap(), types);
    }

    #[test]
    fn test_set_override_content_type() {
        let mut types = ContentTypes::from_xml(SAMPLE.as_bytes()).unwrap();
        assert!(types.set_override_content_type("/ppt/presentation.xml", CT::PML_PRES_MACRO_MAIN));
        assert_eq!(
            types.override_for("/ppt/presentation.xml"),
            Some(CT::PML_PRES_MACRO_MAIN)
        );
        assert!(!types.set_override_content_type("/missing.xml", CT::XML));
    }
}
