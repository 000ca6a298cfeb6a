/// Presentation part - the main part in a .pptx package.
///
/// Corresponds to `/ppt/presentation.xml` in the package.
use crate::error::Result;
use crate::opc::compat::XmlAttr;
use crate::opc::constants::namespace;
use crate::opc::part::{XmlPart, open_root};
use crate::opc::xml::{
    attr_i64, attr_u32, attr_value, capture_element, capture_span, push_int_attr, push_str_attr,
};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// A `p:sldId` record: the caller-visible slide id and the presentation relationship
/// pointing at the slide part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideId {
    pub id: u32,
    pub r_id: String,
}

/// A `p:sldMasterId` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideMasterId {
    pub id: u32,
    pub r_id: String,
}

/// Slide dimensions (`p:sldSz`), in EMUs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideSize {
    pub cx: i64,
    pub cy: i64,
    /// Preset kind, e.g. `screen4x3`
    pub kind: Option<String>,
}

/// Notes page dimensions (`p:notesSz`), in EMUs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotesSize {
    pub cx: i64,
    pub cy: i64,
}

/// Position of each child of `p:presentation`, so unmodeled elements keep their place.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Child {
    MasterIds,
    SlideIds,
    SlideSize,
    NotesSize,
    Raw(String),
}

/// The decoded presentation part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    masters: Vec<SlideMasterId>,
    slides: Vec<SlideId>,
    slide_size: Option<SlideSize>,
    notes_size: Option<NotesSize>,
    children: Vec<Child>,
}

impl Default for Presentation {
    fn default() -> Self {
        Self {
            masters: Vec::new(),
            slides: Vec::new(),
            slide_size: None,
            notes_size: None,
            children: vec![
                Child::MasterIds,
                Child::SlideIds,
                Child::SlideSize,
                Child::NotesSize,
            ],
        }
    }
}

impl Presentation {
    /// Slide records in presentation order.
    pub fn slides(&self) -> &[SlideId] {
        &self.slides
    }

    pub fn masters(&self) -> &[SlideMasterId] {
        &self.masters
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    pub fn slide(&self, id: u32) -> Option<&SlideId> {
        self.slides.iter().find(|s| s.id == id)
    }

    /// Largest slide id in the list.
    pub fn max_slide_id(&self) -> Option<u32> {
        self.slides.iter().map(|s| s.id).max()
    }

    pub fn push_slide(&mut self, id: u32, r_id: impl Into<String>) {
        self.slides.push(SlideId {
            id,
            r_id: r_id.into(),
        });
    }

    /// Remove the slide record with `id`.
    pub fn remove_slide(&mut self, id: u32) -> Option<SlideId> {
        let pos = self.slides.iter().position(|s| s.id == id)?;
        Some(self.slides.remove(pos))
    }

    pub fn slide_size(&self) -> Option<&SlideSize> {
        self.slide_size.as_ref()
    }

    pub fn set_slide_size(&mut self, size: SlideSize) {
        self.slide_size = Some(size);
    }

    pub fn notes_size(&self) -> Option<NotesSize> {
        self.notes_size
    }

    pub fn set_notes_size(&mut self, size: NotesSize) {
        self.notes_size = Some(size);
    }
}

/// The `r:id` attribute, whatever prefix the producer bound to the relationships
/// namespace.
fn relationship_id(e: &BytesStart<'_>) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == b"id" && attr.key.prefix().is_some() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Read the `id`/`r:id` pairs of an id list element.
fn parse_id_list(reader: &mut Reader<&[u8]>, item: &[u8]) -> Result<Vec<(u32, String)>> {
    let mut ids = Vec::new();
    let mut depth = 0usize;
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if e.local_name().as_ref() == item {
                    ids.push((
                        attr_u32(&e, b"id")?.unwrap_or(0),
                        relationship_id(&e)?.unwrap_or_default(),
                    ));
                }
                depth += 1;
            },
            Event::Empty(e) if e.local_name().as_ref() == item => {
                ids.push((
                    attr_u32(&e, b"id")?.unwrap_or(0),
                    relationship_id(&e)?.unwrap_or_default(),
                ));
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
    Ok(ids)
}

impl XmlPart for Presentation {
    fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        let mut pres = Presentation {
            children: Vec::new(),
            ..Presentation::default()
        };
        let mut in_root = false;

        loop {
            let pos = reader.buffer_position() as usize;
            match reader.read_event()? {
                Event::Start(_) if !in_root => in_root = true,
                Event::Empty(_) if !in_root => break,
                Event::Start(e) => match e.local_name().as_ref() {
                    b"sldMasterIdLst" => {
                        pres.masters = parse_id_list(&mut reader, b"sldMasterId")?
                            .into_iter()
                            .map(|(id, r_id)| SlideMasterId { id, r_id })
                            .collect();
                        pres.children.push(Child::MasterIds);
                    },
                    b"sldIdLst" => {
                        pres.slides = parse_id_list(&mut reader, b"sldId")?
                            .into_iter()
                            .map(|(id, r_id)| SlideId { id, r_id })
                            .collect();
                        pres.children.push(Child::SlideIds);
                    },
                    _ => {
                        let raw = capture_element(&mut reader, xml, pos, &e)?;
                        pres.children.push(Child::Raw(raw));
                    },
                },
                Event::Empty(e) => match e.local_name().as_ref() {
                    b"sldMasterIdLst" => pres.children.push(Child::MasterIds),
                    b"sldIdLst" => pres.children.push(Child::SlideIds),
                    b"sldSz" => {
                        pres.slide_size = Some(SlideSize {
                            cx: attr_i64(&e, b"cx")?.unwrap_or(0),
                            cy: attr_i64(&e, b"cy")?.unwrap_or(0),
                            kind: attr_value(&e, b"type")?,
                        });
                        pres.children.push(Child::SlideSize);
                    },
                    b"notesSz" => {
                        pres.notes_size = Some(NotesSize {
                            cx: attr_i64(&e, b"cx")?.unwrap_or(0),
                            cy: attr_i64(&e, b"cy")?.unwrap_or(0),
                        });
                        pres.children.push(Child::NotesSize);
                    },
                    _ => {
                        let raw = capture_span(&reader, xml, pos)?;
                        pres.children.push(Child::Raw(raw));
                    },
                },
                Event::End(_) | Event::Eof => break,
                _ => {},
            }
        }

        Ok(pres)
    }

    fn to_xml(&self, root_attrs: &[XmlAttr]) -> String {
        let mut xml = String::with_capacity(512);
        open_root(&mut xml, "p:presentation", root_attrs);

        let has = |wanted: &Child| self.children.iter().any(|c| c == wanted);
        let mut children = self.children.clone();
        if !has(&Child::SlideIds) && !self.slides.is_empty() {
            // sldIdLst follows the master lists
            let at = children
                .iter()
                .position(|c| *c == Child::MasterIds)
                .map_or(0, |i| i + 1);
            children.insert(at, Child::SlideIds);
        }
        if !has(&Child::SlideSize) && self.slide_size.is_some() {
            children.push(Child::SlideSize);
        }
        if !has(&Child::NotesSize) && self.notes_size.is_some() {
            children.push(Child::NotesSize);
        }

        for child in &children {
            match child {
                Child::MasterIds => {
                    if self.masters.is_empty() {
                        continue;
                    }
                    xml.push_str("<p:sldMasterIdLst>");
                    for master in &self.masters {
                        xml.push_str("<p:sldMasterId");
                        push_int_attr(&mut xml, "id", master.id);
                        push_str_attr(&mut xml, "r:id", &master.r_id);
                        xml.push_str("/>");
                    }
                    xml.push_str("</p:sldMasterIdLst>");
                },
                Child::SlideIds => {
                    if self.slides.is_empty() {
                        continue;
                    }
                    xml.push_str("<p:sldIdLst>");
                    for slide in &self.slides {
                        xml.push_str("<p:sldId");
                        push_int_attr(&mut xml, "id", slide.id);
                        push_str_attr(&mut xml, "r:id", &slide.r_id);
                        xml.push_str("/>");
                    }
                    xml.push_str("</p:sldIdLst>");
                },
                Child::SlideSize => {
                    if let Some(size) = &self.slide_size {
                        xml.push_str("<p:sldSz");
                        push_int_attr(&mut xml, "cx", size.cx);
                        push_int_attr(&mut xml, "cy", size.cy);
                        if let Some(kind) = &size.kind {
                            push_str_attr(&mut xml, "type", kind);
                        }
                        xml.push_str("/>");
                    }
                },
                Child::NotesSize => {
                    if let Some(size) = self.notes_size {
                        xml.push_str("<p:notesSz");
                        push_int_attr(&mut xml, "cx", size.cx);
                        push_int_attr(&mut xml, "cy", size.cy);
                        xml.push_str("/>");
                    }
                },
                Child::Raw(raw) => xml.push_str(raw),
            }
        }

        xml.push_str("</p:presentation>");
        xml
    }

    fn default_root_attrs() -> Vec<XmlAttr> {
        vec![
            XmlAttr::new("xmlns:a", namespace::DML_MAIN),
            XmlAttr::new("xmlns:r", namespace::OFC_RELATIONSHIPS),
            XmlAttr::new("xmlns:p", namespace::PML_MAIN),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRESENTATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" saveSubsetFonts="1">
<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>
<p:sldIdLst><p:sldId id="256" r:id="rId2"/><p:sldId id="300" r:id="rId7"/></p:sldIdLst>
<p:sldSz cx="9144000" cy="6858000" type="screen4x3"/>
<p:notesSz cx="6858000" cy="9144000"/>
<p:defaultTextStyle><a:defPPr><a:defRPr lang="en-US"/></a:defPPr></p:defaultTextStyle>
</p:presentation>"#;

    #[test]
    fn test_parse_presentation() {
        let pres = Presentation::from_xml(PRESENTATION.as_bytes()).unwrap();
        assert_eq!(pres.masters().len(), 1);
        assert_eq!(pres.masters()[0].id, 2147483648);
        assert_eq!(pres.slide_count(), 2);
        assert_eq!(pres.slides()[1].r_id, "rId7");
        assert_eq!(pres.max_slide_id(), Some(300));

        let size = pres.slide_size().unwrap();
        assert_eq!((size.cx, size.cy), (9144000, 6858000));
        assert_eq!(size.kind.as_deref(), Some("screen4x3"));
        assert_eq!(pres.notes_size(), Some(NotesSize { cx: 6858000, cy: 9144000 }));
    }

    #[test]
    fn test_encode_keeps_child_order() {
        let mut pres = Presentation::from_xml(PRESENTATION.as_bytes()).unwrap();
        pres.remove_slide(256);
        pres.push_slide(301, "rId8");

        let xml = pres.to_xml(&Presentation::default_root_attrs());
        let ids = xml.find("<p:sldIdLst>").unwrap();
        let size = xml.find("<p:sldSz").unwrap();
        let style = xml.find("<p:defaultTextStyle>").unwrap();
        assert!(xml.find("<p:sldMasterIdLst>").unwrap() < ids);
        assert!(ids < size && size < style);
        assert!(xml.contains(
            r#"<p:sldIdLst><p:sldId id="300" r:id="rId7"/><p:sldId id="301" r:id="rId8"/></p:sldIdLst>"#
        ));
        assert!(xml.contains(r#"<a:defRPr lang="en-US"/>"#));

        let again = Presentation::from_xml(xml.as_bytes()).unwrap();
        assert_eq!(again, pres);
    }

    #[test]
    fn test_verbose_relationship_prefix() {
        let xml = r#"<p:presentation xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:relationships="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><p:sldIdLst><p:sldId id="256" relationships:id="rId3"/></p:sldIdLst></p:presentation>"#;
        let pres = Presentation::from_xml(xml.as_bytes()).unwrap();
        assert_eq!(pres.slides()[0].r_id, "rId3");
    }

    #[test]
    fn test_empty_slide_list_is_inserted() {
        let xml = r#"<p:presentation xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldSz cx="1" cy="2"/></p:presentation>"#;
        let mut pres = Presentation::from_xml(xml.as_bytes()).unwrap();
        assert_eq!(pres.slide_count(), 0);
        pres.push_slide(256, "rId2");

        let out = pres.to_xml(&[]);
        assert!(out.contains(
            r#"</p:sldMasterIdLst><p:sldIdLst><p:sldId id="256" r:id="rId2"/></p:sldIdLst><p:sldSz"#
        ));
    }
}
