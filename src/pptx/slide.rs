//! Slide parts (`ppt/slides/slideN.xml`).
//!
//! The shape tree is decoded into [`TreeItem`]s: plain shapes (`p:sp`) are modeled,
//! everything else (pictures, groups, graphic frames, alternate content) is kept as
//! raw markup. A decoded [`Shape`] also keeps its source markup and writes it back
//! unchanged until one of its setters is called. The shape tree's own group
//! properties are written back as read.

use crate::error::Result;
use crate::opc::compat::XmlAttr;
use crate::opc::constants::namespace;
use crate::opc::part::{XmlPart, open_root};
use crate::opc::xml::{
    attr_i64, attr_u32, attr_value, capture_element, capture_span, escape_xml, push_entity,
    push_int_attr, push_str_attr,
};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// A point in EMUs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

/// A size in EMUs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Size {
    pub cx: i64,
    pub cy: i64,
}

/// A 2D transform (`a:xfrm`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transform {
    pub offset: Option<Point>,
    pub extents: Option<Size>,
    pub child_offset: Option<Point>,
    pub child_extents: Option<Size>,
    /// Rotation in 60000ths of a degree
    pub rotation: Option<i64>,
    pub flip_h: bool,
    pub flip_v: bool,
}

impl Transform {
    pub fn new(x: i64, y: i64, cx: i64, cy: i64) -> Self {
        Self {
            offset: Some(Point { x, y }),
            extents: Some(Size { cx, cy }),
            ..Self::default()
        }
    }
}

/// `p:nvGrpSpPr` of the slide's shape tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NonVisualGroupShapeProperties {
    pub id: u32,
    pub name: String,
}

/// `p:grpSpPr` of the slide's shape tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupShapeProperties {
    pub xfrm: Option<Transform>,
}

/// Placeholder reference (`p:ph`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placeholder {
    pub kind: Option<String>,
    pub idx: Option<u32>,
}

/// A text run, or a line break when `line_break` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub lang: Option<String>,
    /// Font size in hundredths of a point
    pub size: Option<u32>,
    pub bold: Option<bool>,
    pub line_break: bool,
}

impl Run {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    /// Alignment (`l`, `ctr`, `r`, `just`, ...)
    pub align: Option<String>,
    pub runs: Vec<Run>,
}

impl Paragraph {
    pub fn text(&self) -> String {
        self.runs
            .iter()
            .map(|r| if r.line_break { "\n" } else { r.text.as_str() })
            .collect()
    }
}

/// Text content of a shape (`p:txBody`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBody {
    pub paragraphs: Vec<Paragraph>,
}

impl TextBody {
    /// One paragraph per line of `text`.
    pub fn from_text(text: &str) -> Self {
        Self {
            paragraphs: text
                .split('\n')
                .map(|line| Paragraph {
                    align: None,
                    runs: if line.is_empty() {
                        Vec::new()
                    } else {
                        vec![Run::new(line)]
                    },
                })
                .collect(),
        }
    }

    /// Paragraph texts joined with newlines.
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A plain shape (`p:sp`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Shape {
    id: u32,
    name: String,
    description: Option<String>,
    text_box: bool,
    placeholder: Option<Placeholder>,
    xfrm: Option<Transform>,
    geometry: Option<String>,
    text: Option<TextBody>,
    /// Source markup; cleared by any setter
    raw: Option<String>,
}

impl Shape {
    /// A new rectangular text box.
    pub fn text_box(id: u32, name: impl Into<String>, xfrm: Transform, text: &str) -> Self {
        Self {
            id,
            name: name.into(),
            text_box: true,
            xfrm: Some(xfrm),
            geometry: Some("rect".to_string()),
            text: Some(TextBody::from_text(text)),
            ..Self::default()
        }
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[inline]
    pub fn is_text_box(&self) -> bool {
        self.text_box
    }

    pub fn placeholder(&self) -> Option<&Placeholder> {
        self.placeholder.as_ref()
    }

    pub fn transform(&self) -> Option<&Transform> {
        self.xfrm.as_ref()
    }

    /// Preset geometry name, e.g. `rect`.
    pub fn geometry(&self) -> Option<&str> {
        self.geometry.as_deref()
    }

    pub fn text_body(&self) -> Option<&TextBody> {
        self.text.as_ref()
    }

    /// Plain text of the shape, or an empty string when it has no text body.
    pub fn text(&self) -> String {
        self.text.as_ref().map(TextBody::text).unwrap_or_default()
    }

    /// Whether the shape will be re-encoded from its fields on save.
    pub fn is_modified(&self) -> bool {
        self.raw.is_none()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.raw = None;
    }

    pub fn set_transform(&mut self, xfrm: Transform) {
        self.xfrm = Some(xfrm);
        self.raw = None;
    }

    pub fn set_text(&mut self, text: &str) {
        self.text = Some(TextBody::from_text(text));
        self.raw = None;
    }

    fn parse(reader: &mut Reader<&[u8]>, src: &[u8], start: usize) -> Result<Self> {
        let mut shape = Shape::default();
        let mut depth = 0usize;

        loop {
            match reader.read_event()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"xfrm" => shape.xfrm = Some(parse_xfrm(reader, &e, false)?),
                    b"txBody" => shape.text = Some(parse_text_body(reader)?),
                    _ => {
                        shape.apply_attrs(&e)?;
                        depth += 1;
                    },
                },
                Event::Empty(e) => match e.local_name().as_ref() {
                    b"xfrm" => shape.xfrm = Some(parse_xfrm(reader, &e, true)?),
                    b"txBody" => shape.text = Some(TextBody::default()),
                    _ => shape.apply_attrs(&e)?,
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

        shape.raw = Some(capture_span(reader, src, start)?);
        Ok(shape)
    }

    fn apply_attrs(&mut self, e: &BytesStart<'_>) -> Result<()> {
        match e.local_name().as_ref() {
            b"cNvPr" => {
                self.id = attr_u32(e, b"id")?.unwrap_or(0);
                self.name = attr_value(e, b"name")?.unwrap_or_default();
                self.description = attr_value(e, b"descr")?;
            },
            b"cNvSpPr" => {
                self.text_box = attr_value(e, b"txBox")?.is_some_and(|v| is_true(&v));
            },
            b"ph" => {
                self.placeholder = Some(Placeholder {
                    kind: attr_value(e, b"type")?,
                    idx: attr_u32(e, b"idx")?,
                });
            },
            b"prstGeom" => self.geometry = attr_value(e, b"prst")?,
            _ => {},
        }
        Ok(())
    }

    fn write(&self, xml: &mut String) {
        if let Some(raw) = &self.raw {
            xml.push_str(raw);
            return;
        }

        xml.push_str("<p:sp><p:nvSpPr><p:cNvPr");
        push_int_attr(xml, "id", self.id);
        push_str_attr(xml, "name", &self.name);
        if let Some(descr) = &self.description {
            push_str_attr(xml, "descr", descr);
        }
        xml.push_str("/>");
        if self.text_box {
            xml.push_str(r#"<p:cNvSpPr txBox="1"/>"#);
        } else {
            xml.push_str("<p:cNvSpPr/>");
        }
        match &self.placeholder {
            Some(ph) => {
                xml.push_str("<p:nvPr><p:ph");
                if let Some(kind) = &ph.kind {
                    push_str_attr(xml, "type", kind);
                }
                if let Some(idx) = ph.idx {
                    push_int_attr(xml, "idx", idx);
                }
                xml.push_str("/></p:nvPr>");
            },
            None => xml.push_str("<p:nvPr/>"),
        }
        xml.push_str("</p:nvSpPr><p:spPr>");
        if let Some(xfrm) = &self.xfrm {
            write_xfrm(xml, xfrm);
        }
        if let Some(prst) = &self.geometry {
            xml.push_str("<a:prstGeom");
            push_str_attr(xml, "prst", prst);
            xml.push_str("><a:avLst/></a:prstGeom>");
        }
        if self.text_box {
            xml.push_str("<a:noFill/>");
        }
        xml.push_str("</p:spPr>");

        if let Some(body) = &self.text {
            xml.push_str(r#"<p:txBody><a:bodyPr wrap="square" rtlCol="0">"#);
            if self.text_box {
                xml.push_str("<a:spAutoFit/>");
            }
            xml.push_str("</a:bodyPr><a:lstStyle/>");
            for para in &body.paragraphs {
                write_paragraph(xml, para);
            }
            xml.push_str("</p:txBody>");
        }
        xml.push_str("</p:sp>");
    }
}

/// An entry of the slide's shape tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeItem {
    Shape(Shape),
    /// Any other element, kept verbatim
    Raw(String),
}

/// A decoded slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slide {
    /// `name` attribute of `p:cSld`
    name: Option<String>,
    nv_group: Option<NonVisualGroupShapeProperties>,
    group: Option<GroupShapeProperties>,
    /// Source markup of `p:nvGrpSpPr` and `p:grpSpPr`
    nv_group_raw: Option<String>,
    group_raw: Option<String>,
    items: Vec<TreeItem>,
    /// Children of `p:cSld` before and after the shape tree (background, tags, ...)
    c_sld_before: Vec<String>,
    c_sld_after: Vec<String>,
    /// Children of `p:sld` before and after `p:cSld`
    head: Vec<String>,
    tail: Vec<String>,
}

impl Default for Slide {
    fn default() -> Self {
        Self {
            name: None,
            nv_group: Some(NonVisualGroupShapeProperties {
                id: 1,
                name: String::new(),
            }),
            group: Some(GroupShapeProperties {
                xfrm: Some(Transform {
                    offset: Some(Point::default()),
                    extents: Some(Size::default()),
                    child_offset: Some(Point::default()),
                    child_extents: Some(Size::default()),
                    ..Transform::default()
                }),
            }),
            nv_group_raw: None,
            group_raw: None,
            items: Vec::new(),
            c_sld_before: Vec::new(),
            c_sld_after: Vec::new(),
            head: Vec::new(),
            tail: Vec::new(),
        }
    }
}

impl Slide {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn items(&self) -> &[TreeItem] {
        &self.items
    }

    /// Modeled shapes of the shape tree, in document order.
    pub fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.items.iter().filter_map(|item| match item {
            TreeItem::Shape(shape) => Some(shape),
            TreeItem::Raw(_) => None,
        })
    }

    pub fn shape_mut(&mut self, id: u32) -> Option<&mut Shape> {
        self.items.iter_mut().find_map(|item| match item {
            TreeItem::Shape(shape) if shape.id == id => Some(shape),
            _ => None,
        })
    }

    pub fn non_visual_group_shape_properties(&self) -> Option<&NonVisualGroupShapeProperties> {
        self.nv_group.as_ref()
    }

    pub fn group_shape_properties(&self) -> Option<&GroupShapeProperties> {
        self.group.as_ref()
    }

    /// One more than the largest drawing id used anywhere in the shape tree.
    pub fn next_shape_id(&self) -> u32 {
        let mut max = self.nv_group.as_ref().map_or(0, |nv| nv.id);
        for item in &self.items {
            let id = match item {
                TreeItem::Shape(shape) => shape.id,
                TreeItem::Raw(raw) => max_drawing_id(raw),
            };
            max = max.max(id);
        }
        max.saturating_add(1)
    }

    /// Append a text box and return its shape id.
    pub fn add_text_box(&mut self, xfrm: Transform, text: &str) -> u32 {
        let id = self.next_shape_id();
        let name = format!("TextBox {}", id.saturating_sub(1));
        self.items
            .push(TreeItem::Shape(Shape::text_box(id, name, xfrm, text)));
        id
    }

    /// Remove the modeled shape with `id`.
    pub fn remove_shape(&mut self, id: u32) -> Option<Shape> {
        let pos = self
            .items
            .iter()
            .position(|item| matches!(item, TreeItem::Shape(s) if s.id == id))?;
        match self.items.remove(pos) {
            TreeItem::Shape(shape) => Some(shape),
            TreeItem::Raw(_) => None,
        }
    }

    fn parse_common_slide_data(&mut self, reader: &mut Reader<&[u8]>, src: &[u8]) -> Result<()> {
        let mut seen_tree = false;
        loop {
            let pos = reader.buffer_position() as usize;
            match reader.read_event()? {
                Event::Start(e) if e.local_name().as_ref() == b"spTree" => {
                    self.nv_group = None;
                    self.group = None;
                    self.parse_shape_tree(reader, src)?;
                    seen_tree = true;
                },
                Event::Empty(e) if e.local_name().as_ref() == b"spTree" => {
                    self.nv_group = None;
                    self.group = None;
                    seen_tree = true;
                },
                Event::Start(e) => {
                    let raw = capture_element(reader, src, pos, &e)?;
                    self.push_c_sld_child(raw, seen_tree);
                },
                Event::Empty(_) => {
                    let raw = capture_span(reader, src, pos)?;
                    self.push_c_sld_child(raw, seen_tree);
                },
                Event::End(_) | Event::Eof => break,
                _ => {},
            }
        }
        Ok(())
    }

    fn push_c_sld_child(&mut self, raw: String, after_tree: bool) {
        if after_tree {
            self.c_sld_after.push(raw);
        } else {
            self.c_sld_before.push(raw);
        }
    }

    fn parse_shape_tree(&mut self, reader: &mut Reader<&[u8]>, src: &[u8]) -> Result<()> {
        loop {
            let pos = reader.buffer_position() as usize;
            match reader.read_event()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"nvGrpSpPr" => {
                        self.nv_group = Some(parse_nv_group(reader)?);
                        self.nv_group_raw = Some(capture_span(reader, src, pos)?);
                    },
                    b"grpSpPr" => {
                        self.group = Some(parse_group_props(reader)?);
                        self.group_raw = Some(capture_span(reader, src, pos)?);
                    },
                    b"sp" => self
                        .items
                        .push(TreeItem::Shape(Shape::parse(reader, src, pos)?)),
                    _ => {
                        let raw = capture_element(reader, src, pos, &e)?;
                        self.items.push(TreeItem::Raw(raw));
                    },
                },
                Event::Empty(e) => match e.local_name().as_ref() {
                    b"nvGrpSpPr" => {
                        self.nv_group = Some(NonVisualGroupShapeProperties::default());
                        self.nv_group_raw = Some(capture_span(reader, src, pos)?);
                    },
                    b"grpSpPr" => {
                        self.group = Some(GroupShapeProperties::default());
                        self.group_raw = Some(capture_span(reader, src, pos)?);
                    },
                    _ => {
                        let raw = capture_span(reader, src, pos)?;
                        self.items.push(TreeItem::Raw(raw));
                    },
                },
                Event::End(_) | Event::Eof => break,
                _ => {},
            }
        }
        Ok(())
    }
}

impl XmlPart for Slide {
    fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        let mut slide = Slide {
            nv_group: None,
            group: None,
            ..Slide::default()
        };
        let mut in_root = false;
        let mut seen_c_sld = false;

        loop {
            let pos = reader.buffer_position() as usize;
            match reader.read_event()? {
                Event::Start(_) if !in_root => in_root = true,
                Event::Start(e) if e.local_name().as_ref() == b"cSld" => {
                    slide.name = attr_value(&e, b"name")?;
                    slide.parse_common_slide_data(&mut reader, xml)?;
                    seen_c_sld = true;
                },
                Event::Start(e) => {
                    let raw = capture_element(&mut reader, xml, pos, &e)?;
                    if seen_c_sld {
                        slide.tail.push(raw);
                    } else {
                        slide.head.push(raw);
                    }
                },
                Event::Empty(e) if in_root => {
                    if e.local_name().as_ref() == b"cSld" {
                        slide.name = attr_value(&e, b"name")?;
                        seen_c_sld = true;
                        continue;
                    }
                    let raw = capture_span(&reader, xml, pos)?;
                    if seen_c_sld {
                        slide.tail.push(raw);
                    } else {
                        slide.head.push(raw);
                    }
                },
                Event::End(_) | Event::Eof => break,
                _ => {},
            }
        }

        Ok(slide)
    }

    fn to_xml(&self, root_attrs: &[XmlAttr]) -> String {
        let mut xml = String::with_capacity(1024);
        open_root(&mut xml, "p:sld", root_attrs);
        for raw in &self.head {
            xml.push_str(raw);
        }

        xml.push_str("<p:cSld");
        if let Some(name) = &self.name {
            push_str_attr(&mut xml, "name", name);
        }
        xml.push('>');
        for raw in &self.c_sld_before {
            xml.push_str(raw);
        }

        xml.push_str("<p:spTree>");
        if let Some(raw) = &self.nv_group_raw {
            xml.push_str(raw);
        } else if let Some(nv) = &self.nv_group {
            xml.push_str("<p:nvGrpSpPr><p:cNvPr");
            push_int_attr(&mut xml, "id", nv.id);
            push_str_attr(&mut xml, "name", &nv.name);
            xml.push_str("/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>");
        }
        if let Some(raw) = &self.group_raw {
            xml.push_str(raw);
        } else if let Some(group) = &self.group {
            xml.push_str("<p:grpSpPr>");
            if let Some(xfrm) = &group.xfrm {
                write_xfrm(&mut xml, xfrm);
            }
            xml.push_str("</p:grpSpPr>");
        }
        for item in &self.items {
            match item {
                TreeItem::Shape(shape) => shape.write(&mut xml),
                TreeItem::Raw(raw) => xml.push_str(raw),
            }
        }
        xml.push_str("</p:spTree>");

        for raw in &self.c_sld_after {
            xml.push_str(raw);
        }
        xml.push_str("</p:cSld>");
        for raw in &self.tail {
            xml.push_str(raw);
        }
        xml.push_str("</p:sld>");
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

fn is_true(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// Largest `id` on any `cNvPr` inside a raw fragment.
fn max_drawing_id(raw: &str) -> u32 {
    let mut reader = Reader::from_reader(raw.as_bytes());
    let mut max = 0;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"cNvPr" => {
                if let Ok(Some(id)) = attr_u32(&e, b"id") {
                    max = max.max(id);
                }
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {},
        }
    }
    max
}

fn parse_xfrm(reader: &mut Reader<&[u8]>, e: &BytesStart<'_>, empty: bool) -> Result<Transform> {
    let mut xfrm = Transform {
        rotation: attr_i64(e, b"rot")?,
        flip_h: attr_value(e, b"flipH")?.is_some_and(|v| is_true(&v)),
        flip_v: attr_value(e, b"flipV")?.is_some_and(|v| is_true(&v)),
        ..Transform::default()
    };
    if empty {
        return Ok(xfrm);
    }

    let mut depth = 0usize;
    loop {
        match reader.read_event()? {
            Event::Start(child) => {
                apply_xfrm_child(&mut xfrm, &child)?;
                depth += 1;
            },
            Event::Empty(child) => apply_xfrm_child(&mut xfrm, &child)?,
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
    Ok(xfrm)
}

fn apply_xfrm_child(xfrm: &mut Transform, e: &BytesStart<'_>) -> Result<()> {
    let point = |e: &BytesStart<'_>| -> Result<Point> {
        Ok(Point {
            x: attr_i64(e, b"x")?.unwrap_or(0),
            y: attr_i64(e, b"y")?.unwrap_or(0),
        })
    };
    let size = |e: &BytesStart<'_>| -> Result<Size> {
        Ok(Size {
            cx: attr_i64(e, b"cx")?.unwrap_or(0),
            cy: attr_i64(e, b"cy")?.unwrap_or(0),
        })
    };
    match e.local_name().as_ref() {
        b"off" => xfrm.offset = Some(point(e)?),
        b"ext" => xfrm.extents = Some(size(e)?),
        b"chOff" => xfrm.child_offset = Some(point(e)?),
        b"chExt" => xfrm.child_extents = Some(size(e)?),
        _ => {},
    }
    Ok(())
}

fn parse_nv_group(reader: &mut Reader<&[u8]>) -> Result<NonVisualGroupShapeProperties> {
    let mut nv = NonVisualGroupShapeProperties::default();
    let mut depth = 0usize;
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if e.local_name().as_ref() == b"cNvPr" {
                    nv.id = attr_u32(&e, b"id")?.unwrap_or(0);
                    nv.name = attr_value(&e, b"name")?.unwrap_or_default();
                }
                depth += 1;
            },
            Event::Empty(e) if e.local_name().as_ref() == b"cNvPr" => {
                nv.id = attr_u32(&e, b"id")?.unwrap_or(0);
                nv.name = attr_value(&e, b"name")?.unwrap_or_default();
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
    Ok(nv)
}

fn parse_group_props(reader: &mut Reader<&[u8]>) -> Result<GroupShapeProperties> {
    let mut group = GroupShapeProperties::default();
    let mut depth = 0usize;
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"xfrm" => {
                group.xfrm = Some(parse_xfrm(reader, &e, false)?);
            },
            Event::Empty(e) if e.local_name().as_ref() == b"xfrm" => {
                group.xfrm = Some(parse_xfrm(reader, &e, true)?);
            },
            Event::Start(_) => depth += 1,
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
    Ok(group)
}

fn parse_text_body(reader: &mut Reader<&[u8]>) -> Result<TextBody> {
    let mut body = TextBody::default();
    let mut depth = 0usize;
    let mut in_text = false;

    fn paragraph(body: &mut TextBody) -> &mut Paragraph {
        if body.paragraphs.is_empty() {
            body.paragraphs.push(Paragraph::default());
        }
        let last = body.paragraphs.len() - 1;
        &mut body.paragraphs[last]
    }

    fn run(body: &mut TextBody) -> &mut Run {
        let para = paragraph(body);
        if para.runs.is_empty() {
            para.runs.push(Run::default());
        }
        let last = para.runs.len() - 1;
        &mut para.runs[last]
    }

    fn apply_run_props(run: &mut Run, e: &BytesStart<'_>) -> Result<()> {
        run.lang = attr_value(e, b"lang")?;
        run.size = attr_u32(e, b"sz")?;
        run.bold = attr_value(e, b"b")?.map(|v| is_true(&v));
        Ok(())
    }

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                match e.local_name().as_ref() {
                    b"p" => body.paragraphs.push(Paragraph::default()),
                    b"pPr" => paragraph(&mut body).align = attr_value(&e, b"algn")?,
                    b"r" | b"fld" => paragraph(&mut body).runs.push(Run::default()),
                    b"rPr" => apply_run_props(run(&mut body), &e)?,
                    b"t" => in_text = true,
                    _ => {},
                }
                depth += 1;
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"p" => body.paragraphs.push(Paragraph::default()),
                b"pPr" => paragraph(&mut body).align = attr_value(&e, b"algn")?,
                b"rPr" => apply_run_props(run(&mut body), &e)?,
                b"br" => paragraph(&mut body).runs.push(Run {
                    line_break: true,
                    ..Run::default()
                }),
                _ => {},
            },
            Event::Text(t) if in_text => {
                run(&mut body).text.push_str(std::str::from_utf8(&t)?);
            },
            Event::GeneralRef(r) if in_text => push_entity(&mut run(&mut body).text, &r)?,
            Event::End(e) => {
                if depth == 0 {
                    break;
                }
                if e.local_name().as_ref() == b"t" {
                    in_text = false;
                }
                depth -= 1;
            },
            Event::Eof => break,
            _ => {},
        }
    }
    Ok(body)
}

fn write_xfrm(xml: &mut String, xfrm: &Transform) {
    xml.push_str("<a:xfrm");
    if let Some(rot) = xfrm.rotation {
        push_int_attr(xml, "rot", rot);
    }
    if xfrm.flip_h {
        xml.push_str(r#" flipH="1""#);
    }
    if xfrm.flip_v {
        xml.push_str(r#" flipV="1""#);
    }
    xml.push('>');
    if let Some(off) = xfrm.offset {
        xml.push_str("<a:off");
        push_int_attr(xml, "x", off.x);
        push_int_attr(xml, "y", off.y);
        xml.push_str("/>");
    }
    if let Some(ext) = xfrm.extents {
        xml.push_str("<a:ext");
        push_int_attr(xml, "cx", ext.cx);
        push_int_attr(xml, "cy", ext.cy);
        xml.push_str("/>");
    }
    if let Some(off) = xfrm.child_offset {
        xml.push_str("<a:chOff");
        push_int_attr(xml, "x", off.x);
        push_int_attr(xml, "y", off.y);
        xml.push_str("/>");
    }
    if let Some(ext) = xfrm.child_extents {
        xml.push_str("<a:chExt");
        push_int_attr(xml, "cx", ext.cx);
        push_int_attr(xml, "cy", ext.cy);
        xml.push_str("/>");
    }
    xml.push_str("</a:xfrm>");
}

fn write_paragraph(xml: &mut String, para: &Paragraph) {
    xml.push_str("<a:p>");
    if let Some(align) = &para.align {
        xml.push_str("<a:pPr");
        push_str_attr(xml, "algn", align);
        xml.push_str("/>");
    }
    for run in &para.runs {
        if run.line_break {
            xml.push_str("<a:br/>");
            continue;
        }
        xml.push_str("<a:r><a:rPr");
        push_str_attr(xml, "lang", run.lang.as_deref().unwrap_or("en-US"));
        if let Some(size) = run.size {
            push_int_attr(xml, "sz", size);
        }
        if let Some(bold) = run.bold {
            xml.push_str(if bold { r#" b="1""# } else { r#" b="0""# });
        }
        xml.push_str(r#" dirty="0"/><a:t>"#);
        xml.push_str(&escape_xml(&run.text));
        xml.push_str("</a:t></a:r>");
    }
    xml.push_str("</a:p>");
}
