/// Relationship parts (`*.rels`).
///
/// A [`Relationships`] value is the decoded form of one relationships part; the part
/// that owns it is implied by the part's member name (see
/// [`crate::opc::packuri::PackURI::rels_source`]).
use crate::error::Result;
use crate::opc::compat::XmlAttr;
use crate::opc::constants::{namespace, target_mode};
use crate::opc::part::{XmlPart, open_root};
use crate::opc::xml::{attr_value, escape_xml};
use quick_xml::Reader;
use quick_xml::events::Event;

/// One `Relationship` element of a relationships part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Id, unique within the owning part
    r_id: String,

    /// Relationship type URI
    reltype: String,

    /// Target reference, either relative to the source part or an external URL
    target_ref: String,

    is_external: bool,
}

impl Relationship {
    pub fn new(r_id: String, reltype: String, target_ref: String, is_external: bool) -> Self {
        Self {
            r_id,
            reltype,
            target_ref,
            is_external,
        }
    }

    #[inline]
    pub fn r_id(&self) -> &str {
        &self.r_id
    }

    #[inline]
    pub fn reltype(&self) -> &str {
        &self.reltype
    }

    #[inline]
    pub fn target_ref(&self) -> &str {
        &self.target_ref
    }

    #[inline]
    pub fn is_external(&self) -> bool {
        self.is_external
    }
}

/// Ordered collection of relationships from a single source.
///
/// Ids are allocated from a high-water mark that never decreases, so an id freed
/// by [`Relationships::remove`] is not handed out again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relationships {
    rels: Vec<Relationship>,

    /// Highest `rIdN` number ever present in this collection
    high_water: u32,
}

impl Relationships {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a relationship with a caller-chosen id.
    pub fn add_relationship(
        &mut self,
        r_id: String,
        reltype: String,
        target_ref: String,
        is_external: bool,
    ) {
        if let Some(n) = Self::r_id_number(&r_id) {
            self.high_water = self.high_water.max(n);
        }
        self.rels
            .push(Relationship::new(r_id, reltype, target_ref, is_external));
    }

    /// Add a relationship under the next free id and return that id.
    pub fn add(&mut self, reltype: &str, target_ref: &str, is_external: bool) -> String {
        let r_id = self.next_r_id();
        self.add_relationship(
            r_id.clone(),
            reltype.to_string(),
            target_ref.to_string(),
            is_external,
        );
        r_id
    }

    /// The id the next call to [`Relationships::add`] will use.
    pub fn next_r_id(&self) -> String {
        let count = u32::try_from(self.rels.len()).unwrap_or(u32::MAX);
        let mut n = count.max(self.high_water).saturating_add(1);
        // ids written by other producers need not follow the rIdN pattern
        while self.get(&format!("rId{}", n)).is_some() {
            n = n.saturating_add(1);
        }
        format!("rId{}", n)
    }

    #[inline]
    pub fn get(&self, r_id: &str) -> Option<&Relationship> {
        self.rels.iter().find(|rel| rel.r_id == r_id)
    }

    /// The first relationship of the given type.
    pub fn find_by_type(&self, reltype: &str) -> Option<&Relationship> {
        self.rels.iter().find(|rel| rel.reltype == reltype)
    }

    /// Remove and return relationship `r_id`.
    pub fn remove(&mut self, r_id: &str) -> Option<Relationship> {
        let pos = self.rels.iter().position(|rel| rel.r_id == r_id)?;
        Some(self.rels.remove(pos))
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.rels.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }

    fn r_id_number(r_id: &str) -> Option<u32> {
        let digits = r_id.strip_prefix("rId")?;
        atoi_simd::parse::<u32, false, false>(digits.as_bytes()).ok()
    }
}

impl XmlPart for Relationships {
    fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut rels = Self::new();
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        loop {
            match reader.read_event()? {
                Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                    let r_id = attr_value(&e, b"Id")?;
                    let reltype = attr_value(&e, b"Type")?;
                    let target = attr_value(&e, b"Target")?;
                    let external = attr_value(&e, b"TargetMode")?
                        .is_some_and(|mode| mode == target_mode::EXTERNAL);

                    if let (Some(r_id), Some(reltype), Some(target)) = (r_id, reltype, target) {
                        rels.add_relationship(r_id, reltype, target, external);
                    }
                },
                Event::Eof => break,
                _ => {},
            }
        }

        Ok(rels)
    }

    fn to_xml(&self, root_attrs: &[XmlAttr]) -> String {
        let mut xml = String::with_capacity(128 + self.rels.len() * 160);
        open_root(&mut xml, "Relationships", root_attrs);

        for rel in &self.rels {
            xml.push_str(r#"<Relationship Id=""#);
            xml.push_str(&escape_xml(&rel.r_id));
            xml.push_str(r#"" Type=""#);
            xml.push_str(&escape_xml(&rel.reltype));
            xml.push_str(r#"" Target=""#);
            xml.push_str(&escape_xml(&rel.target_ref));
            xml.push('"');
            if rel.is_external {
                xml.push_str(r#" TargetMode="External""#);
            }
            xml.push_str("/>");
        }

        xml.push_str("</Relationships>");
        xml
    }

    fn default_root_attrs() -> Vec<XmlAttr> {
        vec![XmlAttr::new("xmlns", namespace::OPC_RELATIONSHIPS)]
    }
}
