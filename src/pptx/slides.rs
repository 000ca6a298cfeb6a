//! The slide index: the ordered `p:sldIdLst` of the presentation joined with the
//! presentation relationships, and the operations that keep the two consistent
//! with the content type declarations and the stored slide parts.

use crate::error::{Error, Result};
use crate::opc::compat::root_attributes;
use crate::opc::constants::{content_type as ct, relationship_type as rt};
use crate::opc::packuri::{PackURI, rels_member_for, resolve_rels_target};
use crate::opc::part::{PartHandle, XmlPart};
use crate::opc::pkgreader::starts_with_ignore_case;
use crate::opc::rel::Relationships;
use crate::pptx::graph::part_name;
use crate::pptx::package::Package;
use crate::pptx::slide::{GroupShapeProperties, NonVisualGroupShapeProperties, Shape, Slide};
use crate::pptx::template;
use std::collections::HashSet;

/// Slide ids below this value are reserved by the format.
pub const FIRST_SLIDE_ID: u32 = 256;

impl Package {
    /// Ids of all slides, in presentation order.
    pub fn slide_ids(&self) -> Result<Vec<u32>> {
        let pres = self.presentation()?;
        let ids = pres.read().slides().iter().map(|s| s.id).collect();
        Ok(ids)
    }

    /// Number of slide parts in the package.
    #[inline]
    pub fn slide_count(&self) -> usize {
        self.slide_count
    }

    /// Member name of the slide part for `id`.
    pub fn slide_path(&self, id: u32) -> Result<Option<String>> {
        let pres = self.presentation()?;
        let Some(r_id) = pres.read().slide(id).map(|s| s.r_id.clone()) else {
            return Ok(None);
        };
        let main_rels = rels_member_for(&self.main_part);
        let rels = self.relationships(&main_rels)?;
        let rels = rels.read();
        match rels.get(&r_id) {
            Some(rel) if !rel.is_external() => {
                Ok(Some(resolve_rels_target(&main_rels, rel.target_ref())?))
            },
            _ => Ok(None),
        }
    }

    /// The decoded slide `id`.
    pub fn slide(&self, id: u32) -> Result<PartHandle<Slide>> {
        let path = self.slide_path(id)?.ok_or(Error::SlideNotExist { id })?;
        self.slides.decode(&path, &self.store, &self.namespaces)
    }

    /// Shapes of slide `id`, in document order.
    pub fn shapes(&self, id: u32) -> Result<Vec<Shape>> {
        let slide = self.slide(id)?;
        let shapes = slide.read().shapes().cloned().collect();
        Ok(shapes)
    }

    /// Group shape properties of the shape tree of slide `id`.
    pub fn group_shape_properties(&self, id: u32) -> Result<Option<GroupShapeProperties>> {
        let slide = self.slide(id)?;
        let props = slide.read().group_shape_properties().cloned();
        Ok(props)
    }

    /// Non-visual group shape properties of the shape tree of slide `id`.
    pub fn non_visual_group_shape_properties(
        &self,
        id: u32,
    ) -> Result<Option<NonVisualGroupShapeProperties>> {
        let slide = self.slide(id)?;
        let props = slide.read().non_visual_group_shape_properties().cloned();
        Ok(props)
    }

    /// Set the name of slide `id`.
    pub fn set_slide_name(&mut self, id: u32, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::SlideNameBlank);
        }
        self.slide(id)?.write().set_name(name);
        Ok(())
    }

    /// The first slide, in presentation order, named `name`.
    pub fn find_slide(&self, name: &str) -> Result<Option<u32>> {
        if name.is_empty() {
            return Err(Error::SlideNameBlank);
        }
        for id in self.slide_ids()? {
            if self.slide(id)?.read().name() == Some(name) {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    /// Append a blank slide and return its id.
    ///
    /// The slide part, its relationships part, both content type overrides, the
    /// presentation relationship and the `p:sldIdLst` entry are created together;
    /// nothing is changed when an error is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use longan::Package;
    ///
    /// let mut pkg = Package::new()?;
    /// let id = pkg.add_slide()?;
    /// assert_eq!(id, 257);
    /// assert_eq!(pkg.slide_path(id)?.as_deref(), Some("ppt/slides/slide2.xml"));
    /// # Ok::<(), longan::Error>(())
    /// ```
    pub fn add_slide(&mut self) -> Result<u32> {
        let pres = self.presentation()?;
        let main_rels = rels_member_for(&self.main_part);
        let pres_rels = self.relationships(&main_rels)?;
        let types = self.content_types()?;

        let slide_xml = template::blank_slide_xml().as_bytes();
        let slide = Slide::decode(slide_xml)?;
        let slide_attrs = root_attributes(slide_xml)?;
        let template_rels = Relationships::decode(template::blank_slide_rels_xml().as_bytes())?;

        let id = {
            let max_existing = pres.read().max_slide_id().unwrap_or(0);
            FIRST_SLIDE_ID
                .max(max_existing.saturating_add(1))
                .max(self.last_slide_id.saturating_add(1))
        };

        let slide_path = self.free_slide_path(&main_rels, &pres_rels.read())?;
        let slide_uri = PackURI::from_member(&slide_path);
        let slide_rels_path = rels_member_for(&slide_path);
        let target = slide_uri.relative_ref(PackURI::from_member(&self.main_part).base_uri());

        let layout = match self.first_slide_layout()? {
            Some(layout) => PackURI::from_member(&layout).relative_ref(slide_uri.base_uri()),
            None => template::DEFAULT_LAYOUT_TARGET.to_string(),
        };
        let mut slide_rels = Relationships::new();
        for rel in template_rels.iter() {
            let target = if rel.reltype() == rt::SLIDE_LAYOUT {
                layout.clone()
            } else {
                rel.target_ref().to_string()
            };
            slide_rels.add_relationship(
                rel.r_id().to_string(),
                rel.reltype().to_string(),
                target,
                rel.is_external(),
            );
        }

        {
            let mut types = types.write();
            types.add_override(&part_name(&slide_path), ct::PML_SLIDE);
            types.add_override(&part_name(&slide_rels_path), ct::OPC_RELATIONSHIPS);
        }
        let r_id = pres_rels.write().add(rt::SLIDE, &target, false);
        self.slides.insert(&slide_path, slide);
        self.rels.insert(&slide_rels_path, slide_rels);
        self.namespaces.set(&slide_path, slide_attrs);
        pres.write().push_slide(id, r_id);

        self.slide_count += 1;
        self.last_slide_id = id;
        tracing::debug!(id, part = %slide_path, "slide added");
        Ok(id)
    }

    /// Remove slide `id`.
    ///
    /// Does nothing when `id` does not exist or is the only slide left.
    pub fn remove_slide(&mut self, id: u32) -> Result<()> {
        let pres = self.presentation()?;
        let (record, count) = {
            let pres = pres.read();
            (pres.slide(id).cloned(), pres.slide_count())
        };
        let Some(record) = record else {
            return Ok(());
        };
        if count <= 1 {
            return Ok(());
        }

        let main_rels = rels_member_for(&self.main_part);
        let pres_rels = self.relationships(&main_rels)?;
        let types = self.content_types()?;
        let slide_path = match pres_rels.read().get(&record.r_id) {
            Some(rel) if !rel.is_external() => {
                Some(resolve_rels_target(&main_rels, rel.target_ref())?)
            },
            _ => None,
        };

        pres.write().remove_slide(id);
        pres_rels.write().remove(&record.r_id);
        self.slide_count = self.slide_count.saturating_sub(1);

        let Some(slide_path) = slide_path else {
            return Ok(());
        };
        let slide_rels_path = rels_member_for(&slide_path);
        {
            let mut types = types.write();
            types.remove_override(&part_name(&slide_path));
            types.remove_override(&part_name(&slide_rels_path));
        }
        for path in [&slide_path, &slide_rels_path] {
            self.slides.invalidate(path);
            self.rels.invalidate(path);
            self.namespaces.invalidate(path);
        }
        tracing::debug!(id, part = %slide_path, "slide removed");

        self.store.remove(&slide_path)?;
        self.store.remove(&slide_rels_path)?;
        Ok(())
    }

    /// Smallest `slide{n}.xml` with `n` past the current count that no part, cache
    /// entry or presentation relationship uses yet.
    fn free_slide_path(&self, main_rels: &str, pres_rels: &Relationships) -> Result<String> {
        let mut targeted = HashSet::new();
        for rel in pres_rels.iter().filter(|rel| !rel.is_external()) {
            targeted.insert(resolve_rels_target(main_rels, rel.target_ref())?);
        }

        let prefix = slide_prefix(&self.main_part);
        let mut n = self.slide_count.saturating_add(1);
        loop {
            let path = format!("{}{}.xml", prefix, n);
            if !targeted.contains(&path) && !self.contains_part(&path) {
                return Ok(path);
            }
            n += 1;
        }
    }

    /// Number of stored parts named like slides of the main part.
    pub(crate) fn count_slide_parts(&self) -> usize {
        let prefix = slide_prefix(&self.main_part);
        self.store
            .resident_paths()
            .into_iter()
            .chain(self.store.overflow_paths())
            .filter(|path| starts_with_ignore_case(path, &prefix))
            .count()
    }

    /// Layout targeted by the first slide that has one.
    fn first_slide_layout(&self) -> Result<Option<String>> {
        for id in self.slide_ids()? {
            let Some(path) = self.slide_path(id)? else {
                continue;
            };
            if let Some(layout) = self.resolve_from(&rels_member_for(&path), rt::SLIDE_LAYOUT)? {
                return Ok(Some(layout));
            }
        }
        Ok(None)
    }
}

/// `slides/slide` under the directory of the main part.
fn slide_prefix(main_part: &str) -> String {
    let base = PackURI::from_member(main_part);
    let dir = base.base_uri().trim_start_matches('/');
    if dir.is_empty() {
        "slides/slide".to_string()
    } else {
        format!("{}/slides/slide", dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pptx::slide::Transform;

    #[test]
    fn test_add_slide_updates_all_records() {
        let mut pkg = Package::new().unwrap();
        let id = pkg.add_slide().unwrap();
        assert_eq!(id, 257);
        assert_eq!(pkg.slide_ids().unwrap(), vec![256, 257]);
        assert_eq!(pkg.slide_count(), 2);

        let path = pkg.slide_path(id).unwrap().unwrap();
        assert_eq!(path, "ppt/slides/slide2.xml");

        let types = pkg.content_types().unwrap();
        assert_eq!(types.read().override_for("/ppt/slides/slide2.xml"), Some(ct::PML_SLIDE));
        assert_eq!(
            types.read().override_for("/ppt/slides/_rels/slide2.xml.rels"),
            Some(ct::OPC_RELATIONSHIPS)
        );

        let rels = pkg.relationships("ppt/slides/_rels/slide2.xml.rels").unwrap();
        let rels = rels.read();
        let layout = rels.find_by_type(rt::SLIDE_LAYOUT).unwrap();
        assert_eq!(layout.target_ref(), "../slideLayouts/slideLayout1.xml");
    }

    #[test]
    fn test_remove_slide() {
        let mut pkg = Package::new().unwrap();
        let second = pkg.add_slide().unwrap();
        pkg.remove_slide(256).unwrap();

        assert_eq!(pkg.slide_ids().unwrap(), vec![second]);
        assert_eq!(pkg.slide_count(), 1);
        assert!(!pkg.contains_part("ppt/slides/slide1.xml"));
        assert!(!pkg.contains_part("ppt/slides/_rels/slide1.xml.rels"));
        let types = pkg.content_types().unwrap();
        assert_eq!(types.read().override_count("/ppt/slides/slide1.xml"), 0);
    }

    #[test]
    fn test_remove_refuses_last_and_unknown() {
        let mut pkg = Package::new().unwrap();
        pkg.remove_slide(256).unwrap();
        assert_eq!(pkg.slide_ids().unwrap(), vec![256]);
        pkg.remove_slide(999).unwrap();
        assert_eq!(pkg.slide_count(), 1);
    }

    #[test]
    fn test_ids_and_ordinals_are_not_reused() {
        let mut pkg = Package::new().unwrap();
        let a = pkg.add_slide().unwrap();
        let b = pkg.add_slide().unwrap();
        pkg.remove_slide(a).unwrap();
        pkg.remove_slide(b).unwrap();

        let c = pkg.add_slide().unwrap();
        assert!(c > b);
        // slide2.xml and slide3.xml were removed, so the count picks slide2.xml again
        assert_eq!(pkg.slide_path(c).unwrap().as_deref(), Some("ppt/slides/slide2.xml"));

        let d = pkg.add_slide().unwrap();
        assert_eq!(pkg.slide_path(d).unwrap().as_deref(), Some("ppt/slides/slide3.xml"));
    }

    #[test]
    fn test_ordinal_skips_occupied_parts() {
        let mut pkg = Package::new().unwrap();
        let two = pkg.add_slide().unwrap();
        pkg.add_slide().unwrap();
        // slide1 gone: count is 2 but slide3.xml is still in use
        pkg.remove_slide(256).unwrap();
        let next = pkg.add_slide().unwrap();
        assert_eq!(pkg.slide_path(next).unwrap().as_deref(), Some("ppt/slides/slide4.xml"));
        assert_eq!(pkg.slide_path(two).unwrap().as_deref(), Some("ppt/slides/slide2.xml"));
    }

    #[test]
    fn test_slide_accessors() {
        let mut pkg = Package::new().unwrap();
        let id = pkg.slide_ids().unwrap()[0];
        let shape_id = pkg
            .slide(id)
            .unwrap()
            .write()
            .add_text_box(Transform::new(0, 0, 100, 100), "hello");
        assert_eq!(shape_id, 2);

        let shapes = pkg.shapes(id).unwrap();
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].text(), "hello");
        assert_eq!(
            pkg.non_visual_group_shape_properties(id).unwrap().unwrap().id,
            1
        );
        assert!(pkg.group_shape_properties(id).unwrap().is_some());

        pkg.set_slide_name(id, "Agenda").unwrap();
        assert_eq!(pkg.find_slide("Agenda").unwrap(), Some(id));
        assert_eq!(pkg.find_slide("Missing").unwrap(), None);
        assert!(matches!(pkg.find_slide(""), Err(Error::SlideNameBlank)));
        assert!(matches!(pkg.set_slide_name(id, ""), Err(Error::SlideNameBlank)));
        assert!(matches!(pkg.shapes(4242), Err(Error::SlideNotExist { id: 4242 })));
    }
}
