//! Relationship graph and content type declarations of a package.
//!
//! Relationships parts and `[Content_Types].xml` are decoded through the part cache
//! like every other part, so edits made here are written on save.

use crate::error::Result;
use crate::opc::compat::{XmlAttr, root_attributes, strict_to_transitional};
use crate::opc::constants::member;
use crate::opc::content_types::ContentTypes;
use crate::opc::packuri::resolve_rels_target;
use crate::opc::part::PartHandle;
use crate::opc::rel::Relationships;
use crate::pptx::package::Package;

impl Package {
    /// The decoded `[Content_Types].xml`.
    pub fn content_types(&self) -> Result<PartHandle<ContentTypes>> {
        self.types
            .decode(member::CONTENT_TYPES, &self.store, &self.namespaces)
    }

    /// The decoded relationships part `rels_path`; empty when the part does not exist.
    pub fn relationships(&self, rels_path: &str) -> Result<PartHandle<Relationships>> {
        self.rels.decode(rels_path, &self.store, &self.namespaces)
    }

    /// Member name targeted by the first package-level relationship of `reltype`.
    ///
    /// # Examples
    ///
    /// ```
    /// use longan::Package;
    /// use longan::opc::constants::relationship_type;
    ///
    /// let pkg = Package::new()?;
    /// let main = pkg.resolve_part(relationship_type::OFFICE_DOCUMENT)?;
    /// assert_eq!(main.as_deref(), Some("ppt/presentation.xml"));
    /// # Ok::<(), longan::Error>(())
    /// ```
    pub fn resolve_part(&self, reltype: &str) -> Result<Option<String>> {
        self.resolve_from(member::ROOT_RELS, reltype)
    }

    /// Member name targeted by the first internal relationship of `reltype` in
    /// `rels_path`.
    pub(crate) fn resolve_from(&self, rels_path: &str, reltype: &str) -> Result<Option<String>> {
        let rels = self.relationships(rels_path)?;
        let rels = rels.read();
        match rels.find_by_type(reltype) {
            Some(rel) if !rel.is_external() => {
                Ok(Some(resolve_rels_target(rels_path, rel.target_ref())?))
            },
            _ => Ok(None),
        }
    }

    /// Add a relationship to `rels_path` and return its id.
    ///
    /// Ids are `rId{N}` with N past both the current count and every id the part has
    /// held before, so removed ids are never reissued.
    pub fn add_relationship(
        &mut self,
        rels_path: &str,
        reltype: &str,
        target: &str,
        external: bool,
    ) -> Result<String> {
        let rels = self.relationships(rels_path)?;
        let r_id = rels.write().add(reltype, target, external);
        Ok(r_id)
    }

    /// Remove relationship `r_id` from `rels_path`.
    ///
    /// Returns the target of the removed relationship: a member name for internal
    /// targets, the target as written for external ones.
    pub fn remove_relationship(&mut self, rels_path: &str, r_id: &str) -> Result<Option<String>> {
        let rels = self.relationships(rels_path)?;
        let Some(removed) = rels.write().remove(r_id) else {
            return Ok(None);
        };
        if removed.is_external() {
            return Ok(Some(removed.target_ref().to_string()));
        }
        Ok(Some(resolve_rels_target(rels_path, removed.target_ref())?))
    }

    /// Declare the content type of the part stored at `path`.
    ///
    /// A new Override row is always appended, even if one exists for the part.
    pub fn set_content_type(&mut self, path: &str, content_type: &str) -> Result<()> {
        let types = self.content_types()?;
        types.write().add_override(&part_name(path), content_type);
        Ok(())
    }

    /// Remove every Override row naming `path`.
    pub fn remove_content_type(&mut self, path: &str) -> Result<()> {
        let types = self.content_types()?;
        let removed = types.write().remove_override(&part_name(path));
        tracing::trace!(part = %path, removed, "content type overrides removed");
        Ok(())
    }

    /// Declare a namespace on the root element of the part at `path`.
    ///
    /// Prefixes on the markup-compatibility allow-list are also added to
    /// `mc:Ignorable`. Parts that are never decoded get the declarations written
    /// into their stored root tag on save.
    pub fn register_namespace(&mut self, path: &str, attr: XmlAttr) -> Result<()> {
        if !self.namespaces.contains(path) {
            // keep the attributes the part was written with
            if let Some(bytes) = self.store.read_bytes(path)? {
                let attrs = root_attributes(&strict_to_transitional(&bytes))?;
                self.namespaces.record(path, attrs);
            }
        }
        self.namespaces.register_namespace(path, attr);
        Ok(())
    }
}

/// Override `PartName` for a member name.
pub(crate) fn part_name(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}
