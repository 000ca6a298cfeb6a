//! Saving a package.
//!
//! Entries are written in three phases: every decoded part (re-encoded from its
//! structure), then every resident part nobody decoded, then every overflow part
//! streamed from its temporary file. Each phase is sorted in reverse lexicographic
//! order so the same package always produces the same archive.

use crate::error::{Error, Result};
use crate::opc::cache::PartCache;
use crate::opc::compat::{apply_root_attributes, collapse_relationship_prefix, merge_defaults};
use crate::opc::constants::{content_type as ct, limits::MAX_FILE_PATH_LENGTH};
use crate::opc::packuri::resolve_rels_target;
use crate::opc::part::XmlPart;
use crate::opc::pkgwriter::ZipAssembler;
use crate::opc::xml::XML_HEADER;
use crate::pptx::graph::part_name;
use crate::pptx::package::Package;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Cursor, Seek, Write};
use std::path::Path;

/// Main part content type for each file extension a package may be saved under.
const MAIN_CONTENT_TYPES: [(&str, &str); 6] = [
    ("pptx", ct::PML_PRESENTATION_MAIN),
    ("pptm", ct::PML_PRES_MACRO_MAIN),
    ("ppsx", ct::PML_SLIDESHOW_MAIN),
    ("ppsm", ct::PML_SLIDESHOW_MACRO_MAIN),
    ("potx", ct::PML_TEMPLATE_MAIN),
    ("potm", ct::PML_TEMPLATE_MACRO_MAIN),
];

/// Main part content type for the extension of `path`.
pub fn main_content_type_for(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    MAIN_CONTENT_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, content_type)| *content_type)
        .ok_or_else(|| Error::UnsupportedFormat {
            extension: format!(".{}", ext),
        })
}

impl Package {
    /// Save to the path the package was opened from (or last saved to).
    pub fn save(&mut self) -> Result<()> {
        let path = self.path.clone().ok_or(Error::NoSavePath)?;
        self.save_as(path)
    }

    /// Save to `path` and remember it for [`Package::save`].
    ///
    /// The extension selects the main part's content type; paths longer than 207
    /// characters are rejected.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use longan::Package;
    ///
    /// let mut pkg = Package::new()?;
    /// pkg.save_as("show.ppsx")?;
    /// # Ok::<(), longan::Error>(())
    /// ```
    pub fn save_as<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        if path.to_string_lossy().chars().count() > MAX_FILE_PATH_LENGTH {
            return Err(Error::MaxFilePathLength {
                max: MAX_FILE_PATH_LENGTH,
            });
        }
        let content_type = main_content_type_for(path)?;
        self.set_main_content_type(content_type)?;

        let file = File::create(path)?;
        let mut out = self.write_archive(BufWriter::new(file))?;
        out.flush()?;
        self.path = Some(path.to_path_buf());
        tracing::debug!(path = %path.display(), "package saved");
        Ok(())
    }

    /// Write the package to `sink`.
    ///
    /// When the package has a path its extension is checked and selects the main
    /// part's content type, as for [`Package::save_as`].
    pub fn write_to<W: Write + Seek>(&self, sink: W) -> Result<W> {
        if let Some(path) = &self.path {
            self.set_main_content_type(main_content_type_for(path)?)?;
        }
        self.write_archive(sink)
    }

    /// Write the package into a new buffer.
    pub fn write_to_buffer(&self) -> Result<Vec<u8>> {
        Ok(self.write_archive(Cursor::new(Vec::new()))?.into_inner())
    }

    fn set_main_content_type(&self, content_type: &str) -> Result<()> {
        let types = self.content_types()?;
        let mut types = types.write();
        let main = part_name(&self.main_part);
        if types.override_for(&main) == Some(content_type) {
            return Ok(());
        }
        if !types.set_override_content_type(&main, content_type) {
            types.add_override(&main, content_type);
        }
        Ok(())
    }

    fn write_archive<W: Write + Seek>(&self, sink: W) -> Result<W> {
        let mut encoded = Vec::new();
        self.encode_cached(&self.types, &mut encoded);
        self.encode_cached(&self.presentations, &mut encoded);
        self.encode_cached(&self.themes, &mut encoded);
        self.encode_cached(&self.slides, &mut encoded);
        self.encode_cached(&self.rels, &mut encoded);
        encoded.sort_unstable_by(|a, b| b.0.cmp(&a.0));
        self.warn_dangling_relationships();

        let mut asm = ZipAssembler::new(sink);
        let mut written = HashSet::with_capacity(encoded.len());
        for (name, bytes) in &encoded {
            asm.add_part(name, bytes)?;
            written.insert(name.as_str());
        }

        let mut resident = self.store.resident_paths();
        resident.retain(|path| !written.contains(path.as_str()));
        resident.sort_unstable_by(|a, b| b.cmp(a));
        for path in &resident {
            // namespaces registered on a part nobody decoded go into its root tag
            let registered = self.namespaces.attrs_for(path);
            self.store
                .with_resident(path, |bytes| match &registered {
                    Some(attrs) => asm.add_part(path, &apply_root_attributes(bytes, attrs)?),
                    None => asm.add_part(path, bytes),
                })
                .transpose()?;
        }

        let mut overflow = self.store.overflow_paths();
        overflow.retain(|path| !written.contains(path.as_str()));
        overflow.sort_unstable_by(|a, b| b.cmp(a));
        for path in &overflow {
            if let Some(attrs) = self.namespaces.attrs_for(path) {
                if let Some(bytes) = self.store.read_bytes(path)? {
                    asm.add_part(path, &apply_root_attributes(&bytes, &attrs)?)?;
                    continue;
                }
            }
            let size = self.store.len_of(path).unwrap_or(0);
            asm.add_with(path, size, |w| self.store.copy_overflow(path, w).map(|_| ()))?;
        }

        tracing::debug!(
            entries = asm.len(),
            encoded = encoded.len(),
            overflow = overflow.len(),
            "archive written"
        );
        asm.finish()
    }

    /// Re-encode every cached part of one kind.
    fn encode_cached<T: XmlPart>(&self, cache: &PartCache<T>, out: &mut Vec<(String, Vec<u8>)>) {
        for (path, part) in cache.entries() {
            let mut attrs = self.namespaces.attrs_for(&path).unwrap_or_default();
            merge_defaults(&mut attrs, &T::default_root_attrs());
            let body = part.read().to_xml(&attrs);

            let mut xml = String::with_capacity(XML_HEADER.len() + body.len());
            xml.push_str(XML_HEADER);
            xml.push_str(&body);
            out.push((path, collapse_relationship_prefix(xml).into_bytes()));
        }
        // relationships looked up for parts that have none are not written
        out.retain(|(path, _)| !self.is_phantom_rels(path));
    }

    fn is_phantom_rels(&self, path: &str) -> bool {
        !self.store.contains(path)
            && self
                .rels
                .get(path)
                .is_some_and(|rels| rels.read().is_empty())
    }

    fn warn_dangling_relationships(&self) {
        for (rels_path, rels) in self.rels.entries() {
            for rel in rels.read().iter().filter(|rel| !rel.is_external()) {
                let Ok(target) = resolve_rels_target(&rels_path, rel.target_ref()) else {
                    continue;
                };
                if !self.contains_part(&target) {
                    tracing::warn!(
                        rels = %rels_path,
                        r_id = rel.r_id(),
                        target = %target,
                        "relationship target is not in the package"
                    );
                }
            }
        }
    }
}
