/// Package implementation for PowerPoint presentations.
use crate::error::{Error, Result};
use crate::opc::cache::PartCache;
use crate::opc::compat::{NamespaceRegistry, XmlAttr};
use crate::opc::constants::{member, namespace, relationship_type as rt};
use crate::opc::content_types::ContentTypes;
use crate::opc::packuri::rels_member_for;
use crate::opc::part::PartHandle;
use crate::opc::pkgreader::ingest;
use crate::opc::rel::Relationships;
use crate::opc::store::PartStore;
use crate::options::{Limits, Options};
use crate::pptx::presentation::Presentation;
use crate::pptx::slide::Slide;
use crate::pptx::template;
use crate::pptx::theme::Theme;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};

/// A PowerPoint (.pptx) package.
///
/// The package owns every part of the archive. Parts are kept as raw bytes until
/// they are first accessed through a typed accessor; from then on the decoded
/// structure is canonical and is re-encoded when the package is saved. Parts the
/// model never touches are written back byte for byte.
///
/// Structural edits ([`Package::add_slide`], [`Package::remove_slide`], the
/// relationship and content type helpers) take `&mut self`; reads and
/// [`Package::write_to_buffer`] only need `&self`.
///
/// # Examples
///
/// ```rust,no_run
/// use longan::Package;
///
/// let mut pkg = Package::open("deck.pptx")?;
/// let id = pkg.add_slide()?;
/// println!("added slide {} of {}", id, pkg.slide_ids()?.len());
/// pkg.save_as("deck-copy.pptx")?;
/// pkg.close()?;
/// # Ok::<(), longan::Error>(())
/// ```
#[derive(Debug)]
pub struct Package {
    pub(crate) store: PartStore,
    pub(crate) types: PartCache<ContentTypes>,
    pub(crate) rels: PartCache<Relationships>,
    pub(crate) presentations: PartCache<Presentation>,
    pub(crate) slides: PartCache<Slide>,
    pub(crate) themes: PartCache<Theme>,
    pub(crate) namespaces: NamespaceRegistry,

    /// Member name of the main presentation part
    pub(crate) main_part: String,

    /// Member name of the document theme, when the package has one
    pub(crate) theme_part: Option<String>,

    /// Number of slide parts; kept in step by add/remove
    pub(crate) slide_count: usize,

    /// Highest slide id handed out or seen in this session
    pub(crate) last_slide_id: u32,

    pub(crate) path: Option<PathBuf>,
    pub(crate) options: Options,
    pub(crate) limits: Limits,
}

impl Package {
    /// Create a new package holding one blank slide.
    ///
    /// # Examples
    ///
    /// ```
    /// use longan::Package;
    ///
    /// let pkg = Package::new()?;
    /// assert_eq!(pkg.slide_ids()?, vec![256]);
    /// # Ok::<(), longan::Error>(())
    /// ```
    pub fn new() -> Result<Self> {
        let resident: HashMap<String, Vec<u8>> = template::package_parts()
            .iter()
            .map(|(name, xml)| (name.to_string(), xml.as_bytes().to_vec()))
            .collect();
        let slide_count = resident
            .keys()
            .filter(|name| crate::opc::pkgreader::is_slide_member(name))
            .count();

        let mut pkg = Self::with_store(
            PartStore::from_parts(resident, HashMap::new()),
            slide_count,
            Options::default(),
            Limits::default(),
        );
        pkg.init()?;
        Ok(pkg)
    }

    /// Open a .pptx package from a file path with default options.
    ///
    /// The path is remembered for [`Package::save`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, Options::default())
    }

    /// Open a .pptx package from a file path.
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: Options) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut pkg = Self::from_reader(BufReader::new(file), options)?;
        pkg.path = Some(path.to_path_buf());
        Ok(pkg)
    }

    /// Read a package from any seekable source.
    ///
    /// Options are validated before the archive is touched. Entries larger than the
    /// per-part limit are kept in temporary files until [`Package::close`].
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use longan::{Options, Package};
    /// use std::io::Cursor;
    ///
    /// let data = std::fs::read("deck.pptx")?;
    /// let opts = Options::new().with_unzip_xml_size_limit(1 << 20);
    /// let pkg = Package::from_reader(Cursor::new(data), opts)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_reader<R: Read + Seek>(reader: R, options: Options) -> Result<Self> {
        let limits = options.limits()?;
        let ingested = ingest(reader, &limits, options.tmp_dir.as_deref())?;
        let store = PartStore::from_parts(ingested.parts, ingested.overflow);

        let mut pkg = Self::with_store(store, ingested.slide_parts, options, limits);
        if let Err(err) = pkg.init() {
            // the package is unusable; remove its overflow files before failing
            if let Err(close_err) = pkg.store.close() {
                tracing::debug!(error = %close_err, "overflow cleanup failed");
            }
            return Err(err);
        }
        Ok(pkg)
    }

    fn with_store(store: PartStore, slide_count: usize, options: Options, limits: Limits) -> Self {
        Self {
            store,
            types: PartCache::new(),
            rels: PartCache::new(),
            presentations: PartCache::new(),
            slides: PartCache::new(),
            themes: PartCache::new(),
            namespaces: NamespaceRegistry::new(),
            main_part: member::PRESENTATION.to_string(),
            theme_part: None,
            slide_count,
            last_slide_id: 0,
            path: None,
            options,
            limits,
        }
    }

    /// Decode the parts every operation needs.
    fn init(&mut self) -> Result<()> {
        if let Some(main) = self.resolve_part(rt::OFFICE_DOCUMENT)? {
            self.main_part = main;
        }
        if self.main_part != member::PRESENTATION {
            // slide parts live next to the main part
            self.slide_count = self.count_slide_parts();
        }

        self.content_types()?;
        let pres = self.presentation()?;
        self.namespaces.register_namespace(
            &self.main_part,
            XmlAttr::new("xmlns:r", namespace::OFC_RELATIONSHIPS),
        );
        self.last_slide_id = pres.read().max_slide_id().unwrap_or(0);

        self.theme_part = self.locate_theme()?;
        if let Some(theme) = &self.theme_part {
            self.themes.decode(theme, &self.store, &self.namespaces)?;
        }

        tracing::debug!(
            main = %self.main_part,
            slides = self.slide_count,
            parts = self.store.resident_paths().len() + self.store.overflow_paths().len(),
            "package opened"
        );
        Ok(())
    }

    /// The theme targeted by the presentation, else the conventional theme part.
    fn locate_theme(&self) -> Result<Option<String>> {
        let main_rels = rels_member_for(&self.main_part);
        if let Some(theme) = self.resolve_from(&main_rels, rt::THEME)? {
            if self.store.contains(&theme) {
                return Ok(Some(theme));
            }
        }
        Ok(self
            .store
            .contains(member::THEME)
            .then(|| member::THEME.to_string()))
    }

    /// The decoded presentation part.
    pub fn presentation(&self) -> Result<PartHandle<Presentation>> {
        self.presentations
            .decode(&self.main_part, &self.store, &self.namespaces)
    }

    /// The decoded document theme, if the package has one.
    pub fn theme(&self) -> Option<PartHandle<Theme>> {
        self.theme_part
            .as_deref()
            .and_then(|path| self.themes.get(path))
    }

    /// Member name of the main presentation part.
    #[inline]
    pub fn main_part(&self) -> &str {
        &self.main_part
    }

    /// Whether a part is stored or cached under `path`.
    pub fn contains_part(&self, path: &str) -> bool {
        self.store.contains(path)
            || self.types.contains(path)
            || self.rels.contains(path)
            || self.presentations.contains(path)
            || self.slides.contains(path)
            || self.themes.contains(path)
    }

    /// Whether `path` is currently backed by a temporary file.
    pub fn is_overflow(&self, path: &str) -> bool {
        self.store.is_overflow(path)
    }

    /// The raw bytes of a part as last read or stored.
    ///
    /// Decoded parts are not re-encoded; edits to them only show up on save.
    pub fn part_bytes(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.store.read_bytes(path)?)
    }

    /// Path used by [`Package::save`].
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path<P: Into<PathBuf>>(&mut self, path: P) {
        self.path = Some(path.into());
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The size limits the package was read with.
    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Release the package.
    ///
    /// Every overflow buffer is closed and its temporary file removed, even if an
    /// earlier one fails; the first failure is returned.
    pub fn close(self) -> Result<()> {
        let result = self.store.close();
        self.types.clear();
        self.rels.clear();
        self.presentations.clear();
        self.slides.clear();
        self.themes.clear();
        self.namespaces.clear();
        tracing::debug!(ok = result.is_ok(), "package closed");
        result.map_err(Error::from)
    }
}
