/// Constant values related to the Open Packaging Convention.
///
/// This module contains content type URIs (like MIME-types) that specify a part's format,
/// XML namespaces, relationship types, well-known member names and the limits applied
/// while reading a package.

/// Content type URIs (like MIME-types) that specify a part's format
pub mod content_type {
    // Office common content types
    pub const OFC_EXTENDED_PROPERTIES: &str =
        "application/vnd.openxmlformats-officedocument.extended-properties+xml";
    pub const OFC_THEME: &str = "application/vnd.openxmlformats-officedocument.theme+xml";

    // OPC core content types
    pub const OPC_CORE_PROPERTIES: &str =
        "application/vnd.openxmlformats-package.core-properties+xml";
    pub const OPC_RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";

    // PresentationML content types
    pub const PML_PRESENTATION_MAIN: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml";
    pub const PML_PRES_MACRO_MAIN: &str =
        "application/vnd.ms-powerpoint.presentation.macroEnabled.main+xml";
    pub const PML_SLIDESHOW_MAIN: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.slideshow.main+xml";
    pub const PML_SLIDESHOW_MACRO_MAIN: &str =
        "application/vnd.ms-powerpoint.slideshow.macroEnabled.main+xml";
    pub const PML_TEMPLATE_MAIN: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.template.main+xml";
    pub const PML_TEMPLATE_MACRO_MAIN: &str =
        "application/vnd.ms-powerpoint.template.macroEnabled.main+xml";
    pub const PML_SLIDE: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
    pub const PML_SLIDE_LAYOUT: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml";
    pub const PML_SLIDE_MASTER: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml";

    // Generic XML
    pub const XML: &str = "application/xml";
}

/// XML namespace URIs used in OPC packages
pub mod namespace {
    /// Office relationships namespace
    pub const OFC_RELATIONSHIPS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

    /// OPC relationships namespace
    pub const OPC_RELATIONSHIPS: &str =
        "http://schemas.openxmlformats.org/package/2006/relationships";

    /// OPC content types namespace
    pub const OPC_CONTENT_TYPES: &str =
        "http://schemas.openxmlformats.org/package/2006/content-types";

    /// DrawingML main namespace
    pub const DML_MAIN: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";

    /// PresentationML main namespace
    pub const PML_MAIN: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";

    /// Extended (application) properties namespace
    pub const OFC_EXTENDED_PROPERTIES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties";

    /// Document property variant types namespace
    pub const OFC_DOC_PROPS_VTYPES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes";

    /// Markup compatibility namespace
    pub const MC: &str = "http://schemas.openxmlformats.org/markup-compatibility/2006";

    /// Strict-conformance counterparts of the transitional namespaces above
    pub const STRICT_DML_MAIN: &str = "http://purl.oclc.org/ooxml/drawingml/main";
    pub const STRICT_PML_MAIN: &str = "http://purl.oclc.org/ooxml/presentationml/main";
    pub const STRICT_EXTENDED_PROPERTIES: &str =
        "http://purl.oclc.org/ooxml/officeDocument/extendedProperties";
    pub const STRICT_DOC_PROPS_VTYPES: &str =
        "http://purl.oclc.org/ooxml/officeDocument/docPropsVTypes";
}

/// Open XML relationship target modes
pub mod target_mode {
    /// Internal relationship target mode (default)
    pub const INTERNAL: &str = "Internal";

    /// External relationship target mode (for hyperlinks, etc.)
    pub const EXTERNAL: &str = "External";
}

/// Open XML relationship types
pub mod relationship_type {
    pub const CORE_PROPERTIES: &str =
        "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
    pub const EXTENDED_PROPERTIES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";
    pub const OFFICE_DOCUMENT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
    pub const SLIDE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
    pub const SLIDE_LAYOUT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
    pub const SLIDE_MASTER: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
    pub const THEME: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
}

/// Member names of well-known package parts (no leading slash)
pub mod member {
    pub const CONTENT_TYPES: &str = "[Content_Types].xml";
    pub const ROOT_RELS: &str = "_rels/.rels";
    pub const PRESENTATION: &str = "ppt/presentation.xml";
    pub const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";
    pub const THEME: &str = "ppt/theme/theme1.xml";
    pub const SLIDE_PREFIX: &str = "ppt/slides/slide";
}

/// Default limits used while ingesting an archive
pub mod limits {
    /// Default per-part in-memory limit; larger entries spill to disk.
    pub const STREAM_CHUNK_SIZE: u64 = 1 << 24;

    /// Default limit on the summed uncompressed size of all entries.
    pub const UNZIP_SIZE_LIMIT: u64 = 1000 << 24;

    /// Maximum password length accepted in [`crate::Options`].
    pub const MAX_FIELD_LENGTH: usize = 255;

    /// Maximum length of a save path, in characters.
    pub const MAX_FILE_PATH_LENGTH: usize = 207;
}
