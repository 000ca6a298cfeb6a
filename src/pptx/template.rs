//! Presentation template module.
//!
//! Provides the minimal parts of a valid .pptx package: one slide master, one
//! blank layout, one theme and one blank slide.

/// Layout a new slide points at when no existing slide shows which one to use.
pub const DEFAULT_LAYOUT_TARGET: &str = "../slideLayouts/slideLayout1.xml";

/// An empty slide with a bare shape tree.
pub fn blank_slide_xml() -> &'static str {
    include_str!("../../resources/templates/slide.xml")
}

/// Relationships of a new slide (its layout only).
pub fn blank_slide_rels_xml() -> &'static str {
    include_str!("../../resources/templates/slide.xml.rels")
}

/// Every part of a new package, keyed by member name.
pub fn package_parts() -> [(&'static str, &'static str); 16] {
    [
        (
            "[Content_Types].xml",
            include_str!("../../resources/templates/content_types.xml"),
        ),
        ("_rels/.rels", include_str!("../../resources/templates/root.rels")),
        ("docProps/app.xml", include_str!("../../resources/templates/app.xml")),
        ("docProps/core.xml", include_str!("../../resources/templates/core.xml")),
        (
            "ppt/presentation.xml",
            include_str!("../../resources/templates/presentation.xml"),
        ),
        (
            "ppt/_rels/presentation.xml.rels",
            include_str!("../../resources/templates/presentation.xml.rels"),
        ),
        ("ppt/presProps.xml", include_str!("../../resources/templates/presProps.xml")),
        ("ppt/viewProps.xml", include_str!("../../resources/templates/viewProps.xml")),
        (
            "ppt/tableStyles.xml",
            include_str!("../../resources/templates/tableStyles.xml"),
        ),
        ("ppt/theme/theme1.xml", include_str!("../../resources/templates/theme.xml")),
        (
            "ppt/slideMasters/slideMaster1.xml",
            include_str!("../../resources/templates/slideMaster.xml"),
        ),
        (
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            include_str!("../../resources/templates/slideMaster.xml.rels"),
        ),
        (
            "ppt/slideLayouts/slideLayout1.xml",
            include_str!("../../resources/templates/slideLayout.xml"),
        ),
        (
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            include_str!("../../resources/templates/slideLayout.xml.rels"),
        ),
        ("ppt/slides/slide1.xml", blank_slide_xml()),
        ("ppt/slides/_rels/slide1.xml.rels", blank_slide_rels_xml()),
    ]
}
