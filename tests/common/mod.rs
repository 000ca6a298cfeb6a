#![allow(dead_code)]

use longan::Package;
use longan::opc::constants::{content_type, relationship_type};
use longan::pptx::template;
use std::io::{Cursor, Write};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A blank package archive with `extra` entries appended.
pub fn template_archive(extra: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, xml) in template::package_parts() {
        zip.start_file(name, options).unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
    }
    for (name, data) in extra {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Every slide id is backed by a presentation relationship, a slide override and a
/// stored or cached part, and nothing else claims to be a slide.
pub fn assert_consistent(pkg: &Package) {
    let ids = pkg.slide_ids().unwrap();
    assert_eq!(pkg.slide_count(), ids.len());

    let rels = pkg.relationships("ppt/_rels/presentation.xml.rels").unwrap();
    let slide_rels = rels
        .read()
        .iter()
        .filter(|rel| rel.reltype() == relationship_type::SLIDE)
        .count();
    assert_eq!(slide_rels, ids.len());

    let types = pkg.content_types().unwrap();
    let slide_overrides = types
        .read()
        .overrides()
        .iter()
        .filter(|o| o.content_type == content_type::PML_SLIDE)
        .count();
    assert_eq!(slide_overrides, ids.len());

    for id in ids {
        let path = pkg.slide_path(id).unwrap().expect("slide has a part");
        assert!(pkg.contains_part(&path), "missing part {}", path);
        assert_eq!(
            types.read().override_for(&format!("/{}", path)),
            Some(content_type::PML_SLIDE)
        );
    }
}
