mod common;

use common::{init_tracing, template_archive};
use longan::{Error, Options, Package};
use std::io::{Cursor, Read};
use zip::ZipArchive;

const LIMIT: u64 = 8192;

fn file_count(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[test]
fn test_parts_above_the_limit_overflow_to_disk() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let over: Vec<u8> = (0..=LIMIT).map(|i| (i % 251) as u8).collect();
    let at = vec![7u8; LIMIT as usize];
    let bytes = template_archive(&[
        ("ppt/media/over.bin", over.clone()),
        ("ppt/media/at.bin", at.clone()),
    ]);

    let opts = Options::new()
        .with_unzip_xml_size_limit(LIMIT)
        .with_tmp_dir(tmp.path());
    let pkg = Package::from_reader(Cursor::new(bytes), opts).unwrap();

    assert!(pkg.is_overflow("ppt/media/over.bin"));
    assert!(!pkg.is_overflow("ppt/media/at.bin"));
    assert_eq!(file_count(tmp.path()), 1);
    assert_eq!(pkg.part_bytes("ppt/media/over.bin").unwrap().unwrap(), over);

    let out = pkg.write_to_buffer().unwrap();
    let mut archive = ZipArchive::new(Cursor::new(out)).unwrap();
    let mut copied = Vec::new();
    archive
        .by_name("ppt/media/over.bin")
        .unwrap()
        .read_to_end(&mut copied)
        .unwrap();
    assert_eq!(copied, over);

    // overflow entries are written last
    let last = archive.len() - 1;
    assert_eq!(archive.by_index(last).unwrap().name(), "ppt/media/over.bin");

    pkg.close().unwrap();
    assert_eq!(file_count(tmp.path()), 0);
}

#[test]
fn test_overflowed_xml_part_still_decodes() {
    let tmp = tempfile::tempdir().unwrap();
    let bytes = template_archive(&[]);
    // the template theme is larger than this limit
    let opts = Options::new()
        .with_unzip_xml_size_limit(1024)
        .with_tmp_dir(tmp.path());
    let pkg = Package::from_reader(Cursor::new(bytes), opts).unwrap();

    assert!(pkg.is_overflow("ppt/theme/theme1.xml"));
    let theme = pkg.theme().unwrap();
    assert_eq!(theme.read().minor_font(), Some("Calibri"));
    pkg.close().unwrap();
    assert_eq!(file_count(tmp.path()), 0);
}

#[test]
fn test_total_size_limit_is_enforced() {
    let tmp = tempfile::tempdir().unwrap();
    let bytes = template_archive(&[("ppt/media/big.bin", vec![0u8; 4096])]);
    let opts = Options::new()
        .with_unzip_size_limit(2048)
        .with_unzip_xml_size_limit(512)
        .with_tmp_dir(tmp.path());

    match Package::from_reader(Cursor::new(bytes), opts) {
        Err(Error::UnzipSizeLimit { limit }) => assert_eq!(limit, 2048),
        other => panic!("expected a size limit error, got {:?}", other.map(|_| ())),
    }
    assert_eq!(file_count(tmp.path()), 0);
}

#[test]
fn test_options_from_yaml() {
    let opts = Options::from_yaml("unzip_size_limit: 4096\nunzip_xml_size_limit: 8192\n").unwrap();
    assert!(matches!(
        Package::from_reader(Cursor::new(template_archive(&[])), opts),
        Err(Error::UnzipSizeLimitOrder)
    ));

    let long = "x".repeat(256);
    let opts = Options::new().with_password(long);
    assert!(matches!(
        Package::from_reader(Cursor::new(template_archive(&[])), opts),
        Err(Error::PasswordLengthInvalid { max: 255 })
    ));
}
