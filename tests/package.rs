mod common;

use common::{assert_consistent, init_tracing};
use longan::pptx::Transform;
use longan::{Error, Options, Package};
use proptest::prelude::*;
use std::io::Cursor;

fn reopen(pkg: &Package) -> Package {
    let bytes = pkg.write_to_buffer().unwrap();
    Package::from_reader(Cursor::new(bytes), Options::default()).unwrap()
}

#[test]
fn test_round_trip_keeps_slides_and_text() {
    init_tracing();
    let mut pkg = Package::new().unwrap();
    let second = pkg.add_slide().unwrap();
    pkg.slide(second)
        .unwrap()
        .write()
        .add_text_box(Transform::new(914400, 457200, 2743200, 369332), "Quarterly\nresults & plans");
    pkg.set_slide_name(second, "Results").unwrap();

    let saved = reopen(&pkg);
    assert_eq!(saved.slide_ids().unwrap(), vec![256, second]);
    assert_eq!(saved.find_slide("Results").unwrap(), Some(second));

    let shapes = saved.shapes(second).unwrap();
    assert_eq!(shapes.len(), 1);
    assert!(shapes[0].is_text_box());
    assert_eq!(shapes[0].text(), "Quarterly\nresults & plans");
    let xfrm = shapes[0].transform().unwrap();
    assert_eq!(xfrm.offset.unwrap().x, 914400);
    assert_consistent(&saved);

    // a second save of an unchanged package is byte-identical
    let once = saved.write_to_buffer().unwrap();
    let twice = saved.write_to_buffer().unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_removed_slide_is_gone_after_save() {
    let mut pkg = Package::new().unwrap();
    let added = pkg.add_slide().unwrap();
    pkg.remove_slide(256).unwrap();

    let saved = reopen(&pkg);
    assert_eq!(saved.slide_ids().unwrap(), vec![added]);
    assert!(!saved.contains_part("ppt/slides/slide1.xml"));
    assert!(!saved.contains_part("ppt/slides/_rels/slide1.xml.rels"));
    assert_consistent(&saved);
}

#[test]
fn test_ids_continue_after_reopen() {
    let mut pkg = Package::new().unwrap();
    let last = (0..3).map(|_| pkg.add_slide().unwrap()).last().unwrap();
    let mut saved = reopen(&pkg);
    assert!(saved.add_slide().unwrap() > last);
}

#[test]
fn test_save_and_open_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deck.pptx");
    let mut pkg = Package::new().unwrap();
    pkg.add_slide().unwrap();
    pkg.save_as(&path).unwrap();
    pkg.close().unwrap();

    let mut opened = Package::open(&path).unwrap();
    assert_eq!(opened.slide_ids().unwrap().len(), 2);
    opened.add_slide().unwrap();
    opened.save().unwrap();
    opened.close().unwrap();

    let again = Package::open(&path).unwrap();
    assert_eq!(again.slide_ids().unwrap().len(), 3);
    assert_consistent(&again);
}

#[test]
fn test_unsupported_save_extension() {
    let dir = tempfile::tempdir().unwrap();
    let mut pkg = Package::new().unwrap();
    let err = pkg.save_as(dir.path().join("deck.xlsx")).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat { ref extension } if extension == ".xlsx"));
    assert!(pkg.path().is_none());
}

#[test]
fn test_malformed_archive_is_reported() {
    let err = Package::from_reader(Cursor::new(b"not a zip".to_vec()), Options::default())
        .unwrap_err();
    assert!(matches!(err, Error::Zip(_)));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_slide_ids_are_monotonic(ops in prop::collection::vec(any::<(bool, u8)>(), 1..24)) {
        let mut pkg = Package::new().unwrap();
        let mut issued = vec![256u32];

        for (add, pick) in ops {
            if add {
                let id = pkg.add_slide().unwrap();
                prop_assert!(issued.iter().all(|&old| id > old));
                issued.push(id);
            } else {
                let ids = pkg.slide_ids().unwrap();
                let victim = ids[pick as usize % ids.len()];
                pkg.remove_slide(victim).unwrap();
                let after = pkg.slide_ids().unwrap();
                if ids.len() == 1 {
                    prop_assert_eq!(after, ids);
                } else {
                    prop_assert!(!after.contains(&victim));
                }
            }
            assert_consistent(&pkg);
        }

        let saved = reopen(&pkg);
        prop_assert_eq!(saved.slide_ids().unwrap(), pkg.slide_ids().unwrap());
        assert_consistent(&saved);
    }
}
