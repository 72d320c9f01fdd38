//! Integration tests for the level dictionary.

use proptest::prelude::*;
use storey_core::{Error, LevelDictionary, NO_LEVEL_REF};
use tempfile::TempDir;

fn open_dictionary(dir: &TempDir) -> LevelDictionary {
    LevelDictionary::open(dir.path().join("levels.storey")).unwrap()
}

#[test]
fn test_consecutive_duplicates_share_a_reference() {
    let dir = TempDir::new().unwrap();
    let mut dict = open_dictionary(&dir);

    let first = dict.put("2").unwrap();
    let cursor = dict.cursor();
    let second = dict.put("2").unwrap();

    assert_eq!(first, second);
    assert_eq!(dict.cursor(), cursor, "repeat put must not write");
}

#[test]
fn test_non_consecutive_duplicates_get_new_references() {
    let dir = TempDir::new().unwrap();
    let mut dict = open_dictionary(&dir);

    let a1 = dict.put("A").unwrap();
    let b = dict.put("B").unwrap();
    let a2 = dict.put("A").unwrap();

    assert_ne!(a1, b);
    assert_ne!(a1, a2);
    assert_eq!(dict.get(a1).unwrap(), "A");
    assert_eq!(dict.get(a2).unwrap(), "A");
}

#[test]
fn test_empty_label_and_null_reference() {
    let dir = TempDir::new().unwrap();
    let mut dict = open_dictionary(&dir);

    assert_eq!(dict.put("").unwrap(), NO_LEVEL_REF);
    assert!(dict.is_empty());
    assert_eq!(dict.get(NO_LEVEL_REF).unwrap(), "");
}

#[test]
fn test_invalid_references() {
    let dir = TempDir::new().unwrap();
    let mut dict = open_dictionary(&dir);
    dict.put("UG").unwrap();

    assert!(matches!(dict.get(-1), Err(Error::InvalidReference { reference: -1, .. })));

    let past = dict.cursor() as i64;
    assert!(matches!(dict.get(past), Err(Error::InvalidReference { .. })));
    assert!(matches!(dict.get(past + 1000), Err(Error::InvalidReference { .. })));
}

#[test]
fn test_long_label_truncated() {
    let dir = TempDir::new().unwrap();
    let mut dict = open_dictionary(&dir);

    let long = "x".repeat(300);
    let reference = dict.put(&long).unwrap();

    assert_eq!(dict.get(reference).unwrap().len(), 255);
    assert_eq!(dict.truncations(), 1);
}

#[test]
fn test_reopen_restores_cursor_and_labels() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("levels.storey");

    let (refs, cursor) = {
        let mut dict = LevelDictionary::open(&path).unwrap();
        let refs: Vec<_> = ["0", "1", "0;1", "Mezzanine"].iter().map(|l| dict.put(l).unwrap()).collect();
        dict.flush().unwrap();
        (refs, dict.cursor())
    };

    let mut dict = LevelDictionary::open(&path).unwrap();
    assert_eq!(dict.cursor(), cursor);
    assert_eq!(dict.get(refs[2]).unwrap(), "0;1");
    assert_eq!(dict.get(refs[3]).unwrap(), "Mezzanine");

    // New writes continue after the restored cursor
    let next = dict.put("2").unwrap();
    assert_eq!(next as u64, cursor);
}

#[test]
fn test_growth_past_initial_capacity() {
    let dir = TempDir::new().unwrap();
    let mut dict = open_dictionary(&dir);

    let labels: Vec<String> = (0..2000).map(|i| format!("level-{i:04}")).collect();
    let refs: Vec<_> = labels.iter().map(|l| dict.put(l).unwrap()).collect();

    for (label, reference) in labels.iter().zip(&refs) {
        assert_eq!(dict.get(*reference).unwrap(), label);
    }
}

proptest! {
    #[test]
    fn prop_put_then_get_roundtrips(labels in prop::collection::vec("[a-zA-Z0-9;_ -]{1,40}", 1..50)) {
        let dir = TempDir::new().unwrap();
        let mut dict = open_dictionary(&dir);

        let refs: Vec<_> = labels.iter().map(|l| dict.put(l).unwrap()).collect();
        for (label, reference) in labels.iter().zip(&refs) {
            prop_assert!(*reference > 0);
            prop_assert_eq!(dict.get(*reference).unwrap(), label.as_str());
        }
    }
}
