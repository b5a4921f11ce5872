//! Dictionary loading from the filesystem

use radius_codec::{DictionaryError, DictionaryParser, FileResolver, ValueKind};
use std::fs;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, contents: &str) -> String {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_file_includes_are_relative_to_the_including_file() {
    let dir = TempDir::new().unwrap();
    let main = write(
        &dir,
        "main.dict",
        "ATTRIBUTE User-Name 1 string\n$INCLUDE vendor/acme.dict\n",
    );
    write(
        &dir,
        "vendor/acme.dict",
        "VENDOR 99999 Acme\nVENDORATTR 99999 Acme-Level 1 integer\n$INCLUDE common.dict\n",
    );
    write(&dir, "vendor/common.dict", "ATTRIBUTE Class 25 octets\n");

    let dictionary = DictionaryParser::new(FileResolver).parse(&main).unwrap();
    assert_eq!(dictionary.vendor_id("Acme"), Some(99999));

    let level = dictionary.attribute_type_by_name("Acme-Level").unwrap();
    assert_eq!(level.vendor_id, Some(99999));
    assert_eq!(level.kind, ValueKind::Integer);
    assert!(dictionary.attribute_type(None, 25).is_some());
}

#[test]
fn test_missing_include_is_skipped() {
    let dir = TempDir::new().unwrap();
    let main = write(
        &dir,
        "main.dict",
        "$INCLUDE does-not-exist.dict\nATTRIBUTE User-Name 1 string\n",
    );

    let dictionary = DictionaryParser::new(FileResolver).parse(&main).unwrap();
    assert_eq!(dictionary.len(), 1);
}

#[test]
fn test_missing_top_level_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.dict");
    let result = DictionaryParser::new(FileResolver).parse(&missing.to_string_lossy());
    assert!(matches!(result, Err(DictionaryError::Io { .. })));
}

#[test]
fn test_bad_lines_do_not_stop_loading() {
    let dir = TempDir::new().unwrap();
    let main = write(
        &dir,
        "main.dict",
        "ATTRIBUTE Broken\nATTRIBUTE User-Name 1 string\nVALUE Nope Label 1\nBOGUS line\nATTRIBUTE Reply-Message 18 string\n",
    );

    let dictionary = DictionaryParser::new(FileResolver).parse(&main).unwrap();
    assert_eq!(dictionary.len(), 2);
}
