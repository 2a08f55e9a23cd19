use scantext::classify::{DocumentKind, UploadedDocument, classify};
use std::path::PathBuf;

fn doc(name: &str) -> UploadedDocument {
    UploadedDocument {
        path: PathBuf::from(name),
        file_name: name.to_string(),
        bytes: vec![1, 2, 3],
    }
}

#[test]
fn pdf_is_paginated() {
    assert_eq!(classify(&doc("scan.pdf")).unwrap(), DocumentKind::Paginated);
}

#[test]
fn images_are_single_image() {
    for name in ["photo.png", "photo.jpg", "photo.jpeg"] {
        assert_eq!(classify(&doc(name)).unwrap(), DocumentKind::SingleImage);
    }
}

#[test]
fn extension_is_case_insensitive() {
    assert_eq!(classify(&doc("SCAN.PDF")).unwrap(), DocumentKind::Paginated);
    assert_eq!(classify(&doc("a.PnG")).unwrap(), DocumentKind::SingleImage);
}

#[test]
fn unsupported_extension_is_rejected() {
    let err = classify(&doc("file.txt")).unwrap_err();
    assert_eq!(err.extension, "txt");
}

#[test]
fn missing_extension_is_rejected() {
    assert!(classify(&doc("file")).is_err());
}
