use scantext::config::Config;

#[test]
fn parse_example_config() {
    let raw = include_str!("../scantext.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert_eq!(cfg.engine.backend, "tesseract");
    assert!(!cfg.paths.out_dir.is_empty());
    assert!(cfg.raster.scale > 1.0);
    assert_eq!(cfg.remote.base_url, "http://127.0.0.1:8000/ocr");
}

#[test]
fn empty_config_uses_defaults() {
    let cfg: Config = toml::from_str("").expect("parse empty TOML");
    assert_eq!(cfg.engine.languages, vec!["tha", "eng"]);
    assert_eq!(cfg.export.docx_filename, "ocr_results.docx");
    assert!(cfg.limits.max_input_pages > 0);
}
