//! Integration tests for strict file loading and inheritance resolution

use std::path::Path;

use pretty_assertions::assert_eq;

use xhs_templates::{
    get_resolved_template, load_file, RawConfig, ResolvedTemplate, SourceError, TemplateError,
    TemplateRegistry,
};

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

#[test]
fn test_load_valid_fixture() {
    let loaded = load_file(&fixture("valid.json")).expect("Should load");

    assert_eq!(
        loaded.names().collect::<Vec<_>>(),
        vec!["cafe", "lifestyle", "ootd", "product", "xhs-base"]
    );
    assert_eq!(loaded.source_path(), Some(fixture("valid.json").as_path()));
    assert!(loaded.source().modified().is_some());

    let ootd = get_resolved_template(&loaded, "ootd").expect("ootd");
    assert_eq!(ootd.label.as_deref(), Some("Outfit of the Day"));
    assert_eq!(ootd.aspect_ratio.as_deref(), Some("9:16"));
    assert_eq!(
        ootd.negative.as_deref(),
        Some("lowres, blurry, watermark, text, extra fingers\ncropped feet")
    );

    // `product` has no parent and keeps only its own text
    let product = get_resolved_template(&loaded, "product").expect("product");
    assert_eq!(
        product.prompt.as_deref(),
        Some("Top-down flat lay, neutral backdrop, soft shadows.")
    );
}

#[test]
fn test_lookup_absent_name() {
    let loaded = load_file(&fixture("valid.json")).expect("Should load");
    assert!(get_resolved_template(&loaded, "missing").is_none());
    assert_eq!(loaded.select(Some("missing")).map(|t| t.name.as_str()), Some("lifestyle"));
}

#[test]
fn test_resolved_json_has_no_extends() {
    let loaded = load_file(&fixture("valid.json")).expect("Should load");
    let cafe = get_resolved_template(&loaded, "cafe").expect("cafe");

    let json = serde_json::to_value(cafe).expect("Should serialize");
    let object = json.as_object().expect("object");
    assert!(!object.contains_key("extends"));
    assert_eq!(object["name"], "cafe");
    assert!(!object.contains_key("aspect_ratio"));
}

#[test]
fn test_cycle_fixture_rejected() {
    let err = load_file(&fixture("cycle.json")).unwrap_err();
    match &err {
        SourceError::Resolution { source, .. } => {
            insta::assert_snapshot!(source.to_string(), @"template extends cycle: cafe -> lifestyle -> cafe");
        }
        other => panic!("Expected resolution error, got {other:?}"),
    }

    let content = std::fs::read_to_string(fixture("cycle.json")).expect("Should read");
    let report = err.format(&content, "cycle.json");
    assert!(report.contains("cycle.json"), "{}", report);
    assert!(report.contains("cafe -> lifestyle -> cafe"), "{}", report);
}

#[test]
fn test_unknown_parent_fixture_rejected() {
    let err = load_file(&fixture("unknown-parent.json")).unwrap_err();
    match err {
        SourceError::Resolution { source, .. } => assert_eq!(
            source,
            TemplateError::UnknownTemplate {
                name: "missing".into(),
                referenced_by: Some("cafe".into()),
            }
        ),
        other => panic!("Expected resolution error, got {other:?}"),
    }
}

#[test]
fn test_shape_and_syntax_errors_are_invalid() {
    for name in ["invalid-shape.json", "malformed.json"] {
        let err = load_file(&fixture(name)).unwrap_err();
        assert!(matches!(err, SourceError::Invalid { .. }), "{}: {:?}", name, err);
        assert!(!err.is_missing());
    }
}

#[test]
fn test_missing_file() {
    let err = load_file(&fixture("does-not-exist.json")).unwrap_err();
    assert!(err.is_missing());
}

#[test]
fn test_resolution_is_deterministic() {
    let config = RawConfig::from_json(include_str!("fixtures/valid.json")).expect("Should parse");
    let first = TemplateRegistry::from_config(&config).expect("Should resolve");
    let second = TemplateRegistry::from_config(&config).expect("Should resolve");
    assert_eq!(first, second);
    assert_eq!(first.len(), config.templates.len());
}

#[test]
fn test_deep_chain() {
    let config = RawConfig::from_json(
        r#"{
            "templates": {
                "t1": { "extends": "t2", "prompt": "C", "label": "One" },
                "t2": { "extends": "t3", "prompt": "B", "aspect_ratio": "1:1" },
                "t3": { "prompt": "A", "negative": "n3", "label": "Three" }
            }
        }"#,
    )
    .expect("Should parse");

    let registry = TemplateRegistry::from_config(&config).expect("Should resolve");
    assert_eq!(
        registry.get("t1").cloned(),
        Some(ResolvedTemplate {
            name: "t1".into(),
            label: Some("One".into()),
            prompt: Some("A\nB\nC".into()),
            negative: Some("n3".into()),
            aspect_ratio: Some("1:1".into()),
        })
    );
}
