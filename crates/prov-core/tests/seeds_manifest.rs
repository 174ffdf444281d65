use std::fs;

use prov_core::{load_seed_manifest, Identifier, ParamValue, ParameterRegistry, ProvError};

#[test]
fn yaml_manifest_declares_seeds() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("seeds.yaml");
    fs::write(
        &path,
        "seeds:\n  - id: gauge.alpha_em\n    value: 0.0072973525\n  - id: neutrino.dm2\n    value: [7.42e-5, 2.51e-3]\n    uncertainty: 0.2e-5\n  - id: higgs.vev\n    value: 246\n",
    )
    .expect("write manifest");

    let manifest = load_seed_manifest(&path).expect("load");
    assert_eq!(manifest.seeds.len(), 3);
    assert_eq!(manifest.seeds[2].value, ParamValue::Scalar(246.0));

    let mut registry = ParameterRegistry::new();
    assert_eq!(manifest.declare_into(&mut registry).expect("declare"), 3);
    assert!(registry.is_established(&Identifier::from("neutrino.dm2")));
    let record = registry.get(&Identifier::from("neutrino.dm2")).expect("record");
    assert_eq!(record.uncertainty, Some(0.2e-5));
}

#[test]
fn json_manifest_with_duplicate_fails() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("seeds.json");
    fs::write(
        &path,
        r#"{"seeds":[{"id":"a","value":1.0},{"id":"a","value":2.0}]}"#,
    )
    .expect("write manifest");
    let manifest = load_seed_manifest(&path).expect("load");
    let mut registry = ParameterRegistry::new();
    let err = manifest.declare_into(&mut registry).unwrap_err();
    assert!(matches!(err, ProvError::DuplicateEstablished(_)));
}

#[test]
fn missing_manifest_reports_path() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let err = load_seed_manifest(&dir.path().join("absent.yaml")).unwrap_err();
    assert_eq!(err.code(), "prov.read");
    assert!(err.info().context["path"].ends_with("absent.yaml"));
}
