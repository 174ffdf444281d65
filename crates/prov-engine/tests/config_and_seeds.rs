mod common;

use std::fs;

use prov_core::{load_seed_manifest, Identifier, ProvError, Provenance};
use prov_engine::{load_config, Engine, EngineConfig, PipelineStatus};
use tempfile::tempdir;

use common::{square_module, sum_module};

#[test]
fn missing_fields_fall_back_to_defaults() -> Result<(), ProvError> {
    let config = EngineConfig::from_yaml_slice(b"parallelism: 4\n")?;
    assert_eq!(config.parallelism, 4);
    assert!(config.capture_panics);
    assert!(config.warn_unreferenced);
    Ok(())
}

#[test]
fn config_loads_from_yaml_file() {
    let dir = tempdir().expect("tmp dir");
    let path = dir.path().join("engine.yaml");
    fs::write(
        &path,
        "parallelism: 2\ncapture_panics: false\nwarn_unreferenced: false\n",
    )
    .expect("write config");

    let config = load_config(&path).expect("load config");
    assert_eq!(
        config,
        EngineConfig {
            parallelism: 2,
            capture_panics: false,
            warn_unreferenced: false,
        }
    );
}

#[test]
fn unreadable_config_is_a_serde_error() {
    let dir = tempdir().expect("tmp dir");
    let err = load_config(&dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, ProvError::Serde(_)));

    let bad = dir.path().join("bad.yaml");
    fs::write(&bad, "parallelism: [not, a, number]\n").expect("write bad");
    assert!(matches!(load_config(&bad), Err(ProvError::Serde(_))));
}

#[test]
fn seed_manifest_drives_a_run() -> Result<(), ProvError> {
    let dir = tempdir().expect("tmp dir");
    let path = dir.path().join("seeds.yaml");
    fs::write(
        &path,
        "seeds:\n  - id: a\n    value: 2.0\n  - id: b\n    value: 3.0\n    uncertainty: 0.1\n",
    )
    .expect("write seeds");

    let mut engine = Engine::new(EngineConfig::parallel(2));
    let declared = engine.declare_seeds(&load_seed_manifest(&path)?)?;
    assert_eq!(declared, 2);
    engine.register_module(sum_module())?;
    engine.register_module(square_module())?;

    let result = engine.execute_pipeline()?;
    assert_eq!(result.status, PipelineStatus::Success);
    let b = result.final_snapshot.get(&Identifier::from("b")).expect("b");
    assert_eq!(b.provenance, Provenance::Established);
    assert_eq!(b.uncertainty, Some(0.1));
    assert_eq!(
        result
            .final_snapshot
            .get(&Identifier::from("d"))
            .and_then(|record| record.scalar()),
        Some(25.0)
    );

    let again = engine.declare_seeds(&load_seed_manifest(&path)?).unwrap_err();
    assert!(matches!(again, ProvError::DuplicateEstablished(_)));
    Ok(())
}

#[test]
fn written_config_reloads() -> Result<(), ProvError> {
    let dir = tempdir().expect("tmp dir");
    let path = dir.path().join("written.yaml");
    let config = EngineConfig::parallel(8);
    fs::write(&path, prov_core::serde::to_yaml_string(&config)?).expect("write config");
    assert_eq!(load_config(&path)?, config);
    Ok(())
}

#[test]
fn zero_parallelism_is_rejected() {
    let err = EngineConfig::from_yaml_slice(b"parallelism: 0\n").unwrap_err();
    assert!(matches!(err, ProvError::Config(_)));
    assert_eq!(err.code(), "prov.config_parallelism");

    let engine = Engine::new(EngineConfig {
        parallelism: 0,
        ..EngineConfig::default()
    });
    engine.declare_established("a", 1.0, None).expect("seed");
    let err = engine.execute_pipeline().unwrap_err();
    assert!(matches!(err, ProvError::Config(_)));
}
