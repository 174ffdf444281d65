use std::collections::BTreeSet;

use prov_core::{
    CommitRequest, Estimate, Identifier, ModuleId, ParameterRegistry, ProvError, Provenance,
};
use proptest::prelude::*;

fn commit(
    registry: &mut ParameterRegistry,
    module: &str,
    id: &str,
    value: f64,
    deps: &[&str],
) -> Result<u64, ProvError> {
    registry
        .commit(CommitRequest {
            module_id: ModuleId::from(module),
            id: Identifier::from(id),
            estimate: Estimate::exact(value),
            provenance: Provenance::Derived,
            depends_on: deps.iter().map(|dep| Identifier::from(*dep)).collect(),
        })
        .map(|record| record.sequence)
}

#[test]
fn duplicate_established_is_rejected() {
    let mut registry = ParameterRegistry::new();
    registry
        .declare_established("higgs.mass", 125.25, Some(0.17))
        .expect("first declaration");
    let err = registry
        .declare_established("higgs.mass", 125.25, Some(0.17))
        .unwrap_err();
    assert!(matches!(err, ProvError::DuplicateEstablished(_)));
}

#[test]
fn established_cannot_shadow_computed_value() {
    let mut registry = ParameterRegistry::new();
    registry.begin_run();
    commit(&mut registry, "m", "x", 1.0, &[]).expect("commit");
    let err = registry.declare_established("x", 1.0, None).unwrap_err();
    assert_eq!(err.code(), "prov.duplicate_established");
}

#[test]
fn non_finite_seed_is_rejected() {
    let mut registry = ParameterRegistry::new();
    let err = registry
        .declare_established("bad", f64::NAN, None)
        .unwrap_err();
    assert!(matches!(err, ProvError::InvalidValue(_)));
    assert!(registry.is_empty());
}

#[test]
fn foreign_owner_is_rejected() {
    let mut registry = ParameterRegistry::new();
    registry.begin_run();
    commit(&mut registry, "owner", "x", 1.0, &[]).expect("commit");
    registry.begin_run();
    let err = commit(&mut registry, "intruder", "x", 1.0, &[]).unwrap_err();
    assert_eq!(err.code(), "prov.foreign_owner");
    assert_eq!(err.info().context["owner"], "owner");
}

#[test]
fn same_producer_may_refresh_only_in_a_new_run() {
    let mut registry = ParameterRegistry::new();
    registry.begin_run();
    commit(&mut registry, "m", "x", 1.0, &[]).expect("first");
    let err = commit(&mut registry, "m", "x", 2.0, &[]).unwrap_err();
    assert_eq!(err.code(), "prov.double_commit");

    registry.begin_run();
    commit(&mut registry, "m", "x", 2.0, &[]).expect("refresh");
    let record = registry.get(&Identifier::from("x")).expect("record");
    assert_eq!(record.scalar(), Some(2.0));
    assert_eq!(record.run, 2);
}

#[test]
fn commit_requires_committed_dependencies() {
    let mut registry = ParameterRegistry::new();
    registry.begin_run();
    let err = commit(&mut registry, "m", "y", 1.0, &["missing"]).unwrap_err();
    assert!(matches!(err, ProvError::UnresolvedDependency(_)));
}

#[test]
fn get_reports_unresolved() {
    let registry = ParameterRegistry::new();
    let err = registry.get(&Identifier::from("nope")).unwrap_err();
    assert_eq!(err.code(), "prov.unresolved");
    assert!(registry.try_get(&Identifier::from("nope")).is_none());
}

#[test]
fn try_get_returns_declared_record() {
    let mut registry = ParameterRegistry::new();
    registry
        .declare_established("neutrino.dm21", 7.42e-5, Some(0.21e-5))
        .expect("seed");
    let record = registry
        .try_get(&Identifier::from("neutrino.dm21"))
        .expect("declared");
    assert!(record.is_established());
    assert_eq!(record.uncertainty, Some(0.21e-5));
    assert_eq!(record.run, 0);
}

#[test]
fn release_enables_explicit_reassignment() {
    let mut registry = ParameterRegistry::new();
    registry.declare_established("seed", 1.0, None).expect("seed");
    registry.begin_run();
    commit(&mut registry, "old", "x", 1.0, &["seed"]).expect("commit");

    let released = registry.release(&Identifier::from("x")).expect("release");
    assert_eq!(released.produced_by, Some(ModuleId::from("old")));
    registry.begin_run();
    commit(&mut registry, "new", "x", 3.0, &["seed"]).expect("new owner");
    assert_eq!(
        registry.owner(&Identifier::from("x")),
        Some(&ModuleId::from("new"))
    );

    let err = registry.release(&Identifier::from("seed")).unwrap_err();
    assert_eq!(err.code(), "prov.release_established");
}

#[test]
fn depends_on_is_recorded() {
    let mut registry = ParameterRegistry::new();
    registry.declare_established("a", 2.0, None).expect("seed");
    registry.declare_established("b", 3.0, None).expect("seed");
    registry.begin_run();
    commit(&mut registry, "sum", "c", 5.0, &["a", "b"]).expect("commit");
    let record = registry.get(&Identifier::from("c")).expect("record");
    let expected: BTreeSet<_> = ["a", "b"].into_iter().map(Identifier::from).collect();
    assert_eq!(record.depends_on, expected);
    assert_eq!(record.produced_by, Some(ModuleId::from("sum")));
}

proptest! {
    #[test]
    fn commit_over_established_always_fails(value in -1.0e6f64..1.0e6, same in any::<bool>()) {
        let mut registry = ParameterRegistry::new();
        registry.declare_established("gauge.sin2_theta_w", value, None).unwrap();
        registry.begin_run();
        let written = if same { value } else { value + 1.0 };
        let err = commit(&mut registry, "gauge.weinberg", "gauge.sin2_theta_w", written, &[]).unwrap_err();
        prop_assert!(matches!(err, ProvError::OverrideViolation(_)));
        prop_assert_eq!(err.code(), "prov.override_established");
    }

    #[test]
    fn sequence_is_strictly_increasing(count in 1usize..32) {
        let mut registry = ParameterRegistry::new();
        registry.begin_run();
        let mut last = 0;
        for idx in 0..count {
            let seq = commit(&mut registry, "m", &format!("id.{idx}"), idx as f64, &[]).unwrap();
            prop_assert!(seq > last);
            last = seq;
        }
    }
}
