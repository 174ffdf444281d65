use prov_core::serde::{from_json_slice, to_canonical_json_bytes};
use prov_core::{Estimate, ParamValue, ParameterRegistry, Provenance, Snapshot};

#[test]
fn param_values_serialize_untagged() {
    let scalar = serde_json::to_string(&ParamValue::Scalar(0.5)).expect("scalar");
    assert_eq!(scalar, "0.5");
    let tuple = serde_json::to_string(&ParamValue::from([1.0, 2.0])).expect("tuple");
    assert_eq!(tuple, "[1.0,2.0]");
    let decoded: ParamValue = serde_json::from_str("[0.1,0.2,0.3]").expect("decode");
    assert_eq!(decoded.components(), &[0.1, 0.2, 0.3]);
}

#[test]
fn canonical_json_sorts_keys() {
    let estimate = Estimate::with_uncertainty(91.1876, 0.0021);
    let bytes = to_canonical_json_bytes(&estimate).expect("json");
    assert_eq!(
        String::from_utf8(bytes).expect("utf8"),
        r#"{"uncertainty":0.0021,"value":91.1876}"#
    );
}

#[test]
fn snapshot_export_reloads_identically() {
    let mut registry = ParameterRegistry::new();
    registry
        .declare_established("gauge.m_z", 91.1876, Some(0.0021))
        .expect("seed");
    registry
        .declare_established("neutrino.theta_12", [0.5843, 0.0132], None)
        .expect("seed");
    let snapshot = registry.snapshot();

    let bytes = snapshot.to_canonical_json_bytes().expect("export");
    let restored = Snapshot::from_json_slice(&bytes).expect("reload");
    assert_eq!(restored, snapshot);
    assert_eq!(restored.digest().expect("digest"), snapshot.digest().expect("digest"));

    let reparsed: Snapshot = from_json_slice(&bytes).expect("generic reload");
    assert_eq!(
        reparsed.by_provenance(Provenance::Established).len(),
        2
    );
}
