use envault::shared::ids::VariableUid;
use std::collections::BTreeSet;

#[test]
fn shared_ids_module_generates_unique_uids() {
    let mut seen = BTreeSet::new();
    for _ in 0..1000 {
        assert!(seen.insert(VariableUid::generate()));
    }
}

#[test]
fn shared_ids_module_parses_opaque_identifiers() {
    assert_eq!(
        VariableUid::parse("var-abc-123").expect("uid").as_str(),
        "var-abc-123"
    );
    assert!(VariableUid::parse("").is_err());
    assert!(VariableUid::parse("has space").is_err());
    assert!(VariableUid::parse("has\ttab").is_err());
}
