use envault::environment::{VariableEntry, VariableValue};
use envault::persistence::{EnvironmentStore, YamlEnvironmentStore};
use tempfile::tempdir;

fn named(name: &str, value: &str) -> VariableEntry {
    VariableEntry::new(name, VariableValue::text(value))
}

#[test]
fn environments_are_stored_as_one_yaml_file_each() {
    let temp = tempdir().expect("tempdir");
    let mut store = YamlEnvironmentStore::new(temp.path());

    store
        .save("env-1", &[named("A", "1")])
        .expect("save env-1");
    store
        .save("env-2", &[named("B", "2")])
        .expect("save env-2");

    assert!(temp.path().join("environments/env-1.yaml").exists());
    assert!(temp.path().join("environments/env-2.yaml").exists());
    assert_eq!(store.load("env-1").expect("load")[0].name, "A");
    assert_eq!(store.load("env-2").expect("load")[0].name, "B");
}

#[test]
fn saving_replaces_the_previous_list_wholesale() {
    let temp = tempdir().expect("tempdir");
    let mut store = YamlEnvironmentStore::new(temp.path());

    store
        .save("env-1", &[named("A", "1"), named("B", "2")])
        .expect("first save");
    store.save("env-1", &[named("C", "3")]).expect("second save");

    let loaded = store.load("env-1").expect("load");
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].name, "C");
}

#[test]
fn entries_round_trip_with_flags_and_script_values() {
    let temp = tempdir().expect("tempdir");
    let mut store = YamlEnvironmentStore::new(temp.path());

    let mut secret_row = named("TOKEN", "hunter2");
    secret_row.secret = true;
    secret_row.enabled = false;
    let mut script_row = named("COMPUTED", "");
    script_row.value = VariableValue::Script(serde_json::json!({ "retries": 3 }));

    let variables = vec![secret_row, script_row];
    store.save("env-1", &variables).expect("save");
    let loaded = store.load("env-1").expect("load");
    assert_eq!(loaded, variables);
    assert!(loaded[1].value.is_script_assigned());
}

#[test]
fn unknown_environment_loads_as_empty() {
    let temp = tempdir().expect("tempdir");
    let store = YamlEnvironmentStore::new(temp.path());
    assert!(store.load("never-saved").expect("load").is_empty());
}
