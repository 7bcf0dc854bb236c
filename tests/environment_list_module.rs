use envault::environment::{FieldEdit, VariableEntry, VariableList, VariableValue};

fn named(name: &str, value: &str) -> VariableEntry {
    VariableEntry::new(name, VariableValue::text(value))
}

#[test]
fn renaming_the_sentinel_grows_the_list_by_one() {
    let mut list = VariableList::initialize(vec![named("A", "1")]);
    let sentinel = list.sentinel_uid().expect("sentinel").clone();

    list.rename(&sentinel, "B").expect("rename");

    let names: Vec<&str> = list.rows().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B", ""]);
    assert_eq!(list.rows()[0].value, VariableValue::text("1"));
    assert_eq!(list.rows()[1].value, VariableValue::text(""));
    assert_eq!(list.rows()[1].uid, sentinel);
}

#[test]
fn sentinel_stays_last_through_an_edit_sequence() {
    let mut list = VariableList::initialize(vec![named("A", "1"), named("B", "2")]);

    let sentinel = list.sentinel_uid().expect("sentinel").clone();
    list.rename(&sentinel, "C").expect("graduate");
    let c_uid = sentinel;

    let a_uid = list.find_by_name("A").expect("A").uid.clone();
    list.edit(&a_uid, FieldEdit::Value(VariableValue::text("10")))
        .expect("edit");
    list.edit(&a_uid, FieldEdit::Secret(true)).expect("edit");
    list.remove(&c_uid);
    let b_uid = list.find_by_name("B").expect("B").uid.clone();
    list.rename(&b_uid, "B2").expect("rename");
    let sentinel = list.sentinel_uid().expect("sentinel").clone();
    list.remove(&sentinel);

    let trailing_empty: Vec<usize> = list
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.name.trim().is_empty())
        .map(|(index, _)| index)
        .collect();
    assert_eq!(trailing_empty, vec![list.len() - 1]);
}

#[test]
fn uids_are_stable_across_operations_that_keep_the_row() {
    let mut list = VariableList::initialize(vec![named("A", "1"), named("B", "2")]);
    let a_uid = list.rows()[0].uid.clone();
    let b_uid = list.rows()[1].uid.clone();

    list.edit(&a_uid, FieldEdit::Value(VariableValue::text("3")))
        .expect("edit");
    list.rename(&a_uid, "A2").expect("rename");
    list.remove(&b_uid);

    assert_eq!(list.rows()[0].uid, a_uid);
    assert!(list.position(&b_uid).is_none());
}

#[test]
fn removing_a_graduated_trailing_row_restores_the_sentinel() {
    let mut list = VariableList::initialize(vec![named("A", "1")]);
    let sentinel = list.sentinel_uid().expect("sentinel").clone();
    list.rename(&sentinel, "B").expect("graduate");

    // Drop the fresh sentinel directly: remove() must refuse.
    let fresh = list.sentinel_uid().expect("sentinel").clone();
    list.remove(&fresh);
    assert_eq!(list.sentinel_uid(), Some(&fresh));

    // Removing B leaves A followed by the sentinel.
    list.remove(&sentinel);
    let names: Vec<&str> = list.rows().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["A", ""]);
}
