use std::{cell::RefCell, rc::Rc};

use vertebra::{
    Callback, Observable, Record, RecordConfig, RecordEvent, SetOptions, Value, attrs,
    value::attributes_from_json,
};

use crate::helpers::{book_config, entries, new_log, record_names};

#[test]
fn a_change_handler_writing_back_adds_one_round() {
    let record = Record::new(RecordConfig::new("note"), attrs! { "a" => 1 });
    let log = record_names(&record, "all");
    let rounds = Rc::new(RefCell::new(0));
    let counter = rounds.clone();
    record.on(
        "change",
        Callback::new(move |_: &str, event: &RecordEvent| {
            *counter.borrow_mut() += 1;
            if *counter.borrow() == 1 {
                event
                    .record()
                    .set_one("b", true, &SetOptions::default())
                    .unwrap();
            }
        }),
    );

    record.set_one("a", 2, &SetOptions::default()).unwrap();
    // Named handlers run before `all`, so the nested write is logged inside the first round.
    assert_eq!(entries(&log), vec!["change:a", "change:b", "change", "change"]);
    assert_eq!(*rounds.borrow(), 2);
}

#[test]
fn many_nested_writes_still_end_in_one_change() {
    let record = Record::new(RecordConfig::new("note"), attrs! {});
    let log = record_names(&record, "change");
    record.on(
        "change:a",
        Callback::new(|_: &str, event: &RecordEvent| {
            let record = event.record();
            record.set_one("b", 1, &SetOptions::default()).unwrap();
            record.set_one("c", 1, &SetOptions::default()).unwrap();
        }),
    );
    record.set_one("a", 1, &SetOptions::default()).unwrap();
    assert_eq!(entries(&log), vec!["change"]);
    assert_eq!(record.keys(), vec!["a", "b", "c"]);
}

#[test]
fn reverting_within_one_outer_call_is_not_a_change() {
    let record = Record::new(RecordConfig::new("note"), attrs! { "a" => 1 });
    record.on(
        "change:a",
        Callback::new(|_: &str, event: &RecordEvent| {
            if event.attribute_change().and_then(|(_, value)| value.cloned()) == Some(Value::from(2)) {
                event.record().set_one("a", 1, &SetOptions::default()).unwrap();
            }
        }),
    );
    let changes = record_names(&record, "change");

    record.set_one("a", 2, &SetOptions::default()).unwrap();
    assert_eq!(record.get("a"), Some(Value::from(1)));
    assert!(!record.has_changed(Some("a")));
    assert!(record.changed_attributes().is_none());
    assert_eq!(entries(&changes), vec!["change"]);
}

#[test]
fn handlers_see_previous_values_and_changes() {
    let record = Record::new(RecordConfig::new("note"), attrs! { "a" => 1, "b" => 1 });
    let seen = new_log();
    let sink = seen.clone();
    record.on(
        "change",
        Callback::new(move |_: &str, event: &RecordEvent| {
            let record = event.record();
            sink.borrow_mut().push(format!(
                "previous={:?} changed={:?}",
                record.previous("a").and_then(|v| v.as_int()),
                record.changed_attributes().map(|c| c.keys().cloned().collect::<Vec<_>>()),
            ));
        }),
    );
    record.set(attrs! { "a" => 5, "b" => 1 }, &SetOptions::default()).unwrap();
    assert_eq!(
        entries(&seen),
        vec![r#"previous=Some(1) changed=Some(["a"])"#]
    );
}

#[test]
fn setting_its_own_json_is_a_no_op() {
    let record = Record::new(
        RecordConfig::new("note"),
        attrs! { "id" => 3, "tags" => vec![Value::from("x")], "done" => false },
    );
    let before = record.attributes();
    let log = record_names(&record, "all");
    let attributes = attributes_from_json(&record.to_json()).unwrap();
    record.set(attributes, &SetOptions::default()).unwrap();
    assert!(entries(&log).is_empty());
    assert_eq!(record.attributes(), before);
}

#[test]
fn integral_floats_from_the_server_are_not_changes() {
    let record = Record::new(
        RecordConfig::new("note"),
        attrs! { "n" => 1, "l" => vec![Value::from(2)] },
    );
    let log = record_names(&record, "all");
    let echo = attributes_from_json(&serde_json::json!({ "n": 1.0, "l": [2.0] })).unwrap();
    record.set(echo, &SetOptions::default()).unwrap();
    assert!(entries(&log).is_empty());
    assert!(!record.has_changed(None));
}

#[test]
fn setting_nan_over_nan_is_a_no_op() {
    let record = Record::new(RecordConfig::new("reading"), attrs! { "x" => f64::NAN });
    let log = record_names(&record, "all");
    record.set(record.attributes(), &SetOptions::default()).unwrap();
    assert!(entries(&log).is_empty());
}

#[test]
fn nan_does_not_survive_the_json_round_trip() {
    let record = Record::new(RecordConfig::new("reading"), attrs! { "x" => f64::NAN });
    let log = record_names(&record, "all");
    let attributes = attributes_from_json(&record.to_json()).unwrap();
    record.set(attributes, &SetOptions::default()).unwrap();
    assert_eq!(record.get("x"), Some(Value::Null));
    assert_eq!(entries(&log), vec!["change:x", "change"]);
}

#[test]
fn validation_failure_is_observable_and_atomic() {
    let record = Record::new(book_config(), attrs! { "title" => "Dune", "pages" => 412 });
    let log = record_names(&record, "all");

    let err = record
        .set(
            attrs! { "title" => "", "pages" => 1 },
            &SetOptions::default().with_validate(true),
        )
        .unwrap_err();
    assert_eq!(err.attribute.as_deref(), Some("title"));
    assert_eq!(entries(&log), vec!["invalid"]);
    assert_eq!(record.get("pages"), Some(Value::from(412)));
    assert_eq!(record.validation_error(), Some(err));

    record
        .set(attrs! { "pages" => 413 }, &SetOptions::default().with_validate(true))
        .unwrap();
    assert!(record.validation_error().is_none());
}

#[test]
fn silent_changes_are_forgotten_by_the_next_outer_set() {
    let record = Record::new(RecordConfig::new("note"), attrs! { "a" => 1 });
    let log = record_names(&record, "all");
    record
        .set_one("a", 2, &SetOptions::default().with_silent(true))
        .unwrap();
    assert!(entries(&log).is_empty());
    assert!(record.has_changed(Some("a")));

    record.set_one("b", 1, &SetOptions::default()).unwrap();
    assert_eq!(entries(&log), vec!["change:b", "change"]);
    assert!(!record.has_changed(Some("a")));
}

#[test]
fn clear_reports_each_removed_attribute() {
    let record = Record::new(RecordConfig::new("note"), attrs! { "id" => 1, "a" => 2 });
    let values = new_log();
    let sink = values.clone();
    record.on(
        "all",
        Callback::new(move |name: &str, event: &RecordEvent| {
            if let Some((attribute, value)) = event.attribute_change() {
                sink.borrow_mut().push(format!("{name} {attribute}={value:?}"));
            }
        }),
    );
    record.clear(&SetOptions::default()).unwrap();
    assert_eq!(
        entries(&values),
        vec!["change:id id=None", "change:a a=None"]
    );
    assert!(record.is_new());
    assert!(record.attributes().is_empty());
    assert_eq!(
        record.changed_attributes().unwrap().get("a"),
        Some(&None)
    );
}

#[test]
fn duplicate_copies_attributes_but_not_identity_of_handle() {
    let record = Record::new(RecordConfig::new("note"), attrs! { "id" => 9, "a" => 1 });
    let copy = record.duplicate();
    assert_ne!(copy.cid(), record.cid());
    assert_eq!(copy.attributes(), record.attributes());
    copy.set_one("a", 2, &SetOptions::default()).unwrap();
    assert_eq!(record.get("a"), Some(Value::from(1)));
}
