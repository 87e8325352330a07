use std::{cell::Cell, rc::Rc};

use vertebra::{
    AddOptions, Callback, Comparator, Observable, ReconcileOptions, Record, RecordConfig,
    RecordSet, RemoveOptions, ResetOptions, SetConfig, SetEvent, SetOptions, Value, attrs,
};

use crate::helpers::{book_config, entries, ids, library, new_log, plain_set, record_names};

#[test]
fn separate_adds_sort_each_time() {
    let set = library(None, true);
    let log = record_names(&set, "add sort");
    for order in [3, 1, 2] {
        set.add([attrs! { "order" => order }], &AddOptions::default());
    }
    assert_eq!(
        set.pluck("order"),
        vec![Some(Value::from(1)), Some(Value::from(2)), Some(Value::from(3))]
    );
    assert_eq!(
        entries(&log),
        vec!["add", "sort", "add", "sort", "add", "sort"]
    );
}

#[test]
fn add_events_fire_after_the_final_order_is_known() {
    let set = library(None, true);
    let positions = new_log();
    let sink = positions.clone();
    let observed = set.clone();
    set.on(
        "add",
        Callback::new(move |_: &str, event: &SetEvent| {
            let record = event.record().unwrap();
            sink.borrow_mut()
                .push(format!("{:?}", observed.index_of(record)));
        }),
    );
    set.add(
        [attrs! { "order" => 2 }, attrs! { "order" => 1 }],
        &AddOptions::default(),
    );
    assert_eq!(entries(&positions), vec!["Some(1)", "Some(0)"]);
}

#[test]
fn explicit_position_skips_sorting() {
    let set = library(None, true);
    set.add(
        [attrs! { "id" => 1, "order" => 1 }, attrs! { "id" => 2, "order" => 2 }],
        &AddOptions::default(),
    );
    let log = record_names(&set, "sort");
    set.add([attrs! { "id" => 3, "order" => 0 }], &AddOptions::default().with_at(1));
    assert_eq!(ids(&set), vec![Some(Value::from(1)), Some(Value::from(3)), Some(Value::from(2))]);
    assert!(entries(&log).is_empty());
}

#[test]
fn merging_the_sort_attribute_resorts() {
    let set = library(None, true);
    set.add(
        [attrs! { "id" => 1, "order" => 1 }, attrs! { "id" => 2, "order" => 2 }],
        &AddOptions::default(),
    );
    let log = record_names(&set, "sort");
    set.set(
        [attrs! { "id" => 1, "order" => 5 }, attrs! { "id" => 2, "order" => 2 }],
        &ReconcileOptions::default(),
    );
    assert_eq!(ids(&set), vec![Some(Value::from(2)), Some(Value::from(1))]);
    assert_eq!(entries(&log), vec!["sort"]);

    set.set(
        [attrs! { "id" => 1, "title" => "x" }],
        &ReconcileOptions::default().with_remove(false),
    );
    assert_eq!(entries(&log), vec!["sort"]);
}

#[test]
fn merge_never_duplicates() {
    let set = plain_set("people");
    set.set([attrs! { "id" => 1, "name" => "a" }], &ReconcileOptions::default());
    set.set([attrs! { "id" => 1, "name" => "b" }], &ReconcileOptions::default());
    assert_eq!(set.len(), 1);
    let member = set.get(1).unwrap();
    assert_eq!(member.get("name"), Some(Value::from("b")));
    assert!(set.at(0).unwrap().ptr_eq(&member));
}

#[test]
fn merging_an_integral_float_echo_is_silent() {
    let set = plain_set("people");
    set.set([attrs! { "id" => 1, "name" => "a" }], &ReconcileOptions::default());
    let log = record_names(&set, "all");
    let echo =
        vertebra::value::attributes_from_json(&serde_json::json!({ "id": 1.0, "name": "a" }))
            .unwrap();
    set.set([echo], &ReconcileOptions::default());
    assert!(entries(&log).is_empty());
    assert_eq!(set.len(), 1);
    assert_eq!(set.get(1).unwrap().get("id"), Some(Value::Int(1)));
}

#[test]
fn repeated_identity_in_one_call_merges() {
    let set = plain_set("people");
    let resolved = set.set(
        [attrs! { "id" => 1, "name" => "a" }, attrs! { "id" => 1, "name" => "b" }],
        &ReconcileOptions::default(),
    );
    assert_eq!(set.len(), 1);
    assert!(resolved[0].ptr_eq(&resolved[1]));
    assert_eq!(set.get(1).unwrap().get("name"), Some(Value::from("b")));
}

#[test]
fn reconciliation_adds_merges_and_removes() {
    let set = plain_set("people");
    set.add(
        [
            attrs! { "id" => 1, "name" => "ann" },
            attrs! { "id" => 2, "name" => "bob" },
            attrs! { "id" => 3, "name" => "cy" },
        ],
        &AddOptions::default(),
    );
    let log = record_names(&set, "add remove change");

    set.set(
        [attrs! { "id" => 2, "name" => "robert" }, attrs! { "id" => 4, "name" => "dee" }],
        &ReconcileOptions::default(),
    );
    assert_eq!(ids(&set), vec![Some(Value::from(2)), Some(Value::from(4))]);
    assert_eq!(entries(&log), vec!["change", "remove", "remove", "add"]);
    assert!(set.get(1).is_none());
    assert!(set.get(3).is_none());
}

#[test]
fn toggles_restrict_reconciliation() {
    let set = plain_set("people");
    set.add([attrs! { "id" => 1, "name" => "ann" }], &AddOptions::default());

    set.set(
        [attrs! { "id" => 1, "name" => "anna" }, attrs! { "id" => 2 }],
        &ReconcileOptions::default().with_add(false).with_merge(false),
    );
    assert_eq!(set.len(), 1);
    assert_eq!(set.get(1).unwrap().get("name"), Some(Value::from("ann")));

    set.set([attrs! { "id" => 2 }], &ReconcileOptions::default().with_remove(false));
    assert_eq!(set.len(), 2);

    set.add([attrs! { "id" => 1, "name" => "anna" }], &AddOptions::default());
    assert_eq!(set.get(1).unwrap().get("name"), Some(Value::from("ann")));
    set.add([attrs! { "id" => 1, "name" => "anna" }], &AddOptions::default().with_merge(true));
    assert_eq!(set.get(1).unwrap().get("name"), Some(Value::from("anna")));
}

#[test]
fn removal_from_one_set_leaves_the_other_alone() {
    let first = plain_set("first");
    let second = plain_set("second");
    let shared = Record::new(RecordConfig::new("item"), attrs! { "id" => 7 });
    first.add([shared.clone()], &AddOptions::default());
    second.add([shared.clone()], &AddOptions::default());
    assert!(shared.collection().unwrap().ptr_eq(&first));

    let first_log = record_names(&first, "remove");
    let second_log = record_names(&second, "remove");
    second.remove([shared.clone()], &RemoveOptions::default());

    assert!(first.get(7).unwrap().ptr_eq(&shared));
    assert_eq!(first.len(), 1);
    assert!(second.get(7).is_none());
    assert!(shared.collection().unwrap().ptr_eq(&first));
    assert!(first_log.borrow().is_empty());
    assert_eq!(entries(&second_log), vec!["remove"]);

    let changes = record_names(&first, "change:name");
    shared.set_one("name", "x", &SetOptions::default()).unwrap();
    assert_eq!(entries(&changes), vec!["change:name"]);
}

#[test]
fn remove_reports_the_former_index() {
    let set = plain_set("people");
    let records = set.add(
        (1..=3).map(|id| attrs! { "id" => id }),
        &AddOptions::default(),
    );
    let indexes = new_log();
    let sink = indexes.clone();
    set.on(
        "remove",
        Callback::new(move |_: &str, event: &SetEvent| {
            if let Some(vertebra::RecordEvent::Removed { index, .. }) = event.member() {
                sink.borrow_mut().push(index.to_string());
            }
        }),
    );
    set.remove([records[2].clone(), records[0].clone()], &RemoveOptions::default());
    assert_eq!(entries(&indexes), vec!["2", "0"]);
    assert_eq!(ids(&set), vec![Some(Value::from(2))]);
}

#[test]
fn destroy_removes_from_the_set() {
    let set = plain_set("people");
    let record = set.add([attrs! { "name" => "temp" }], &AddOptions::default()).remove(0);
    let log = record_names(&set, "all");
    let destroyed = Rc::new(Cell::new(false));
    let flag = destroyed.clone();
    record
        .destroy(vertebra::DestroyOptions::default().on_success(move |_, _| flag.set(true)))
        .unwrap();
    assert!(destroyed.get());
    assert!(set.is_empty());
    assert_eq!(entries(&log), vec!["remove", "destroy"]);
}

#[test]
fn invalid_payloads_are_skipped_when_validating() {
    let set = RecordSet::new(SetConfig::new("library", book_config()));
    let rejected = new_log();
    let sink = rejected.clone();
    set.on(
        "invalid",
        Callback::new(move |_: &str, event: &SetEvent| {
            if let SetEvent::Invalid { error, .. } = event {
                sink.borrow_mut().push(error.to_string());
            }
        }),
    );
    let added = set.add(
        [attrs! { "title" => "Dune" }, attrs! { "pages" => 3 }],
        &AddOptions::default().with_validate(true),
    );
    assert_eq!(added.len(), 1);
    assert_eq!(set.len(), 1);
    assert_eq!(entries(&rejected), vec!["title: title is required"]);

    set.add([attrs! { "pages" => 3 }], &AddOptions::default());
    assert_eq!(set.len(), 2);
}

#[test]
fn reset_emits_a_single_event() {
    let set = plain_set("people");
    let before = set.add([attrs! { "id" => 1 }, attrs! { "id" => 2 }], &AddOptions::default());
    let log = record_names(&set, "all");
    let previous = Rc::new(Cell::new(0));
    let count = previous.clone();
    set.on(
        "reset",
        Callback::new(move |_: &str, event: &SetEvent| {
            if let SetEvent::Reset { previous, .. } = event {
                count.set(previous.len());
            }
        }),
    );

    set.reset([attrs! { "id" => 3 }], &ResetOptions::default());
    assert_eq!(entries(&log), vec!["reset"]);
    assert_eq!(previous.get(), 2);
    assert_eq!(ids(&set), vec![Some(Value::from(3))]);
    assert!(before.iter().all(|record| record.collection().is_none()));

    before[0].set_one("n", 1, &SetOptions::default()).unwrap();
    assert_eq!(entries(&log), vec!["reset"]);
}

#[test]
fn constructing_with_records_is_silent() {
    let config = SetConfig::new("people", RecordConfig::new("person"))
        .with_comparator(Comparator::key(|record: &Record| {
            record.get("name").unwrap_or(Value::Null)
        }));
    let set = RecordSet::with_records(
        config,
        [attrs! { "name" => "cy" }, attrs! { "name" => "ann" }],
    );
    assert_eq!(
        set.pluck("name"),
        vec![Some(Value::from("ann")), Some(Value::from("cy"))]
    );
}

#[test]
fn push_unshift_pop_shift() {
    let set = plain_set("queue");
    set.push(attrs! { "id" => 2 }, &AddOptions::default());
    set.push(attrs! { "id" => 3 }, &AddOptions::default());
    set.unshift(attrs! { "id" => 1 }, &AddOptions::default());
    assert_eq!(ids(&set), vec![Some(Value::from(1)), Some(Value::from(2)), Some(Value::from(3))]);

    assert_eq!(set.pop(&RemoveOptions::default()).unwrap().id(), Some(Value::from(3)));
    assert_eq!(set.shift(&RemoveOptions::default()).unwrap().id(), Some(Value::from(1)));
    assert_eq!(ids(&set), vec![Some(Value::from(2))]);
}

#[test]
fn where_and_find_where() {
    let set = plain_set("people");
    set.add(
        [
            attrs! { "id" => 1, "team" => "red" },
            attrs! { "id" => 2, "team" => "blue" },
            attrs! { "id" => 3, "team" => "red" },
        ],
        &AddOptions::default(),
    );
    let red = set.where_attrs(&attrs! { "team" => "red" });
    assert_eq!(red.len(), 2);
    assert_eq!(
        set.find_where(&attrs! { "team" => "blue" }).unwrap().id(),
        Some(Value::from(2))
    );
    assert!(set.find_where(&attrs! {}).is_none());
}

#[test]
fn set_comparator_at_runtime() {
    let set = plain_set("people");
    set.add(
        [attrs! { "id" => 1, "age" => 40 }, attrs! { "id" => 2, "age" => 20 }],
        &AddOptions::default(),
    );
    set.set_comparator(Some(Comparator::compare(|a: &Record, b: &Record| {
        b.get("age")
            .and_then(|v| v.as_int())
            .cmp(&a.get("age").and_then(|v| v.as_int()))
    })));
    set.sort(&vertebra::SortOptions::default()).unwrap();
    assert_eq!(ids(&set), vec![Some(Value::from(1)), Some(Value::from(2))]);

    set.set_comparator(Some(Comparator::attribute("age")));
    set.sort(&vertebra::SortOptions::default()).unwrap();
    assert_eq!(ids(&set), vec![Some(Value::from(2)), Some(Value::from(1))]);
}
