use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use serde_json::json;
use vertebra::{
    Callback, DestroyOptions, FetchOptions, Observable, Record, RecordConfig, RecordEvent,
    ReconcileOptions, SaveOptions, SetFetchOptions, SetOptions, SyncConfig, TransportError, Value,
    attrs,
    sync::{Method, MemoryTransport, RequestBody},
};

use crate::helpers::{entries, library, new_log, record_names};

fn stocked_library() -> (Rc<MemoryTransport>, vertebra::RecordSet, Record) {
    let transport = Rc::new(MemoryTransport::new());
    let set = library(Some(transport.clone()), false);
    let book = set
        .add(
            [attrs! { "id" => 10, "title" => "Dune" }],
            &vertebra::AddOptions::default(),
        )
        .remove(0);
    (transport, set, book)
}

#[test]
fn rejected_save_changes_nothing_and_sends_nothing() {
    let (transport, _set, book) = stocked_library();
    let before = book.attributes();
    let log = record_names(&book, "all");

    let sent = book
        .save(Some(attrs! { "title" => "" }), SaveOptions::default())
        .unwrap();
    assert!(!sent);
    assert_eq!(book.attributes(), before);
    assert!(transport.requests().is_empty());
    assert_eq!(entries(&log), vec!["invalid"]);
}

#[test]
fn save_runs_the_validator_once() {
    let transport = Rc::new(MemoryTransport::new());
    let runs = Rc::new(Cell::new(0));
    let counter = runs.clone();
    let config = RecordConfig::new("book")
        .with_url_root("/books")
        .with_transport(transport.clone())
        .with_validator(move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });
    let book = Record::new(config, attrs! { "id" => 10, "title" => "Dune" });

    runs.set(0);
    assert!(book
        .save(Some(attrs! { "title" => "Emma" }), SaveOptions::default())
        .unwrap());
    assert_eq!(runs.get(), 1);

    runs.set(0);
    assert!(book.save(None, SaveOptions::default()).unwrap());
    assert_eq!(runs.get(), 1);
    assert_eq!(transport.requests().len(), 2);
}

#[test]
fn create_assigns_the_server_id() {
    let transport = Rc::new(MemoryTransport::new());
    let set = library(Some(transport.clone()), false);
    let record = set
        .create(attrs! { "title" => "Emma" }, SaveOptions::default())
        .unwrap()
        .unwrap();
    assert_eq!(set.len(), 1);
    let log = record_names(&record, "request sync change:id");

    let request = transport.last_request().unwrap();
    assert_eq!(request.method, Method::Post);
    assert_eq!(request.url, "/books");
    assert_eq!(request.json_body(), Some(json!({ "title": "Emma", "pages": 0 })));

    assert!(transport.respond(json!({ "id": 42 })));
    assert_eq!(record.id(), Some(Value::from(42)));
    assert!(set.get(42).unwrap().ptr_eq(&record));
    assert_eq!(entries(&log), vec!["change:id", "sync"]);
}

#[test]
fn request_is_announced_before_the_transport_runs() {
    let (transport, set, book) = stocked_library();
    let log = record_names(&set, "request sync");
    book.fetch(FetchOptions::default()).unwrap();
    assert_eq!(entries(&log), vec!["request"]);
    transport.respond(json!({ "id": 10, "title": "Dune", "pages": 604 }));
    assert_eq!(entries(&log), vec!["request", "sync"]);
    assert_eq!(book.get("pages"), Some(Value::from(604)));
}

#[test]
fn wait_defers_the_local_change() {
    let (transport, _set, book) = stocked_library();
    book.save(
        Some(attrs! { "title" => "Dune Messiah" }),
        SaveOptions::default().with_wait(true),
    )
    .unwrap();

    let request = transport.last_request().unwrap();
    assert_eq!(request.method, Method::Put);
    assert_eq!(request.url, "/books/10");
    assert_eq!(
        request.json_body(),
        Some(json!({ "id": 10, "title": "Dune Messiah", "pages": 0 }))
    );
    assert_eq!(book.get("title"), Some(Value::from("Dune")));

    transport.respond(json!({ "updated": true }));
    assert_eq!(book.get("title"), Some(Value::from("Dune Messiah")));
    assert_eq!(book.get("updated"), Some(Value::from(true)));
}

#[test]
fn patch_sends_only_the_given_attributes() {
    let (transport, _set, book) = stocked_library();
    book.save(
        Some(attrs! { "pages" => 412 }),
        SaveOptions::default().with_patch(true),
    )
    .unwrap();
    let request = transport.last_request().unwrap();
    assert_eq!(request.method, Method::Patch);
    assert_eq!(request.json_body(), Some(json!({ "pages": 412 })));
    assert_eq!(book.get("pages"), Some(Value::from(412)));
}

#[test]
fn failures_reach_the_callback_and_the_error_event() {
    let (transport, set, book) = stocked_library();
    let log = new_log();
    let callback_log = log.clone();
    let event_log = log.clone();
    set.on(
        "error",
        Callback::new(move |_: &str, event: &vertebra::SetEvent| {
            if let Some(RecordEvent::Error { error, .. }) = event.member() {
                event_log.borrow_mut().push(format!("event {:?}", error.status));
            }
        }),
    );
    book.save(
        None,
        SaveOptions::default().on_error(move |_, error| {
            callback_log
                .borrow_mut()
                .push(format!("callback {}", error.message));
        }),
    )
    .unwrap();

    assert!(transport.fail(TransportError::with_status(503, "unavailable")));
    assert_eq!(entries(&log), vec!["callback unavailable", "event Some(503)"]);
    assert_eq!(transport.pending_count(), 0);
}

#[test]
fn destroy_with_wait_keeps_membership_until_confirmed() {
    let (transport, set, book) = stocked_library();
    let log = record_names(&book, "destroy sync");
    assert!(book.destroy(DestroyOptions::default().with_wait(true)).unwrap());

    let request = transport.last_request().unwrap();
    assert_eq!(request.method, Method::Delete);
    assert_eq!(request.body, None);
    assert!(set.contains(&book));
    assert!(entries(&log).is_empty());

    transport.respond(json!(null));
    assert!(!set.contains(&book));
    assert_eq!(entries(&log), vec!["destroy", "sync"]);
}

#[test]
fn destroy_without_wait_removes_immediately() {
    let (transport, set, book) = stocked_library();
    book.destroy(DestroyOptions::default()).unwrap();
    assert!(set.is_empty());
    assert_eq!(transport.pending_count(), 1);
}

#[test]
fn set_fetch_reconciles_or_resets() {
    let (transport, set, _book) = stocked_library();
    let log = record_names(&set, "request add remove reset sync");

    set.fetch(SetFetchOptions::default()).unwrap();
    assert_eq!(transport.last_request().unwrap().method, Method::Get);
    transport.respond(json!([
        { "id": 10, "title": "Dune" },
        { "id": 11, "title": "Emma" },
        "not a record",
    ]));
    assert_eq!(set.len(), 2);
    assert_eq!(entries(&log), vec!["request", "add", "sync"]);

    log.borrow_mut().clear();
    set.fetch(SetFetchOptions::default().with_reset(true)).unwrap();
    transport.respond(json!([{ "id": 12, "title": "Ulysses" }]));
    assert_eq!(set.len(), 1);
    assert_eq!(entries(&log), vec!["request", "reset", "sync"]);
}

#[test]
fn set_fetch_without_removal_keeps_unlisted_members() {
    let (transport, set, book) = stocked_library();
    set.fetch(
        SetFetchOptions::default().with_reconcile(ReconcileOptions::default().with_remove(false)),
    )
    .unwrap();
    transport.respond(json!([{ "id": 11, "title": "Emma" }]));
    assert_eq!(set.len(), 2);
    assert!(set.contains(&book));
}

#[test]
fn create_with_wait_adds_on_confirmation() {
    let transport = Rc::new(MemoryTransport::new());
    let set = library(Some(transport.clone()), false);
    let confirmed = Rc::new(RefCell::new(None));
    let sink = confirmed.clone();
    let record = set
        .create(
            attrs! { "title" => "Emma" },
            SaveOptions::default()
                .with_wait(true)
                .on_success(move |record, _| *sink.borrow_mut() = record.id()),
        )
        .unwrap()
        .unwrap();
    assert!(set.is_empty());
    assert!(record.collection().unwrap().ptr_eq(&set));

    transport.respond(json!({ "id": 5 }));
    assert_eq!(set.len(), 1);
    assert_eq!(*confirmed.borrow(), Some(Value::from(5)));
}

#[test]
fn create_rejects_invalid_input_up_front() {
    let transport = Rc::new(MemoryTransport::new());
    let set = library(Some(transport.clone()), false);
    let created = set.create(attrs! { "pages" => 3 }, SaveOptions::default()).unwrap();
    assert!(created.is_none());
    assert!(set.is_empty());
    assert!(transport.requests().is_empty());
}

#[test]
fn emulation_rewrites_method_and_body() {
    let transport = Rc::new(MemoryTransport::with_config(SyncConfig {
        emulate_http: true,
        emulate_json: true,
    }));
    let config = RecordConfig::new("note")
        .with_url_root("/notes")
        .with_transport(transport.clone());
    let note = Record::new(config, attrs! { "id" => 1, "body" => "hi" });
    note.save(None, SaveOptions::default()).unwrap();

    let request = transport.last_request().unwrap();
    assert_eq!(request.method, Method::Post);
    assert_eq!(request.header("x-http-method-override"), Some("PUT"));
    let Some(RequestBody::Form(fields)) = &request.body else {
        panic!("expected a form body, got {:?}", request.body);
    };
    let names: Vec<&str> = fields.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["model", "_method"]);
    assert_eq!(fields[1].1, "PUT");
    assert_eq!(request.json_body(), Some(json!({ "id": 1, "body": "hi" })));
}

#[test]
fn missing_configuration_is_a_usage_error() {
    let orphan = Record::new(RecordConfig::new("note"), attrs! { "id" => 1 });
    let err = orphan.fetch(FetchOptions::default()).unwrap_err();
    assert!(err.is_usage_error());

    let transport = Rc::new(MemoryTransport::new());
    let unrooted = Record::new(
        RecordConfig::new("note").with_transport(transport.clone()),
        attrs! { "id" => 1 },
    );
    let log = record_names(&unrooted, "request");
    let err = unrooted.save(None, SaveOptions::default()).unwrap_err();
    assert!(err.is_usage_error());
    assert!(entries(&log).is_empty());
    assert!(transport.requests().is_empty());

    unrooted
        .fetch(FetchOptions::default().with_url("/elsewhere/1"))
        .unwrap();
    assert_eq!(transport.last_request().unwrap().url, "/elsewhere/1");
}

#[test]
fn silent_response_application() {
    let (transport, _set, book) = stocked_library();
    let log = record_names(&book, "change");
    book.fetch(FetchOptions::default().with_set(SetOptions::default().with_silent(true)))
        .unwrap();
    transport.respond(json!({ "title": "Dune (revised)" }));
    assert!(entries(&log).is_empty());
    assert_eq!(book.get("title"), Some(Value::from("Dune (revised)")));
}
