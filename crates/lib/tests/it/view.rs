use std::{cell::RefCell, rc::Rc};

use vertebra::{
    Callback, ElementHost, Observable, Record, RecordEvent, SetOptions, Value, View, attrs,
    view::{HostListener, ViewHandler},
};

use crate::helpers::{entries, new_log, plain_set};

/// Element host that keeps its bindings in a list and can fire them.
#[derive(Default)]
struct Page {
    bindings: RefCell<Vec<(String, Option<String>, String, HostListener)>>,
    detached: RefCell<bool>,
}

impl Page {
    fn dispatch(&self, event: &str, selector: Option<&str>, payload: serde_json::Value) -> usize {
        let listeners: Vec<HostListener> = self
            .bindings
            .borrow()
            .iter()
            .filter(|(bound, target, _, _)| bound == event && target.as_deref() == selector)
            .map(|(_, _, _, listener)| listener.clone())
            .collect();
        for listener in &listeners {
            listener(&payload);
        }
        listeners.len()
    }
}

impl ElementHost for Page {
    fn bind(&self, event: &str, selector: Option<&str>, namespace: &str, listener: HostListener) {
        self.bindings.borrow_mut().push((
            event.to_string(),
            selector.map(str::to_string),
            namespace.to_string(),
            listener,
        ));
    }

    fn unbind_namespace(&self, namespace: &str) {
        self.bindings.borrow_mut().retain(|(_, _, ns, _)| *ns != namespace);
    }

    fn detach(&self) {
        *self.detached.borrow_mut() = true;
    }
}

fn toggle_handler() -> ViewHandler {
    Rc::new(|view: &View, _: &serde_json::Value| {
        if let Some(record) = view.record() {
            let done = record.get("done").and_then(|v| v.as_bool()).unwrap_or(false);
            record
                .set_one("done", !done, &SetOptions::default())
                .unwrap();
        }
    })
}

#[test]
fn delegated_handlers_drive_the_record() {
    let page = Rc::new(Page::default());
    let record = Record::new(vertebra::RecordConfig::new("todo"), attrs! { "done" => false });
    let view = View::new(
        page.clone(),
        Some(record.clone()),
        None,
        [("click .toggle".to_string(), toggle_handler())],
    );

    assert_eq!(page.dispatch("click", Some(".toggle"), serde_json::Value::Null), 1);
    assert_eq!(record.get("done"), Some(Value::from(true)));
    assert_eq!(page.dispatch("click", None, serde_json::Value::Null), 0);
    drop(view);
    assert_eq!(page.dispatch("click", Some(".toggle"), serde_json::Value::Null), 1);
    assert_eq!(record.get("done"), Some(Value::from(true)));
}

#[test]
fn views_sharing_an_element_keep_their_own_bindings() {
    let page = Rc::new(Page::default());
    let noop: ViewHandler = Rc::new(|_: &View, _: &serde_json::Value| {});
    let first = View::new(page.clone(), None, None, [("keyup".to_string(), noop.clone())]);
    let second = View::new(page.clone(), None, None, [("keyup".to_string(), noop)]);
    assert_ne!(first.namespace(), second.namespace());

    first.undelegate_events();
    assert_eq!(page.dispatch("keyup", None, serde_json::Value::Null), 1);
    second.undelegate_events();
    assert_eq!(page.dispatch("keyup", None, serde_json::Value::Null), 0);
}

#[test]
fn remove_releases_record_subscriptions() {
    let page = Rc::new(Page::default());
    let record = Record::new(vertebra::RecordConfig::new("todo"), attrs! { "title" => "a" });
    let set = plain_set("todos");
    let view = View::new(page.clone(), Some(record.clone()), Some(set.clone()), Vec::new());
    let log = new_log();

    let sink = log.clone();
    view.listen_to(
        &record,
        "change:title",
        Callback::new(move |_: &str, event: &RecordEvent| {
            sink.borrow_mut().push(format!("{:?}", event.attribute_change()));
        }),
    );
    let sink = log.clone();
    view.listen_to(
        &set,
        "add",
        Callback::new(move |name: &str, _: &vertebra::SetEvent| sink.borrow_mut().push(name.to_string())),
    );

    record.set_one("title", "b", &SetOptions::default()).unwrap();
    set.add([attrs! { "id" => 1 }], &Default::default());
    assert_eq!(
        entries(&log),
        vec![r#"Some(("title", Some(Text("b"))))"#, "add"]
    );

    view.remove();
    assert!(*page.detached.borrow());
    record.set_one("title", "c", &SetOptions::default()).unwrap();
    set.add([attrs! { "id" => 2 }], &Default::default());
    assert_eq!(entries(&log).len(), 2);
    assert!(!record.events().has_listeners(Some("change:title")));
}

#[test]
fn views_emit_their_own_events() {
    let page = Rc::new(Page::default());
    let view = View::new(page, None, None, Vec::new());
    let log = new_log();
    let sink = log.clone();
    view.on(
        "selected",
        Callback::new(move |_: &str, payload: &serde_json::Value| sink.borrow_mut().push(payload.to_string())),
    );
    view.trigger("selected", &serde_json::json!({ "index": 2 }));
    assert_eq!(entries(&log), vec![r#"{"index":2}"#]);
}
