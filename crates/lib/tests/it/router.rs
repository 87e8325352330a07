use std::rc::Rc;

use vertebra::{
    Callback, History, HistoryOptions, Location, MemoryLocation, NavigateOptions, Observable, Observation,
    RouteEvent, Router,
};

use crate::helpers::{entries, new_log, record_names};

fn app(url: &str) -> (Rc<MemoryLocation>, Router) {
    let location = Rc::new(MemoryLocation::new(url));
    let history = History::new(location.clone());
    let router = Router::with_routes(
        history,
        [
            ("search/:query/p:num", "search"),
            ("docs(/:section)", "docs"),
            ("files/*path", "files"),
            ("*path", "fallback"),
        ],
    )
    .unwrap();
    (location, router)
}

fn record_params(router: &Router) -> crate::helpers::Log {
    let log = new_log();
    let sink = log.clone();
    router.on(
        "route",
        Callback::new(move |_: &str, event: &RouteEvent| {
            sink.borrow_mut()
                .push(format!("{} {:?}", event.name, event.params));
        }),
    );
    log
}

#[test]
fn the_initial_hash_is_routed_on_start() {
    let (_location, router) = app("/#search/cats/p2");
    let log = record_params(&router);
    assert!(router.history().start(HistoryOptions::default()).unwrap());
    assert_eq!(
        entries(&log),
        vec![r#"search [Some("cats"), Some("2")]"#]
    );
    assert_eq!(router.history().observation(), Observation::HashChange);
}

#[test]
fn optional_parts_and_splats() {
    let (location, router) = app("/");
    let log = record_params(&router);
    router.history().start(HistoryOptions::default()).unwrap();

    for hash in ["docs", "docs/setup", "files/a%20b/c.txt", "anything/else"] {
        location.visit(&format!("/#{hash}"));
        assert!(router.history().check_url());
    }
    assert_eq!(
        entries(&log),
        vec![
            r#"fallback [None]"#,
            r#"docs [None]"#,
            r#"docs [Some("setup")]"#,
            r#"files [Some("a b/c.txt")]"#,
            r#"fallback [Some("anything/else")]"#,
        ]
    );
}

#[test]
fn navigation_updates_the_location_and_optionally_routes() {
    let (location, router) = app("/");
    let names = record_names(&router, "route:docs route:search");
    router
        .history()
        .start(HistoryOptions {
            silent: true,
            ..HistoryOptions::default()
        })
        .unwrap();

    assert!(router.navigate("docs/api", NavigateOptions::default()));
    assert!(entries(&names).is_empty());
    assert_eq!(location.url(), "/#docs/api");

    assert!(router.navigate("search/dogs/p1", NavigateOptions::trigger()));
    assert_eq!(entries(&names), vec!["route:search"]);

    assert!(!router.navigate("#search/dogs/p1", NavigateOptions::trigger()));
    assert_eq!(location.entries(), vec!["/#docs/api", "/#search/dogs/p1"]);
}

#[test]
fn push_state_routes_read_the_path_below_the_root() {
    let location = Rc::new(MemoryLocation::new("/shop/search/lamps/p3?sort=asc"));
    let history = History::new(location.clone());
    let router = Router::new(history);
    let log = record_params(&router);
    router
        .route("search/:query/p:num", "search", |_| {})
        .unwrap();

    router
        .history()
        .start(HistoryOptions {
            root: "shop".into(),
            push_state: true,
            ..HistoryOptions::default()
        })
        .unwrap();
    assert_eq!(router.history().root(), "/shop/");
    assert_eq!(
        entries(&log),
        vec![r#"search [Some("lamps"), Some("3")]"#]
    );

    router.navigate("search/desks/p1", NavigateOptions::default());
    assert_eq!(location.pathname(), "/shop/search/desks/p1");
}

#[test]
fn history_announces_every_route() {
    let (_location, router) = app("/#docs");
    let seen = new_log();
    let sink = seen.clone();
    let expected = router.clone();
    router.history().on(
        "route",
        Callback::new(move |_: &str, event: &RouteEvent| {
            assert!(event.router.ptr_eq(&expected));
            sink.borrow_mut().push(event.fragment.clone());
        }),
    );
    router.history().start(HistoryOptions::default()).unwrap();
    assert_eq!(entries(&seen), vec!["docs"]);
}

#[test]
fn unmatched_fragments_report_false() {
    let location = Rc::new(MemoryLocation::new("/#nowhere"));
    let router = Router::with_routes(History::new(location), [("docs", "docs")]).unwrap();
    assert!(!router.history().start(HistoryOptions::default()).unwrap());
    assert_eq!(router.history().current_fragment().as_deref(), Some("nowhere"));
}

#[test]
fn a_stopped_history_ignores_navigation() {
    let (location, router) = app("/");
    router.history().start(HistoryOptions::default()).unwrap();
    router.history().stop();
    assert!(!router.navigate("docs", NavigateOptions::trigger()));
    assert!(location.entries().is_empty());
    assert_eq!(router.history().observation(), Observation::Stopped);
}
