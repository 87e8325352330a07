//! Reconcile command - replays a set reconciliation and reports what happened.

use std::{cell::RefCell, fs, path::Path, rc::Rc};

use vertebra::{
    Attributes, Callback, Comparator, Observable, ReconcileOptions, Record, RecordConfig,
    RecordSet, SetConfig, SetEvent, value::attributes_from_json,
};

use crate::cli::ReconcileArgs;
use crate::output::{OutputFormat, print_json, print_table};

/// Reads a JSON array of objects.
fn load_records(path: &Path) -> Result<Vec<Attributes>, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&text)?;
    let Some(items) = json.as_array() else {
        return Err(format!("{} must contain a JSON array", path.display()).into());
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            attributes_from_json(item)
                .ok_or_else(|| format!("{}: item {i} is not an object", path.display()).into())
        })
        .collect()
}

/// Server id when assigned, else the client id.
fn label(record: &Record) -> String {
    record
        .id_key()
        .unwrap_or_else(|| record.cid().to_string())
}

/// Run the reconcile command
pub fn run(args: &ReconcileArgs, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let current = load_records(&args.current)?;
    let incoming = load_records(&args.incoming)?;

    let mut config = SetConfig::new(
        "cli",
        RecordConfig::new("record").with_id_attribute(args.id_attribute.clone()),
    );
    if let Some(attribute) = &args.comparator {
        config = config.with_comparator(Comparator::attribute(attribute.clone()));
    }
    let set = RecordSet::with_records(config, current);

    let log: Rc<RefCell<Vec<(String, String)>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    set.on(
        "all",
        Callback::new(move |name: &str, event: &SetEvent| {
            let subject = event.record().map_or_else(|| "-".to_string(), label);
            sink.borrow_mut().push((name.to_string(), subject));
        }),
    );

    let options = ReconcileOptions::default()
        .with_add(!args.no_add)
        .with_remove(!args.no_remove)
        .with_merge(!args.no_merge);
    set.set(incoming, &options);
    tracing::debug!(events = log.borrow().len(), members = set.len(), "reconciled");

    let events = log.borrow();
    match format {
        OutputFormat::Human => {
            if events.is_empty() {
                println!("No events.");
            } else {
                let rows: Vec<Vec<String>> = events
                    .iter()
                    .map(|(name, subject)| vec![name.clone(), subject.clone()])
                    .collect();
                print_table(&["EVENT", "RECORD"], &rows);
            }
            println!();
            let rows: Vec<Vec<String>> = set
                .records()
                .iter()
                .map(|record| vec![label(record), record.to_json().to_string()])
                .collect();
            if rows.is_empty() {
                println!("The set is empty.");
            } else {
                print_table(&["RECORD", "ATTRIBUTES"], &rows);
            }
        }
        OutputFormat::Json => {
            let events: Vec<serde_json::Value> = events
                .iter()
                .map(|(name, subject)| serde_json::json!({ "event": name, "record": subject }))
                .collect();
            print_json(&serde_json::json!({
                "events": events,
                "members": set.to_json(),
            }))?;
        }
    }

    Ok(())
}
