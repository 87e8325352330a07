//! Request command - shows the HTTP request a sync call maps to.

use std::fs;

use vertebra::{
    HttpRequest, Record, RecordConfig, SyncConfig, SyncOptions, SyncTarget, Verb,
    sync::RequestBody, value::attributes_from_json,
};

use crate::cli::RequestArgs;
use crate::output::{OutputFormat, print_json, print_table};

fn load_config(args: &RequestArgs) -> Result<SyncConfig, Box<dyn std::error::Error>> {
    match &args.config {
        None => Ok(SyncConfig::default()),
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
            Ok(serde_json::from_str(&text)?)
        }
    }
}

/// Run the request command
pub fn run(args: &RequestArgs, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let verb: Verb = args.verb.parse()?;
    let config = load_config(args)?;
    let attributes = match &args.body {
        None => None,
        Some(body) => {
            let json: serde_json::Value = serde_json::from_str(body)?;
            Some(attributes_from_json(&json).ok_or("--body must be a JSON object")?)
        }
    };

    let target = SyncTarget::Record(Record::new(
        RecordConfig::new("record"),
        attributes.clone().unwrap_or_default(),
    ));
    let options = SyncOptions::new()
        .with_url(Some(args.url.clone()))
        .with_attrs(attributes);
    let request = HttpRequest::build(verb, &target, &options, config)?;
    tracing::debug!(%verb, %request, ?config, "built request");

    match format {
        OutputFormat::Human => {
            println!("{request}");
            let mut rows = Vec::new();
            if let Some(content_type) = request.content_type {
                rows.push(vec!["Content-Type".to_string(), content_type.to_string()]);
            }
            for (name, value) in &request.headers {
                rows.push(vec![name.clone(), value.clone()]);
            }
            print_table(&["HEADER", "VALUE"], &rows);
            match &request.body {
                None => {}
                Some(RequestBody::Json(json)) => {
                    println!();
                    println!("{json}");
                }
                Some(RequestBody::Form(fields)) => {
                    println!();
                    let rows: Vec<Vec<String>> = fields
                        .iter()
                        .map(|(name, value)| vec![name.clone(), value.clone()])
                        .collect();
                    print_table(&["FIELD", "VALUE"], &rows);
                }
            }
        }
        OutputFormat::Json => print_json(&request)?,
    }

    Ok(())
}
