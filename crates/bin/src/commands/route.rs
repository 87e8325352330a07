//! Route matching command - shows the decoded parameters of a fragment.

use vertebra::RoutePattern;

use crate::cli::RouteArgs;
use crate::output::{OutputFormat, print_json, print_table};

/// Run the route command
pub fn run(args: &RouteArgs, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let pattern = RoutePattern::compile(&args.pattern)?;
    let fragment = args.fragment.trim_start_matches(['#', '/']).trim_end();
    let params = pattern.extract(fragment);
    tracing::debug!(pattern = %pattern, %fragment, matched = params.is_some(), "matched route");

    match format {
        OutputFormat::Human => match &params {
            None => println!("No match for '{fragment}'."),
            Some(params) if params.is_empty() => println!("Matched '{fragment}' (no parameters)."),
            Some(params) => {
                let rows: Vec<Vec<String>> = params
                    .iter()
                    .enumerate()
                    .map(|(i, value)| {
                        vec![
                            i.to_string(),
                            value.clone().unwrap_or_else(|| "-".to_string()),
                        ]
                    })
                    .collect();
                print_table(&["#", "VALUE"], &rows);
            }
        },
        OutputFormat::Json => print_json(&serde_json::json!({
            "pattern": pattern.as_str(),
            "fragment": fragment,
            "matched": params.is_some(),
            "params": params,
        }))?,
    }

    if params.is_none() {
        return Err(format!("fragment '{fragment}' does not match '{pattern}'").into());
    }
    Ok(())
}
