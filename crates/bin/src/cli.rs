//! CLI argument definitions for the Vertebra binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

/// Inspect how Vertebra routes, reconciles and syncs
#[derive(Parser, Debug)]
#[command(name = "vertebra")]
#[command(about = "Vertebra: records, record sets and fragment routing from the command line")]
#[command(version)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Match a fragment against a route pattern and print its parameters
    Route(RouteArgs),
    /// Reconcile a set of records against an incoming payload
    Reconcile(ReconcileArgs),
    /// Print the HTTP request a sync call would issue
    Request(RequestArgs),
}

/// Arguments for the route command
#[derive(clap::Args, Debug)]
pub struct RouteArgs {
    /// Route pattern, e.g. `search/:query(/p:page)`
    pub pattern: String,

    /// Fragment to match, with or without a leading `#` or `/`
    pub fragment: String,
}

/// Arguments for the reconcile command
#[derive(clap::Args, Debug)]
pub struct ReconcileArgs {
    /// JSON array with the set's current members
    #[arg(long)]
    pub current: PathBuf,

    /// JSON array to reconcile the set against
    #[arg(long)]
    pub incoming: PathBuf,

    /// Keep the set ordered by this attribute
    #[arg(long)]
    pub comparator: Option<String>,

    /// Attribute holding each record's server identity
    #[arg(long, default_value = vertebra::constants::DEFAULT_ID_ATTRIBUTE, env = "VERTEBRA_ID_ATTRIBUTE")]
    pub id_attribute: String,

    /// Do not add records missing from the set
    #[arg(long)]
    pub no_add: bool,

    /// Do not remove members missing from the payload
    #[arg(long)]
    pub no_remove: bool,

    /// Do not merge attributes into existing members
    #[arg(long)]
    pub no_merge: bool,
}

/// Arguments for the request command
#[derive(clap::Args, Debug)]
pub struct RequestArgs {
    /// One of create, read, update, patch, delete
    pub verb: String,

    /// Request URL
    pub url: String,

    /// JSON object sent as the record's attributes
    #[arg(long)]
    pub body: Option<String>,

    /// JSON file with `emulate_http` / `emulate_json` switches
    #[arg(long, env = "VERTEBRA_SYNC_CONFIG")]
    pub config: Option<PathBuf>,
}
