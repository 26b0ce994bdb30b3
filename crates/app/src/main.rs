use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

mod commands;
mod loader;
mod store;

use store::Store;

#[derive(Parser)]
#[command(name = "tally", version, about = "Sort bank exports into categories with ordered rules")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a CSV or XLSX export into the workspace
    Import {
        path: PathBuf,
        /// Treat the first row as data instead of headers
        #[arg(long)]
        no_headers: bool,
        /// Display name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
    },
    /// List loaded files and their column mappings
    Files,
    /// Drop a loaded file (by name or id)
    Remove { file: String },
    /// Rename a loaded file
    Rename { file: String, name: String },
    /// Assign column meanings for one file
    Map(MapArgs),
    /// Manage classification rules
    #[command(subcommand)]
    Rules(RulesCommand),
    /// Recompute and classify every transaction
    Apply {
        /// Print the transactions as JSON instead of a listing
        #[arg(long)]
        json: bool,
    },
    /// Export or import the rule configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Drop all loaded files, rules, and computed transactions
    Reset,
}

#[derive(Args)]
struct MapArgs {
    /// File to remap (by name or id)
    file: String,
    /// Column index of the date
    #[arg(long)]
    date: Option<usize>,
    /// Date layout: YYYY-MM-DD, DD-MM-YYYY, MM-DD-YYYY, YYYYMMDD,
    /// DDMMYYYY, MMDDYYYY, DD/MM/YYYY or MM/DD/YYYY
    #[arg(long)]
    date_format: Option<String>,
    /// Column index of the amount
    #[arg(long)]
    amount: Option<usize>,
    /// Decimal separator: '.' or ','
    #[arg(long)]
    decimal: Option<String>,
    /// Comma-separated column indices joined into the description
    #[arg(long, value_delimiter = ',')]
    description: Option<Vec<usize>>,
    /// Whether the first row is a header row
    #[arg(long)]
    headers: Option<bool>,
}

#[derive(Subcommand)]
enum RulesCommand {
    /// Append a new rule with placeholder code
    Add,
    /// Show all rules in precedence order
    List,
    /// Edit a rule's labels or predicate code
    Set {
        id: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        subcategory: Option<String>,
        #[arg(long)]
        code: Option<String>,
    },
    /// Delete a rule
    Remove { id: String },
    /// Move a rule to a new position (0 = highest precedence)
    Move { id: String, to: usize },
    /// Recompile every rule and report diagnostics
    Validate,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Write the rule config as JSON (stdout unless --out is given)
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replace the entire rule list with an exported config
    Import { path: PathBuf },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = Store::open_default()?;
    let mut session = store.load()?;
    commands::run(cli.command, &mut session, &store)
}
