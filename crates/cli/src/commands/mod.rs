//! CLI command definitions and execution

use clap::{Parser, Subcommand};
use serde::Serialize;
use selstore_core::{Account, AccountManager, BatchReport, Config, ConfigManager, Error, Result};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, failure_table};

pub mod account;
pub mod completions;
pub mod ln;
pub mod put;
pub mod rm;
pub mod share;

/// selstore - Selectel / Swift object storage client
///
/// Batch uploads and deletes with checksum verification, symlinks and
/// signed download links.
#[derive(Parser, Debug)]
#[command(name = "selstore")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress bar
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage storage accounts
    #[command(subcommand)]
    Account(account::AccountCommands),

    /// Upload files
    Put(put::PutArgs),

    /// Remove objects
    Rm(rm::RmArgs),

    /// Create a symlink object
    Ln(ln::LnArgs),

    /// Generate a signed download link
    Share(share::ShareArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let config = match ConfigManager::new().and_then(|m| m.load()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: failed to load configuration: {e}");
            return ExitCode::from_error(&e);
        }
    };
    let output_config = output_config(&cli, &config);

    match cli.command {
        Commands::Account(cmd) => account::execute(cmd, output_config).await,
        Commands::Put(args) => put::execute(args, &config, output_config).await,
        Commands::Rm(args) => rm::execute(args, &config, output_config).await,
        Commands::Ln(args) => ln::execute(args, output_config).await,
        Commands::Share(args) => share::execute(args, &config, output_config).await,
        Commands::Completions(args) => completions::execute(args),
    }
}

/// Command-line flags win over the configured defaults
fn output_config(cli: &Cli, config: &Config) -> OutputConfig {
    let defaults = &config.defaults;
    OutputConfig {
        json: cli.json || defaults.output == "json",
        no_color: cli.no_color || defaults.color == "never",
        no_progress: cli.no_progress || !defaults.progress,
        quiet: cli.quiet,
    }
}

/// Look up a configured account, reporting failures through `formatter`
pub(crate) fn load_account(
    name: &str,
    formatter: &Formatter,
) -> std::result::Result<Account, ExitCode> {
    let manager = AccountManager::new().map_err(|e| formatter.fail("Failed to load accounts", &e))?;
    match manager.get(name) {
        Ok(account) => Ok(account),
        Err(Error::AccountNotFound(_)) => {
            formatter.error(&format!("Account '{name}' not found"));
            Err(ExitCode::NotFound)
        }
        Err(e) => Err(formatter.fail("Failed to load accounts", &e)),
    }
}

#[derive(Debug, Serialize)]
struct BatchOutput {
    status: &'static str,
    total: usize,
    succeeded: Vec<String>,
    failed: Vec<FailedItem>,
}

#[derive(Debug, Serialize)]
struct FailedItem {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    error: String,
}

impl FailedItem {
    fn new(name: &str, error: &Error) -> Self {
        Self {
            name: name.to_string(),
            status: error.status(),
            error: error.to_string(),
        }
    }
}

/// Per-item outcome of a batch, flattened for output
struct BatchSummary {
    total: usize,
    succeeded: Vec<String>,
    failed: Vec<(String, Error)>,
}

impl BatchSummary {
    /// Split a batch result into succeeded and failed names
    ///
    /// `ignore` marks failures that count as success (e.g. `rm --force`
    /// treating missing objects as removed).
    fn new(result: Result<BatchReport>, ignore: impl Fn(&Error) -> bool) -> Result<Self> {
        let (total, mut succeeded, failed) = match result {
            Ok(report) => {
                let total = report.len();
                let mut succeeded = Vec::new();
                let mut failed = Vec::new();
                for outcome in report.into_outcomes() {
                    match outcome.result {
                        Ok(()) => succeeded.push(outcome.name),
                        Err(e) => failed.push((outcome.name, e)),
                    }
                }
                (total, succeeded, failed)
            }
            Err(Error::Batch(failure)) => (
                failure.total,
                failure.succeeded,
                failure
                    .failures
                    .into_iter()
                    .map(|f| (f.name, f.error))
                    .collect::<Vec<_>>(),
            ),
            Err(e) => return Err(e),
        };

        let (ignored, failed): (Vec<_>, Vec<_>) = failed.into_iter().partition(|(_, e)| ignore(e));
        succeeded.extend(ignored.into_iter().map(|(name, _)| name));
        Ok(Self {
            total,
            succeeded,
            failed,
        })
    }

    fn output(&self) -> BatchOutput {
        BatchOutput {
            status: if self.failed.is_empty() { "success" } else { "partial" },
            total: self.total,
            succeeded: self.succeeded.clone(),
            failed: self.failed.iter().map(|(n, e)| FailedItem::new(n, e)).collect(),
        }
    }
}

/// Print the outcome of a batch and pick the exit code
pub(crate) fn report_batch(
    formatter: &Formatter,
    past_tense: &str,
    result: Result<BatchReport>,
    ignore: impl Fn(&Error) -> bool,
) -> ExitCode {
    let summary = match BatchSummary::new(result, ignore) {
        Ok(summary) => summary,
        Err(e) => return formatter.fail("Batch failed", &e),
    };
    let total = summary.total;
    let done = total - summary.failed.len();

    if formatter.is_json() {
        formatter.json(&summary.output());
    } else if summary.failed.is_empty() {
        formatter.success(&format!("{past_tense} {done} object(s)."));
    } else {
        let rows = summary.failed.iter().map(|(n, e)| (n.as_str(), e));
        formatter.println(&failure_table(rows).to_string());
        formatter.warning(&format!(
            "{} of {total} operation(s) failed, {done} succeeded",
            summary.failed.len()
        ));
    }

    batch_exit_code(summary.failed.iter().map(|(_, e)| e))
}

/// Exit code shared by every failure, or a general error if they differ
fn batch_exit_code<'a>(errors: impl IntoIterator<Item = &'a Error>) -> ExitCode {
    let mut codes = errors.into_iter().map(ExitCode::from_error);
    match codes.next() {
        None => ExitCode::Success,
        Some(first) if codes.all(|c| c == first) => first,
        Some(_) => ExitCode::GeneralError,
    }
}
