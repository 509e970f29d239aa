//! rm command - Remove objects
//!
//! Removes one or more objects of one container as a single batch.

use clap::Args;
use selstore_core::{BatchMode, Config, Error, FileDescriptor, RemotePath, parse_remote_path};

use super::{load_account, report_batch};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, ProgressBar};

/// Remove objects
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Object paths to remove (account/container/object), all in one container
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Treat objects that are already gone as removed
    #[arg(short, long)]
    pub force: bool,

    /// Report per-object failures instead of failing the whole batch
    #[arg(long)]
    pub best_effort: bool,

    /// Parallel deletes (default from config)
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Only show what would be deleted
    #[arg(long)]
    pub dry_run: bool,
}

/// Execute the rm command
pub async fn execute(args: RmArgs, config: &Config, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let paths = match parse_paths(&args.paths) {
        Ok(paths) => paths,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::UsageError;
        }
    };
    let first = &paths[0];

    if args.dry_run {
        for path in &paths {
            formatter.println(&format!("Would remove: {path}"));
        }
        return ExitCode::Success;
    }

    let account = match load_account(&first.account, &formatter) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let container = match selstore_swift::container(&account, &first.container) {
        Ok(c) => c,
        Err(e) => return formatter.fail("Invalid public URL", &e),
    };

    let files: Vec<FileDescriptor> = paths
        .iter()
        .map(|p| FileDescriptor::remote(p.object.as_str()))
        .collect();
    let progress = ProgressBar::new(formatter.config(), files.len() as u64, "removing");
    let service = match selstore_swift::connect(&account) {
        Ok(s) => s
            .with_concurrency(args.concurrency.unwrap_or(config.defaults.concurrency))
            .with_progress(std::sync::Arc::new(progress.clone())),
        Err(e) => return formatter.fail("Failed to create client", &e),
    };

    let result = service
        .delete_files(&container, files, BatchMode::from_strict(!args.best_effort))
        .await;
    progress.finish_and_clear();

    let force = args.force;
    report_batch(&formatter, "Removed", result, |e| force && e.is_not_found())
}

/// Parse every path and require them to share account and container
fn parse_paths(raw: &[String]) -> Result<Vec<RemotePath>, Error> {
    let mut paths = Vec::with_capacity(raw.len());
    for path in raw {
        let parsed = parse_remote_path(path)?;
        parsed.require_object()?;
        paths.push(parsed);
    }

    if let Some(first) = paths.first() {
        if let Some(other) = paths
            .iter()
            .find(|p| p.account != first.account || p.container != first.container)
        {
            return Err(Error::InvalidPath(format!(
                "All paths must be in one container: {} and {}",
                first, other
            )));
        }
    } else {
        return Err(Error::InvalidPath("No paths given".into()));
    }
    Ok(paths)
}
