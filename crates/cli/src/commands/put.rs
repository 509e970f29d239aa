//! put command - Upload files
//!
//! Uploads local files (glob patterns and, with -r, directories) into a
//! container as one checksum-verified batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use selstore_core::{BatchMode, Config, Error, FileDescriptor, RemotePath, parse_remote_path};
use serde::Serialize;

use super::{load_account, report_batch};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, ProgressBar};

/// Upload files
#[derive(Args, Debug)]
pub struct PutArgs {
    /// Local files, directories or glob patterns
    #[arg(required = true, num_args = 1..)]
    pub sources: Vec<String>,

    /// Destination: account/container[/name or prefix/]
    pub target: String,

    /// Upload directories recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Report per-file failures instead of failing the whole batch
    #[arg(long)]
    pub best_effort: bool,

    /// Parallel uploads (default from config)
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Content type for every uploaded file (default: guessed)
    #[arg(long)]
    pub content_type: Option<String>,

    /// Only show what would be uploaded
    #[arg(long)]
    pub dry_run: bool,
}

/// Local file and the object name it is uploaded as
#[derive(Debug, Clone, PartialEq, Eq)]
struct Planned {
    local: PathBuf,
    server_name: String,
}

#[derive(Debug, Serialize)]
struct DryRunOutput {
    status: &'static str,
    files: Vec<DryRunFile>,
}

#[derive(Debug, Serialize)]
struct DryRunFile {
    source: String,
    target: String,
}

/// Execute the put command
pub async fn execute(args: PutArgs, config: &Config, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let target = match parse_remote_path(&args.target) {
        Ok(p) => p,
        Err(e) => {
            formatter.error(&format!("Invalid target path: {e}"));
            return ExitCode::UsageError;
        }
    };

    let plan = match plan_uploads(&args.sources, &target, args.recursive) {
        Ok(plan) => plan,
        Err(e) => return formatter.fail("Cannot upload", &e),
    };

    if args.dry_run {
        print_dry_run(&formatter, &target, &plan);
        return ExitCode::Success;
    }

    let account = match load_account(&target.account, &formatter) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let mut files = Vec::with_capacity(plan.len());
    let mut total_bytes = 0;
    for item in &plan {
        let mut builder = FileDescriptor::builder(&item.server_name).path(&item.local);
        if let Some(content_type) = &args.content_type {
            builder = builder.content_type(content_type);
        }
        match builder.build().await {
            Ok(file) => {
                total_bytes += file.size().unwrap_or(0);
                files.push(file);
            }
            Err(e) => return formatter.fail(&format!("Failed to read {}", item.local.display()), &e),
        }
    }

    let container = match selstore_swift::container(&account, &target.container) {
        Ok(c) => c,
        Err(e) => return formatter.fail("Invalid public URL", &e),
    };
    let progress = ProgressBar::new(formatter.config(), files.len() as u64, "uploading");
    let service = match selstore_swift::connect(&account) {
        Ok(s) => s
            .with_concurrency(args.concurrency.unwrap_or(config.defaults.concurrency))
            .with_progress(Arc::new(progress.clone())),
        Err(e) => return formatter.fail("Failed to create client", &e),
    };

    tracing::info!(
        files = files.len(),
        bytes = total_bytes,
        concurrency = service.concurrency(),
        "uploading"
    );
    let result = service
        .upload_files(&container, files, BatchMode::from_strict(!args.best_effort))
        .await;
    progress.finish_and_clear();

    let code = report_batch(&formatter, "Uploaded", result, |_| false);
    if code == ExitCode::Success && !formatter.is_json() {
        formatter.println(&format!(
            "{} transferred to {}",
            humansize::format_size(total_bytes, humansize::BINARY),
            target
        ));
    }
    code
}

/// Resolve sources into (local file, object name) pairs
///
/// A single file uploaded to a non-prefix target takes the target's
/// object name; everything else is placed below the target prefix.
fn plan_uploads(sources: &[String], target: &RemotePath, recursive: bool) -> Result<Vec<Planned>, Error> {
    let mut found: Vec<(PathBuf, String)> = Vec::new();
    for source in sources {
        for path in expand_source(source)? {
            if path.is_dir() {
                if !recursive {
                    return Err(Error::InvalidPath(format!(
                        "{} is a directory. Use -r/--recursive to upload directories.",
                        path.display()
                    )));
                }
                let base = path.file_name().map(PathBuf::from).unwrap_or_default();
                for (file, relative) in walk_dir(&path)? {
                    found.push((file, join_relative(&base, &relative)));
                }
            } else if path.is_file() {
                let name = file_name(&path)?;
                found.push((path, name));
            } else {
                return Err(Error::InvalidPath(format!("Source not found: {}", path.display())));
            }
        }
    }

    let single_named = found.len() == 1 && !target.is_dir && sources.len() == 1;
    let plan = found
        .into_iter()
        .map(|(local, relative)| {
            let server_name = if single_named {
                target.object.clone()
            } else {
                target.join(&relative).object
            };
            Planned { local, server_name }
        })
        .collect();
    Ok(plan)
}

fn expand_source(source: &str) -> Result<Vec<PathBuf>, Error> {
    if !source.contains(['*', '?', '[']) {
        return Ok(vec![PathBuf::from(source)]);
    }

    let pattern =
        glob::glob(source).map_err(|e| Error::InvalidPath(format!("Bad pattern '{source}': {e}")))?;
    let mut paths = Vec::new();
    for entry in pattern {
        let path = entry.map_err(|e| Error::Io(e.into_error()))?;
        paths.push(path);
    }
    if paths.is_empty() {
        return Err(Error::InvalidPath(format!("No files match '{source}'")));
    }
    Ok(paths)
}

/// Every file below `dir` with its path relative to `dir`, sorted
fn walk_dir(dir: &Path) -> Result<Vec<(PathBuf, PathBuf)>, Error> {
    fn walk(dir: &Path, base: &Path, files: &mut Vec<(PathBuf, PathBuf)>) -> std::io::Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                walk(&path, base, files)?;
            } else if path.is_file() {
                let relative = path.strip_prefix(base).unwrap_or(&path).to_path_buf();
                files.push((path, relative));
            }
        }
        Ok(())
    }

    let mut files = Vec::new();
    walk(dir, dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn join_relative(base: &Path, relative: &Path) -> String {
    base.join(relative)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn file_name(path: &Path) -> Result<String, Error> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::InvalidPath(format!("{} has no file name", path.display())))
}

fn print_dry_run(formatter: &Formatter, target: &RemotePath, plan: &[Planned]) {
    let object = |p: &Planned| format!("{}/{}/{}", target.account, target.container, p.server_name);
    if formatter.is_json() {
        formatter.json(&DryRunOutput {
            status: "dry_run",
            files: plan
                .iter()
                .map(|p| DryRunFile {
                    source: p.local.display().to_string(),
                    target: object(p),
                })
                .collect(),
        });
    } else {
        for p in plan {
            formatter.println(&format!("Would upload: {} -> {}", p.local.display(), object(p)));
        }
    }
}
