//! Output formatting utilities
//!
//! Formatters for human-readable and JSON output, the batch progress bar
//! and the failure table printed after partially failed batches.

mod formatter;
mod progress;
mod table;

pub use formatter::Formatter;
pub use progress::ProgressBar;
pub use table::failure_table;

/// Output configuration derived from CLI flags and config defaults
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Use JSON output format
    pub json: bool,
    /// Disable colored output
    pub no_color: bool,
    /// Disable progress bar
    pub no_progress: bool,
    /// Suppress non-error output
    pub quiet: bool,
}
