//! Progress bar for batch operations

use selstore_core::{BatchProgress, Result};

use super::OutputConfig;

/// Progress bar counting finished batch items
///
/// In quiet or JSON mode, progress is suppressed.
#[derive(Debug, Clone)]
pub struct ProgressBar {
    bar: Option<indicatif::ProgressBar>,
}

impl ProgressBar {
    pub fn new(config: &OutputConfig, total: u64, verb: &str) -> Self {
        let bar = if config.quiet || config.json || config.no_progress || total < 2 {
            None
        } else {
            let bar = indicatif::ProgressBar::new(total);
            if let Ok(style) = indicatif::ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            {
                bar.set_style(style.progress_chars("#>-"));
            }
            bar.set_message(verb.to_string());
            Some(bar)
        };

        Self { bar }
    }

    pub fn finish_and_clear(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }

    pub fn is_visible(&self) -> bool {
        self.bar.is_some()
    }

    pub fn position(&self) -> u64 {
        self.bar.as_ref().map(|b| b.position()).unwrap_or(0)
    }
}

impl BatchProgress for ProgressBar {
    fn on_item(&self, name: &str, result: &Result<()>) {
        let Some(bar) = &self.bar else {
            return;
        };
        if let Err(e) = result {
            bar.println(format!("✗ {name}: {e}"));
        }
        bar.inc(1);
    }
}
