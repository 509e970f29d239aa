//! Failure table for partially failed batches

use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{ContentArrangement, Table};
use selstore_core::Error;

/// One row per failed item: object, HTTP status (if any) and error
pub fn failure_table<'a>(failed: impl IntoIterator<Item = (&'a str, &'a Error)>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Object", "Status", "Error"]);

    for (name, error) in failed {
        let status = error
            .status()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".into());
        table.add_row(vec![name.to_string(), status, error.to_string()]);
    }
    table
}
