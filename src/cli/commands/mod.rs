//! Command implementations, one module per top-level subcommand.

pub mod feature;
pub mod init;
pub mod issue;
pub mod project;
pub mod task;

use anyhow::Result;
use workgraph_core::WorkItem;

use crate::format::{ItemWithCounts, Output, format_item_line};

/// Print a list of records with a trailing count line.
pub(crate) fn print_records<R: WorkItem>(output: Output, records: Vec<R>, noun: &str) -> Result<()> {
    let rows: Vec<ItemWithCounts<R>> = records.into_iter().map(ItemWithCounts::new).collect();
    output.emit(&rows, || {
        if rows.is_empty() {
            return format!("No {noun}s found.");
        }
        let mut lines: Vec<String> = rows.iter().map(|row| format_item_line(&row.record)).collect();
        lines.push(format!("\n{} {noun}(s)", rows.len()));
        lines.join("\n")
    })
}

/// Print a freshly created record.
pub(crate) fn print_created<R: WorkItem>(output: Output, record: &R) -> Result<()> {
    output.emit(record, || {
        format!(
            "Created {}: {} [{}]",
            record.id(),
            record.base().name,
            record.status()
        )
    })
}
