//! Output formatting for `workgraph`.
//!
//! Supports both human-readable text output and machine-parseable JSON.
//! JSON goes to stdout untouched; diagnostics go to stderr.
//!
//! # JSON Output Types
//!
//! - [`ItemWithCounts`] - Record with its dependency count (list)
//! - [`ErrorReport`] - Error envelope written to stderr in JSON mode

mod output;
mod text;

pub use output::{ErrorReport, ItemWithCounts, Output};
pub use text::{
    format_dependency, format_event_line, format_item_line, format_project_line,
    format_status_icon, render_detail, render_project_detail, render_updated,
};
