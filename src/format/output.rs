use anyhow::Result;
use serde::Serialize;
use workgraph_core::{ErrorKind, WorkItem, WorkflowError};

/// Where and how a command writes its result.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    /// Write `value` as pretty JSON, or run `text` to produce lines.
    ///
    /// Quiet mode suppresses text output but never JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else if !self.quiet {
            let rendered = text();
            if !rendered.is_empty() {
                println!("{rendered}");
            }
        }
        Ok(())
    }
}

/// Record with counts for list views.
#[derive(Debug, Clone, Serialize)]
pub struct ItemWithCounts<R> {
    #[serde(flatten)]
    pub record: R,
    pub dependency_count: usize,
}

impl<R: WorkItem> ItemWithCounts<R> {
    #[must_use]
    pub fn new(record: R) -> Self {
        let dependency_count = record.depends_on().len();
        Self {
            record,
            dependency_count,
        }
    }
}

/// Error envelope for JSON mode.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub kind: &'static str,
    pub message: String,
    pub exit_code: i32,
}

impl ErrorReport {
    #[must_use]
    pub fn from_workflow(err: &WorkflowError) -> Self {
        Self {
            kind: err.kind().as_str(),
            message: err.to_string(),
            exit_code: err.exit_code(),
        }
    }

    #[must_use]
    pub fn system(message: String) -> Self {
        Self {
            kind: ErrorKind::System.as_str(),
            message,
            exit_code: workgraph_core::exit_codes::SYSTEM_ERROR,
        }
    }
}
