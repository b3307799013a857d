//! Transform handlers, one module per editing feature.
//!
//! A handler takes validated parameters plus a snapshot of the session's
//! documents or videos and returns a [`HandlerOutput`]. Handlers never touch
//! the session. A failure on one item is recorded in
//! [`HandlerOutput::failures`] and the batch moves on to the next item.
//!
//! Document handlers are blocking (they drive the [`crate::codec`] backend)
//! and run on a blocking worker. Video handlers are async.

pub mod delete;
pub mod insert;
pub mod rename;
pub mod replace;
pub mod thumbnail;
pub mod video;
pub mod watermark;

use crate::config::EngineConfig;
use crate::error::ItemError;
use crate::progress::{BatchProgressCallback, NoopBatchProgress};
use crate::transport::Reply;
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

/// One produced file.
#[derive(Clone, PartialEq, Eq)]
pub struct OutputItem {
    pub name: String,
    pub bytes: Vec<u8>,
    pub caption: Option<String>,
}

impl fmt::Debug for OutputItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputItem")
            .field("name", &self.name)
            .field("bytes", &self.bytes.len())
            .field("caption", &self.caption)
            .finish()
    }
}

/// Result of one handler invocation over a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandlerOutput {
    pub items: Vec<OutputItem>,
    pub failures: Vec<ItemError>,
    /// Per-item messages that are neither output nor failure (e.g. "no match").
    pub notices: Vec<String>,
}

/// Serialisable summary of a batch, without file contents.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport<'a> {
    pub operation: &'a str,
    pub succeeded: Vec<&'a str>,
    pub failed: &'a [ItemError],
    pub notices: &'a [String],
}

impl HandlerOutput {
    /// Whether at least one item failed.
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn report<'a>(&'a self, operation: &'a str) -> BatchReport<'a> {
        BatchReport {
            operation,
            succeeded: self.items.iter().map(|i| i.name.as_str()).collect(),
            failed: &self.failures,
            notices: &self.notices,
        }
    }

    /// Files first, then notices, then a summary naming what succeeded and
    /// what failed.
    pub fn into_replies(self) -> Vec<Reply> {
        let summary = self.summary();
        let mut replies: Vec<Reply> = self
            .items
            .into_iter()
            .map(|item| Reply::File {
                bytes: item.bytes,
                filename: item.name,
                caption: item.caption,
            })
            .collect();
        replies.extend(self.notices.into_iter().map(Reply::Text));
        replies.push(Reply::text(summary));
        replies
    }

    fn summary(&self) -> String {
        let mut lines = Vec::new();
        if self.items.is_empty() && self.failures.is_empty() {
            lines.push("✅ Done. No files were produced.".to_string());
        } else if self.failures.is_empty() {
            lines.push(format!("✅ Done: {} file(s) processed.", self.items.len()));
        } else {
            lines.push(format!(
                "⚠️ Partially done: {} succeeded, {} failed.",
                self.items.len(),
                self.failures.len()
            ));
        }
        for item in &self.items {
            lines.push(format!("  ✔ {}", item.name));
        }
        for failure in &self.failures {
            lines.push(format!("  ✘ {}", failure));
        }
        lines.join("\n")
    }
}

/// What one item produced.
pub(crate) enum ItemOutcome {
    Output(OutputItem),
    Notice(String),
}

/// Per-item bookkeeping shared by every handler: progress callbacks,
/// failure collection and logging.
pub(crate) struct Batch<'a> {
    operation: &'static str,
    progress: &'a dyn BatchProgressCallback,
    total: usize,
    succeeded: usize,
    output: HandlerOutput,
}

impl<'a> Batch<'a> {
    pub(crate) fn start(config: &'a EngineConfig, operation: &'static str, total: usize) -> Self {
        let progress = config
            .progress_callback
            .as_deref()
            .unwrap_or(&NoopBatchProgress as &dyn BatchProgressCallback);
        info!("{}: starting batch of {} item(s)", operation, total);
        progress.on_batch_start(operation, total);
        Self {
            operation,
            progress,
            total,
            succeeded: 0,
            output: HandlerOutput::default(),
        }
    }

    /// `index` is 0-based.
    pub(crate) fn begin(&self, index: usize, name: &str) {
        self.progress.on_item_start(index + 1, self.total, name);
    }

    pub(crate) fn finish(&mut self, index: usize, name: &str, result: Result<ItemOutcome, ItemError>) {
        match result {
            Ok(outcome) => {
                self.succeeded += 1;
                self.progress.on_item_complete(index + 1, self.total, name);
                match outcome {
                    ItemOutcome::Output(item) => self.output.items.push(item),
                    ItemOutcome::Notice(notice) => self.output.notices.push(notice),
                }
            }
            Err(err) => {
                warn!("{}: {} failed: {}", self.operation, name, err);
                self.progress
                    .on_item_error(index + 1, self.total, name, &err.to_string());
                self.output.failures.push(err);
            }
        }
    }

    pub(crate) fn end(self) -> HandlerOutput {
        info!(
            "{}: {}/{} item(s) succeeded",
            self.operation, self.succeeded, self.total
        );
        self.progress.on_batch_complete(self.total, self.succeeded);
        self.output
    }
}

/// Wrap a codec or decoding failure for `item`.
pub(crate) fn processing(item: &str, err: impl fmt::Display) -> ItemError {
    ItemError::Processing {
        item: item.to_string(),
        detail: err.to_string(),
    }
}
