//! Error types for the edgequake-docflow library.
//!
//! Failures are split by where they are recovered:
//!
//! * [`DocflowError`]: **Fatal** for one call into the library (bad config,
//!   the transport refused a reply, a worker task panicked). Returned as
//!   `Err(DocflowError)` from [`crate::workflow::Engine::handle`].
//!
//! * [`FlowError`]: raised and recovered inside the state machine. The
//!   operator sees the message; only [`FlowError::FatalSession`] changes the
//!   mode (it forces a reset to idle).
//!
//! * [`ItemError`]: **Non-fatal**: one document or video in a batch failed.
//!   Stored in [`crate::handlers::HandlerOutput::failures`] so the rest of the
//!   batch is still delivered.
//!
//! * [`CodecError`] / [`ToolError`]: raised by the document codec and the
//!   external video tool. Handlers fold them into [`ItemError`] at the
//!   per-item boundary.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-docflow library.
#[derive(Debug, Error)]
pub enum DocflowError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Transport errors ──────────────────────────────────────────────────
    /// The chat transport failed to deliver a reply.
    #[error("Transport failed to deliver a reply: {0}")]
    Transport(String),

    // ── Runtime errors ────────────────────────────────────────────────────
    /// A blocking worker task panicked or was cancelled.
    #[error("Worker task failed: {0}")]
    WorkerFailed(String),
}

/// Errors detected while advancing a workflow.
///
/// Always recovered at the point of detection; the `Display` text is what the
/// operator reads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// Malformed or out-of-range operator input. The mode is not advanced.
    #[error("❌ {0}")]
    Validation(String),

    /// The action needs state that is absent (e.g. no documents uploaded).
    #[error("❌ {0}")]
    Precondition(String),

    /// The session state disagrees with the transition table. The mode is
    /// force-reset to idle.
    #[error("⚠️ Session state was inconsistent ({0}). The operation was reset, please start it again.")]
    FatalSession(String),
}

/// A non-fatal error for a single document or video in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ItemError {
    /// Decoding, editing or encoding the item failed.
    #[error("{item}: {detail}")]
    Processing { item: String, detail: String },

    /// An external tool (ffmpeg) exited with an error.
    #[error("{item}: {tool} failed: {detail}")]
    ExternalTool {
        item: String,
        tool: String,
        detail: String,
    },

    /// An external tool did not finish within the bounded wait.
    #[error("{item}: timed out after {secs}s")]
    Timeout { item: String, secs: u64 },
}

impl ItemError {
    /// Name of the document or video this failure belongs to.
    pub fn item(&self) -> &str {
        match self {
            ItemError::Processing { item, .. }
            | ItemError::ExternalTool { item, .. }
            | ItemError::Timeout { item, .. } => item,
        }
    }
}

/// Failure of a whole handler invocation before any item was processed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// The uploaded image parameter could not be decoded.
    #[error("Could not read the uploaded image: {0}")]
    BadImage(String),
}

/// Errors raised by a [`crate::codec::DocumentCodec`].
#[derive(Debug, Error)]
pub enum CodecError {
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    BindingFailed(String),

    /// The bytes are not a readable PDF.
    #[error("Document could not be opened: {0}")]
    Load(String),

    /// Page index outside the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// Rasterising a page failed.
    #[error("Rasterisation failed for page {page}: {detail}")]
    Render { page: usize, detail: String },

    /// Applying an edit failed.
    #[error("Edit failed: {0}")]
    Edit(String),

    /// Serialising the edited document failed.
    #[error("Saving the document failed: {0}")]
    Save(String),
}

/// Errors raised by a [`crate::media::VideoMuxer`].
#[derive(Debug, Error)]
pub enum ToolError {
    /// The tool binary could not be started.
    #[error("could not start '{binary}': {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran and exited unsuccessfully.
    #[error("exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    /// The tool reported success but produced no output file.
    #[error("produced no output at '{path}'")]
    MissingOutput { path: PathBuf },

    /// Staging inputs or reading outputs failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
