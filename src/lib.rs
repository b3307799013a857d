//! # edgequake-docflow
//!
//! Multi-step PDF and video editing driven by a single chat operator.
//!
//! ## Why this crate?
//!
//! Editing a batch of PDFs from a phone usually means a desktop round-trip:
//! download, open an editor, watermark or redact, re-upload. This crate puts
//! the editor behind a chat. The operator uploads files, picks an operation
//! from a menu, answers one or two prompts, and gets the edited files back in
//! the conversation. The chat protocol stays outside the crate; anything that
//! can send text, files and button menus implements [`Transport`].
//!
//! ## Flow Overview
//!
//! ```text
//! Event (button / upload / text)
//!  │
//!  ├─ 1. Session   per-user state behind an async mutex (SessionStore)
//!  ├─ 2. Workflow  table-driven step: store input, prompt, or snapshot a Job
//!  ├─ 3. Replies   prompts and menus go out before any work starts
//!  ├─ 4. Handler   documents via pdfium (spawn_blocking), videos via ffmpeg
//!  └─ 5. Output    edited files, notices, then a ✔/✘ summary per item
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_docflow::{Engine, EngineConfig, Event, MenuOption, Transport, UserId};
//! use edgequake_docflow::DocflowError;
//!
//! struct Stdout;
//!
//! #[async_trait::async_trait]
//! impl Transport for Stdout {
//!     async fn reply(&self, text: &str) -> Result<(), DocflowError> {
//!         println!("{text}");
//!         Ok(())
//!     }
//!     async fn reply_with_file(&self, _: &[u8], name: &str, _: Option<&str>) -> Result<(), DocflowError> {
//!         println!("[file] {name}");
//!         Ok(())
//!     }
//!     async fn reply_with_menu(&self, text: &str, options: &[MenuOption]) -> Result<(), DocflowError> {
//!         println!("{text} ({} options)", options.len());
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Engine::with_default_backends(EngineConfig::default());
//!     engine.handle(UserId(42), Event::button("start"), &Stdout).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docflow` console binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when embedding the engine behind another transport:
//! ```toml
//! edgequake-docflow = { version = "0.1", default-features = false }
//! ```
//!
//! ## External tools
//!
//! | Concern | Backend | Located by |
//! |---------|---------|------------|
//! | PDF pages, text, editing | pdfium | `PDFIUM_LIB_PATH` or the system library |
//! | Info dictionary (thumbnail) | lopdf | built in |
//! | Video cover, burned caption | ffmpeg | `PATH` or [`FfmpegMuxer::new`] |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod codec;
pub mod config;
pub mod error;
pub mod handlers;
pub mod matcher;
pub mod media;
pub mod menu;
pub mod progress;
pub mod session;
pub mod transport;
pub mod workflow;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use codec::{DocumentCodec, PdfiumCodec};
pub use config::{EngineConfig, EngineConfigBuilder};
pub use error::{CodecError, DocflowError, FlowError, HandlerError, ItemError, ToolError};
pub use handlers::{HandlerOutput, OutputItem};
pub use matcher::{DescriptorMatcher, MatchResult};
pub use media::{FfmpegMuxer, VideoMuxer};
pub use menu::{Action, MenuOption};
pub use progress::{BatchProgressCallback, NoopBatchProgress, ProgressCallback};
pub use session::{DocumentItem, MediaItem, Session, SessionStore, UserId};
pub use transport::{Authorizer, Event, Reply, SingleOperator, Transport, UploadKind};
pub use workflow::{Engine, ModeKind, WorkflowMode};
