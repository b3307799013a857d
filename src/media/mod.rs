//! Video muxer capability.
//!
//! The video handlers stage every input in a scratch directory and hand
//! paths to a [`VideoMuxer`]. Implementations must not return before the
//! output file is complete, and must stop the underlying process when the
//! returned future is dropped so a timed-out call leaves nothing running.

pub mod ffmpeg;

pub use ffmpeg::FfmpegMuxer;

use crate::error::ToolError;
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait VideoMuxer: Send + Sync {
    /// Name reported in per-item failures.
    fn tool_name(&self) -> &str;

    /// Write `output`: `video` with `cover` attached as its cover picture.
    /// The primary streams are copied, not re-encoded.
    async fn attach_cover(&self, video: &Path, cover: &Path, output: &Path) -> Result<(), ToolError>;

    /// Write `output`: `video` re-encoded with `caption` drawn bottom-centre
    /// for the whole clip.
    async fn burn_caption(
        &self,
        video: &Path,
        caption: &str,
        font_size: u32,
        output: &Path,
    ) -> Result<(), ToolError>;
}
