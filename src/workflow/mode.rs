//! Workflow modes.
//!
//! Each variant of [`WorkflowMode`] carries exactly the parameters its
//! workflow has collected so far. Leaving a mode drops them, so a value
//! gathered for one workflow can never be read by another.

use std::fmt;
use std::sync::Arc;

/// The step the operator is currently in.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum WorkflowMode {
    #[default]
    Idle,
    UploadingDocuments,
    UploadingVideos,
    AwaitingDeleteTarget,
    AwaitingWatermarkText,
    AwaitingOpacity {
        text: String,
    },
    AwaitingPageNumber,
    AwaitingInsertImage {
        /// 1-based page the image will become.
        position: usize,
    },
    AwaitingFindWord,
    AwaitingReplaceWord {
        find: String,
    },
    AwaitingRenamePattern,
    AwaitingThumbnailImage,
    AwaitingVideoThumbImage,
    AwaitingVideoWatermarkImage,
    AwaitingVideoWatermarkText {
        cover: Arc<[u8]>,
    },
}

// Cover bytes can be megabytes; print their size instead.
impl fmt::Debug for WorkflowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowMode::AwaitingOpacity { text } => f
                .debug_struct("AwaitingOpacity")
                .field("text", text)
                .finish(),
            WorkflowMode::AwaitingInsertImage { position } => f
                .debug_struct("AwaitingInsertImage")
                .field("position", position)
                .finish(),
            WorkflowMode::AwaitingReplaceWord { find } => f
                .debug_struct("AwaitingReplaceWord")
                .field("find", find)
                .finish(),
            WorkflowMode::AwaitingVideoWatermarkText { cover } => f
                .debug_struct("AwaitingVideoWatermarkText")
                .field("cover_bytes", &cover.len())
                .finish(),
            other => fmt::Debug::fmt(&other.kind(), f),
        }
    }
}

/// Field-less discriminant of [`WorkflowMode`], used as the transition table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeKind {
    Idle,
    UploadingDocuments,
    UploadingVideos,
    AwaitingDeleteTarget,
    AwaitingWatermarkText,
    AwaitingOpacity,
    AwaitingPageNumber,
    AwaitingInsertImage,
    AwaitingFindWord,
    AwaitingReplaceWord,
    AwaitingRenamePattern,
    AwaitingThumbnailImage,
    AwaitingVideoThumbImage,
    AwaitingVideoWatermarkImage,
    AwaitingVideoWatermarkText,
}

impl WorkflowMode {
    pub fn kind(&self) -> ModeKind {
        match self {
            WorkflowMode::Idle => ModeKind::Idle,
            WorkflowMode::UploadingDocuments => ModeKind::UploadingDocuments,
            WorkflowMode::UploadingVideos => ModeKind::UploadingVideos,
            WorkflowMode::AwaitingDeleteTarget => ModeKind::AwaitingDeleteTarget,
            WorkflowMode::AwaitingWatermarkText => ModeKind::AwaitingWatermarkText,
            WorkflowMode::AwaitingOpacity { .. } => ModeKind::AwaitingOpacity,
            WorkflowMode::AwaitingPageNumber => ModeKind::AwaitingPageNumber,
            WorkflowMode::AwaitingInsertImage { .. } => ModeKind::AwaitingInsertImage,
            WorkflowMode::AwaitingFindWord => ModeKind::AwaitingFindWord,
            WorkflowMode::AwaitingReplaceWord { .. } => ModeKind::AwaitingReplaceWord,
            WorkflowMode::AwaitingRenamePattern => ModeKind::AwaitingRenamePattern,
            WorkflowMode::AwaitingThumbnailImage => ModeKind::AwaitingThumbnailImage,
            WorkflowMode::AwaitingVideoThumbImage => ModeKind::AwaitingVideoThumbImage,
            WorkflowMode::AwaitingVideoWatermarkImage => ModeKind::AwaitingVideoWatermarkImage,
            WorkflowMode::AwaitingVideoWatermarkText { .. } => ModeKind::AwaitingVideoWatermarkText,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, WorkflowMode::Idle)
    }
}

impl ModeKind {
    /// The mode a menu selection enters, for kinds that carry no parameters.
    pub fn entry(self) -> Option<WorkflowMode> {
        let mode = match self {
            ModeKind::Idle => WorkflowMode::Idle,
            ModeKind::UploadingDocuments => WorkflowMode::UploadingDocuments,
            ModeKind::UploadingVideos => WorkflowMode::UploadingVideos,
            ModeKind::AwaitingDeleteTarget => WorkflowMode::AwaitingDeleteTarget,
            ModeKind::AwaitingWatermarkText => WorkflowMode::AwaitingWatermarkText,
            ModeKind::AwaitingPageNumber => WorkflowMode::AwaitingPageNumber,
            ModeKind::AwaitingFindWord => WorkflowMode::AwaitingFindWord,
            ModeKind::AwaitingRenamePattern => WorkflowMode::AwaitingRenamePattern,
            ModeKind::AwaitingThumbnailImage => WorkflowMode::AwaitingThumbnailImage,
            ModeKind::AwaitingVideoThumbImage => WorkflowMode::AwaitingVideoThumbImage,
            ModeKind::AwaitingVideoWatermarkImage => WorkflowMode::AwaitingVideoWatermarkImage,
            ModeKind::AwaitingOpacity
            | ModeKind::AwaitingInsertImage
            | ModeKind::AwaitingReplaceWord
            | ModeKind::AwaitingVideoWatermarkText => return None,
        };
        Some(mode)
    }

    /// What the operator is asked for on entering this mode.
    pub fn prompt(self) -> &'static str {
        match self {
            ModeKind::Idle => "Choose an option from the menu.",
            ModeKind::UploadingDocuments => "📤 Send me PDF files (one or multiple)",
            ModeKind::UploadingVideos => "📤 Send video files",
            ModeKind::AwaitingDeleteTarget => "🖼️ Send screenshot/image of page to delete",
            ModeKind::AwaitingWatermarkText => "📝 Send watermark text",
            ModeKind::AwaitingOpacity => "🎨 Send opacity (0.1 to 1.0, e.g., 0.3)",
            ModeKind::AwaitingPageNumber => "📄 Send page number where to insert (e.g., 3)",
            ModeKind::AwaitingInsertImage => "📄 Now send the page image to insert",
            ModeKind::AwaitingFindWord => "🔍 Send word to find:",
            ModeKind::AwaitingReplaceWord => "Send replacement word (or skip to only redact):",
            ModeKind::AwaitingRenamePattern => {
                "📛 Send new name pattern:\nUse {n} for number\nExample: Document_{n}"
            }
            ModeKind::AwaitingThumbnailImage => "🖼️ Send square image for thumbnail",
            ModeKind::AwaitingVideoThumbImage => "🖼️ Send thumbnail image",
            ModeKind::AwaitingVideoWatermarkImage => "🖼️ Send thumbnail image first",
            ModeKind::AwaitingVideoWatermarkText => "📝 Now send watermark text",
        }
    }
}
