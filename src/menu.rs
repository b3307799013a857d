//! Button actions and the menus that offer them.
//!
//! Action ids are stable strings so a chat transport can round-trip them
//! through callback payloads. Rendering the menus is left to the transport.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every button the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    PdfTools,
    UploadPdf,
    DeleteByImage,
    AddWatermark,
    InsertPage,
    FindReplace,
    SkipSuggestions,
    /// Accept the suggestion at this 0-based position.
    Suggest(usize),
    RenameFiles,
    ThumbnailTools,
    CreateThumb,
    RemoveThumb,
    VideoTools,
    UploadVideos,
    SetVideoThumb,
    VideoThumbWatermark,
    BackMain,
    Help,
    SkipReplace,
    NewBatch,
    Cancel,
}

impl Action {
    /// The callback id sent by the transport.
    pub fn id(&self) -> String {
        let id = match self {
            Action::PdfTools => "pdf_tools",
            Action::UploadPdf => "upload_pdf",
            Action::DeleteByImage => "delete_by_image",
            Action::AddWatermark => "add_watermark",
            Action::InsertPage => "insert_page",
            Action::FindReplace => "find_replace",
            Action::SkipSuggestions => "skip_suggestions",
            Action::Suggest(i) => return format!("suggest:{i}"),
            Action::RenameFiles => "rename_files",
            Action::ThumbnailTools => "thumbnail_tools",
            Action::CreateThumb => "create_thumb",
            Action::RemoveThumb => "remove_thumb",
            Action::VideoTools => "video_tools",
            Action::UploadVideos => "upload_videos",
            Action::SetVideoThumb => "set_video_thumb",
            Action::VideoThumbWatermark => "video_thumb_watermark",
            Action::BackMain => "back_main",
            Action::Help => "help",
            Action::SkipReplace => "skip_replace",
            Action::NewBatch => "new_batch",
            Action::Cancel => "cancel",
        };
        id.to_string()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

/// Returned when a callback id names no known action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAction(pub String);

impl fmt::Display for UnknownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown action '{}'", self.0)
    }
}

impl std::error::Error for UnknownAction {}

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let action = match s.trim() {
            "pdf_tools" => Action::PdfTools,
            "upload_pdf" => Action::UploadPdf,
            "delete_by_image" => Action::DeleteByImage,
            "add_watermark" => Action::AddWatermark,
            "insert_page" => Action::InsertPage,
            "find_replace" => Action::FindReplace,
            "skip_suggestions" => Action::SkipSuggestions,
            "rename_files" => Action::RenameFiles,
            "thumbnail_tools" => Action::ThumbnailTools,
            "create_thumb" => Action::CreateThumb,
            "remove_thumb" => Action::RemoveThumb,
            "video_tools" => Action::VideoTools,
            "upload_videos" => Action::UploadVideos,
            "set_video_thumb" => Action::SetVideoThumb,
            "video_thumb_watermark" => Action::VideoThumbWatermark,
            "back_main" | "start" => Action::BackMain,
            "help" => Action::Help,
            "skip_replace" => Action::SkipReplace,
            "new_batch" => Action::NewBatch,
            "cancel" => Action::Cancel,
            other => {
                return other
                    .strip_prefix("suggest:")
                    .and_then(|i| i.parse().ok())
                    .map(Action::Suggest)
                    .ok_or_else(|| UnknownAction(other.to_string()));
            }
        };
        Ok(action)
    }
}

/// One button: a label and the action id it sends back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuOption {
    pub label: String,
    pub action_id: String,
}

impl MenuOption {
    pub fn new(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            action_id: action.id(),
        }
    }
}

pub const HELP_TEXT: &str = "ℹ️ Help\n\n\
📄 PDF tools: upload PDFs, then delete pages matching a screenshot, add a text \
watermark, insert an image as a page, find & replace words, rename files, or \
set/remove thumbnails.\n\
🎬 Video tools: upload videos, then attach a cover thumbnail, optionally with \
a burned-in caption.\n\
🆕 New batch clears every uploaded file. ✖️ Cancel abandons the current step.";

pub fn main_menu() -> (String, Vec<MenuOption>) {
    (
        "🤖 PDF & Video Editor\n\nChoose an option:".to_string(),
        vec![
            MenuOption::new("📄 PDF Tools", Action::PdfTools),
            MenuOption::new("🎬 Video Thumbnail", Action::VideoTools),
            MenuOption::new("🆕 New Batch", Action::NewBatch),
            MenuOption::new("ℹ️ Help", Action::Help),
        ],
    )
}

pub fn pdf_tools_menu() -> (String, Vec<MenuOption>) {
    (
        "📄 PDF Tools\n\nSelect operation:".to_string(),
        vec![
            MenuOption::new("📤 Upload PDFs", Action::UploadPdf),
            MenuOption::new("🖼️ Delete Page by Image", Action::DeleteByImage),
            MenuOption::new("📝 Add Watermark", Action::AddWatermark),
            MenuOption::new("📄 Insert Page", Action::InsertPage),
            MenuOption::new("🔍 Find & Replace", Action::FindReplace),
            MenuOption::new("📛 Rename Files", Action::RenameFiles),
            MenuOption::new("🎨 Thumbnail Tools", Action::ThumbnailTools),
            MenuOption::new("🔙 Back", Action::BackMain),
        ],
    )
}

pub fn thumbnail_tools_menu() -> (String, Vec<MenuOption>) {
    (
        "🎨 Thumbnail Operations:".to_string(),
        vec![
            MenuOption::new("Create Thumbnail", Action::CreateThumb),
            MenuOption::new("Remove Thumbnail", Action::RemoveThumb),
            MenuOption::new("🔙 Back", Action::PdfTools),
        ],
    )
}

pub fn video_tools_menu() -> (String, Vec<MenuOption>) {
    (
        "🎬 Video Tools".to_string(),
        vec![
            MenuOption::new("📤 Upload Videos", Action::UploadVideos),
            MenuOption::new("🖼️ Set Thumbnail", Action::SetVideoThumb),
            MenuOption::new("📝 Thumbnail + Watermark", Action::VideoThumbWatermark),
            MenuOption::new("🔙 Back", Action::BackMain),
        ],
    )
}

/// Suggestion list shown when find & replace starts.
pub fn suggestions_menu(words: &[(String, usize)]) -> (String, Vec<MenuOption>) {
    let listing = words
        .iter()
        .enumerate()
        .map(|(i, (word, count))| format!("{}. {} ({})", i + 1, word, count))
        .collect::<Vec<_>>()
        .join("\n");

    let text = if listing.is_empty() {
        "🔍 No words found to suggest.\n\nSend word to find:".to_string()
    } else {
        format!("🔍 Most Common Words:\n\n{listing}\n\nPick one or send a word to find:")
    };

    let mut options: Vec<MenuOption> = words
        .iter()
        .enumerate()
        .map(|(i, (word, _))| MenuOption::new(word.clone(), Action::Suggest(i)))
        .collect();
    options.push(MenuOption::new("Skip Suggestions", Action::SkipSuggestions));
    options.push(MenuOption::new("✖️ Cancel", Action::Cancel));
    (text, options)
}

pub fn replace_menu(find: &str) -> (String, Vec<MenuOption>) {
    (
        format!("🔍 Finding: {find}\n\nSend replacement word (or skip to only redact):"),
        vec![
            MenuOption::new("Skip Replace", Action::SkipReplace),
            MenuOption::new("✖️ Cancel", Action::Cancel),
        ],
    )
}
