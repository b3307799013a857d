//! Document codec capability.
//!
//! Handlers decide *what* to change (layout, page selection, validation);
//! a [`DocumentCodec`] only executes primitive reads and edits on PDF bytes.
//! That split keeps every handler testable against an in-memory codec and
//! lets the rendering backend change without touching handler logic.
//!
//! All coordinates are PDF user space: points, origin at the bottom-left
//! corner of the page, y growing upwards.

pub mod info;
pub mod pdfium;

pub use self::pdfium::PdfiumCodec;

use crate::error::CodecError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Page dimensions in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

/// Axis-aligned box in PDF user space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextBox {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

impl TextBox {
    pub fn union(self, other: TextBox) -> TextBox {
        TextBox {
            left: self.left.min(other.left),
            bottom: self.bottom.min(other.bottom),
            right: self.right.max(other.right),
            top: self.top.max(other.top),
        }
    }

    /// Whether the centre of `other` lies inside this box.
    pub fn contains_centre_of(&self, other: &TextBox) -> bool {
        let x = (other.left + other.right) / 2.0;
        let y = (other.bottom + other.top) / 2.0;
        self.left <= x && x <= self.right && self.bottom <= y && y <= self.top
    }

    pub fn intersects(&self, other: &TextBox) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.bottom < other.top
            && other.bottom < self.top
    }
}

/// RGB colour with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub fn gray(level: f32) -> Color {
        Color {
            r: level,
            g: level,
            b: level,
        }
    }
}

/// Which point of the text a [`PageEdit::Text`] position refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAnchor {
    /// Left end of the baseline.
    Baseline,
    /// Top-left corner of the first line; the baseline sits one font size lower.
    TopLeft,
}

impl TextAnchor {
    /// Baseline y for text of `font_size` placed at `y`.
    pub fn baseline(self, y: f32, font_size: f32) -> f32 {
        match self {
            TextAnchor::Baseline => y,
            TextAnchor::TopLeft => y - font_size,
        }
    }
}

/// One primitive edit on a page (0-based `page`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PageEdit {
    /// Draw a single line of Helvetica text.
    Text {
        page: usize,
        x: f32,
        y: f32,
        anchor: TextAnchor,
        text: String,
        font_size: f32,
        color: Color,
        opacity: f32,
    },
    /// Remove the glyphs of `text` lying under `area` and paint `area` opaque.
    Redact {
        page: usize,
        area: TextBox,
        text: String,
        fill: Color,
    },
}

/// A JPEG thumbnail ready to embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Primitive operations on PDF bytes.
///
/// Implementations are blocking; callers run them on a blocking worker.
pub trait DocumentCodec: Send + Sync {
    /// Size of every page, in order.
    fn page_sizes(&self, pdf: &[u8]) -> Result<Vec<PageSize>, CodecError>;

    fn page_count(&self, pdf: &[u8]) -> Result<usize, CodecError> {
        Ok(self.page_sizes(pdf)?.len())
    }

    /// Extracted text of every page, in order.
    fn page_texts(&self, pdf: &[u8]) -> Result<Vec<String>, CodecError>;

    /// Bounding boxes of every case-sensitive occurrence of `needle`, per page.
    fn find_text(&self, pdf: &[u8], needle: &str) -> Result<Vec<Vec<TextBox>>, CodecError>;

    /// Rasterise every page, in order, at `scale` × its native size.
    fn render_pages(&self, pdf: &[u8], scale: f32) -> Result<Vec<DynamicImage>, CodecError>;

    /// Apply edits in order and return the saved document.
    fn apply_edits(&self, pdf: &[u8], edits: &[PageEdit]) -> Result<Vec<u8>, CodecError>;

    /// A one-page document showing `image` full-page, sized at `resolution` DPI.
    fn image_page(&self, image: &DynamicImage, resolution: f32) -> Result<Vec<u8>, CodecError>;

    /// Copy every page of `fragment` into `pdf` so the first lands at 0-based
    /// index `at`. `at == page_count` appends.
    fn insert_pages(&self, pdf: &[u8], fragment: &[u8], at: usize) -> Result<Vec<u8>, CodecError>;

    /// Keep only the listed 0-based pages, preserving their order.
    fn retain_pages(&self, pdf: &[u8], keep: &[usize]) -> Result<Vec<u8>, CodecError>;

    /// Embed document-level thumbnail metadata, replacing any previous one.
    fn set_thumbnail(&self, pdf: &[u8], thumbnail: &Thumbnail) -> Result<Vec<u8>, CodecError>;

    /// Drop the thumbnail metadata if present; absence is not an error.
    fn remove_thumbnail(&self, pdf: &[u8]) -> Result<Vec<u8>, CodecError>;
}

/// Whether the bytes start with the PDF magic `%PDF`.
pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && &bytes[..4] == b"%PDF"
}
