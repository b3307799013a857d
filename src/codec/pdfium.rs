//! [`DocumentCodec`] backed by pdfium.
//!
//! ## Why bind per call?
//!
//! A [`Pdfium`] handle borrows the loaded library and every document it opens
//! borrows the handle, so neither can live in a struct shared across threads.
//! Each operation binds, does its work and drops everything before returning.
//! Callers run these methods inside `spawn_blocking`.

use crate::codec::{info, Color, DocumentCodec, PageEdit, PageSize, TextBox, Thumbnail};
use crate::error::CodecError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::debug;

/// Document codec using the pdfium C++ library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumCodec {
    /// Library file, or a directory holding the platform library. `None`
    /// binds to the system library.
    library_path: Option<PathBuf>,
}

impl PdfiumCodec {
    /// Bind from `PDFIUM_LIB_PATH` when set, the system library otherwise.
    pub fn from_env() -> Self {
        Self {
            library_path: std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from),
        }
    }

    pub fn with_library(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }

    fn bind(&self) -> Result<Pdfium, CodecError> {
        let bindings = match &self.library_path {
            Some(path) if path.is_dir() => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(path))
            }
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| CodecError::BindingFailed(format!("{:?}", e)))?;
        Ok(Pdfium::new(bindings))
    }
}

impl DocumentCodec for PdfiumCodec {
    fn page_sizes(&self, pdf: &[u8]) -> Result<Vec<PageSize>, CodecError> {
        let pdfium = self.bind()?;
        let document = open(&pdfium, pdf)?;
        Ok(document
            .pages()
            .iter()
            .map(|page| PageSize {
                width: page.width().value,
                height: page.height().value,
            })
            .collect())
    }

    fn page_texts(&self, pdf: &[u8]) -> Result<Vec<String>, CodecError> {
        let pdfium = self.bind()?;
        let document = open(&pdfium, pdf)?;
        document
            .pages()
            .iter()
            .map(|page| {
                page.text()
                    .map(|text| text.all())
                    .map_err(|e| CodecError::Load(format!("text extraction: {:?}", e)))
            })
            .collect()
    }

    fn find_text(&self, pdf: &[u8], needle: &str) -> Result<Vec<Vec<TextBox>>, CodecError> {
        let pdfium = self.bind()?;
        let document = open(&pdfium, pdf)?;
        let options = PdfSearchOptions::new().match_case(true);

        let mut per_page = Vec::new();
        for page in document.pages().iter() {
            let text = page
                .text()
                .map_err(|e| CodecError::Load(format!("text extraction: {:?}", e)))?;
            let search = text
                .search(needle, &options)
                .map_err(|e| CodecError::Load(format!("text search: {:?}", e)))?;

            // A hit wrapping across lines comes back as several segments.
            let mut boxes = Vec::new();
            for segments in search.iter(PdfSearchDirection::SearchForward) {
                let hit = segments
                    .iter()
                    .map(|segment| to_box(segment.bounds()))
                    .reduce(TextBox::union);
                boxes.extend(hit);
            }
            per_page.push(boxes);
        }
        Ok(per_page)
    }

    fn render_pages(&self, pdf: &[u8], scale: f32) -> Result<Vec<DynamicImage>, CodecError> {
        let pdfium = self.bind()?;
        let document = open(&pdfium, pdf)?;
        let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);

        let mut images = Vec::new();
        for (index, page) in document.pages().iter().enumerate() {
            let bitmap = page
                .render_with_config(&render_config)
                .map_err(|e| CodecError::Render {
                    page: index + 1,
                    detail: format!("{:?}", e),
                })?;
            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                index + 1,
                image.width(),
                image.height()
            );
            images.push(image);
        }
        Ok(images)
    }

    fn apply_edits(&self, pdf: &[u8], edits: &[PageEdit]) -> Result<Vec<u8>, CodecError> {
        let pdfium = self.bind()?;
        let mut document = open(&pdfium, pdf)?;
        let font = document.fonts_mut().helvetica();
        let total = document.pages().len() as usize;

        for edit in edits {
            let index = match edit {
                PageEdit::Text { page, .. } | PageEdit::Redact { page, .. } => *page,
            };
            let mut page = document
                .pages()
                .get(page_index(index, total)?)
                .map_err(edit_error)?;

            match edit {
                PageEdit::Redact { area, fill, .. } => {
                    scrub_area(&document, &mut page, area)?;
                    page.objects_mut()
                        .create_path_object_rect(to_rect(area), None, None, Some(to_color(*fill, 1.0)))
                        .map_err(edit_error)?;
                }
                PageEdit::Text {
                    x,
                    y,
                    anchor,
                    text,
                    font_size,
                    color,
                    opacity,
                    ..
                } => {
                    let mut object =
                        PdfPageTextObject::new(&document, text, font, PdfPoints::new(*font_size))
                            .map_err(edit_error)?;
                    object
                        .set_fill_color(to_color(*color, *opacity))
                        .map_err(edit_error)?;
                    object
                        .translate(
                            PdfPoints::new(*x),
                            PdfPoints::new(anchor.baseline(*y, *font_size)),
                        )
                        .map_err(edit_error)?;
                    page.objects_mut()
                        .add_text_object(object)
                        .map_err(edit_error)?;
                }
            }
            page.regenerate_content().map_err(edit_error)?;
        }

        save(&document)
    }

    fn image_page(&self, image: &DynamicImage, resolution: f32) -> Result<Vec<u8>, CodecError> {
        let pdfium = self.bind()?;
        let mut document = pdfium.create_new_pdf().map_err(edit_error)?;
        let width = PdfPoints::new(image.width() as f32 * 72.0 / resolution);
        let height = PdfPoints::new(image.height() as f32 * 72.0 / resolution);
        {
            let mut page = document
                .pages_mut()
                .create_page_at_end(PdfPagePaperSize::Custom(width, height))
                .map_err(edit_error)?;
            page.objects_mut()
                .create_image_object(PdfPoints::ZERO, PdfPoints::ZERO, image, Some(width), Some(height))
                .map_err(edit_error)?;
        }
        save(&document)
    }

    fn insert_pages(&self, pdf: &[u8], fragment: &[u8], at: usize) -> Result<Vec<u8>, CodecError> {
        let pdfium = self.bind()?;
        let mut document = open(&pdfium, pdf)?;
        let source = open(&pdfium, fragment)?;

        let total = document.pages().len() as usize;
        if at > total {
            return Err(CodecError::PageOutOfRange {
                page: at + 1,
                total,
            });
        }
        let count = source.pages().len() as usize;
        for i in 0..count {
            document
                .pages_mut()
                .copy_page_from_document(&source, page_index(i, count)?, page_index(at + i, total + i + 1)?)
                .map_err(edit_error)?;
        }
        save(&document)
    }

    fn retain_pages(&self, pdf: &[u8], keep: &[usize]) -> Result<Vec<u8>, CodecError> {
        let pdfium = self.bind()?;
        let document = open(&pdfium, pdf)?;
        let total = document.pages().len() as usize;
        if let Some(&bad) = keep.iter().find(|&&i| i >= total) {
            return Err(CodecError::PageOutOfRange {
                page: bad + 1,
                total,
            });
        }

        // Delete from the back so earlier indices stay valid.
        for index in (0..total).rev() {
            if keep.contains(&index) {
                continue;
            }
            document
                .pages()
                .get(page_index(index, total)?)
                .and_then(|page| page.delete())
                .map_err(edit_error)?;
        }
        save(&document)
    }

    fn set_thumbnail(&self, pdf: &[u8], thumbnail: &Thumbnail) -> Result<Vec<u8>, CodecError> {
        info::set_thumbnail(pdf, thumbnail)
    }

    fn remove_thumbnail(&self, pdf: &[u8]) -> Result<Vec<u8>, CodecError> {
        info::remove_thumbnail(pdf)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────

fn open<'a>(pdfium: &'a Pdfium, pdf: &'a [u8]) -> Result<PdfDocument<'a>, CodecError> {
    pdfium
        .load_pdf_from_byte_slice(pdf, None)
        .map_err(|e| CodecError::Load(format!("{:?}", e)))
}

fn save(document: &PdfDocument<'_>) -> Result<Vec<u8>, CodecError> {
    document
        .save_to_bytes()
        .map_err(|e| CodecError::Save(format!("{:?}", e)))
}

fn page_index(index: usize, total: usize) -> Result<PdfPageIndex, CodecError> {
    if index >= total {
        return Err(CodecError::PageOutOfRange {
            page: index + 1,
            total,
        });
    }
    PdfPageIndex::try_from(index).map_err(|_| CodecError::PageOutOfRange {
        page: index + 1,
        total,
    })
}

fn edit_error(e: PdfiumError) -> CodecError {
    CodecError::Edit(format!("{:?}", e))
}

/// Remove every glyph whose centre lies inside `area` from the page's text
/// objects.
///
/// An affected object is replaced by one copy per surviving run of glyphs.
/// Each copy is shifted so its first glyph starts where it started before,
/// so text outside the box does not move.
fn scrub_area(
    document: &PdfDocument<'_>,
    page: &mut PdfPage<'_>,
    area: &TextBox,
) -> Result<(), CodecError> {
    let plans = plan_scrub(page, area)?;
    let objects = page.objects_mut();

    // Highest index first so removals leave the pending indices valid.
    for (index, runs) in plans.into_iter().rev() {
        let original = objects.remove_object_at_index(index).map_err(edit_error)?;
        let mut pieces = Vec::with_capacity(runs.len());
        for run in &runs {
            let mut piece = original.try_copy(document).map_err(edit_error)?;
            if let Some(text_object) = piece.as_text_object_mut() {
                text_object.set_text(&run.text).map_err(edit_error)?;
            }
            piece
                .translate(PdfPoints::new(run.shift), PdfPoints::ZERO)
                .map_err(edit_error)?;
            pieces.push(piece);
        }
        for piece in pieces {
            objects.add_object(piece).map_err(edit_error)?;
        }
        debug!("Split text object {} into {} run(s)", index, runs.len());
    }
    Ok(())
}

/// Text objects touched by `area`, with the runs that survive in each.
fn plan_scrub(page: &PdfPage<'_>, area: &TextBox) -> Result<Vec<(usize, Vec<Run>)>, CodecError> {
    let page_text = page.text().map_err(edit_error)?;
    let mut plans = Vec::new();
    for (index, object) in page.objects().iter().enumerate() {
        let Some(text_object) = object.as_text_object() else {
            continue;
        };
        let chars = page_text.chars_for_object(text_object).map_err(edit_error)?;
        let mut glyphs = Vec::new();
        for ch in chars.iter() {
            let bounds = to_box(ch.loose_bounds().map_err(edit_error)?);
            glyphs.push(Glyph {
                ch: ch.unicode_char(),
                left: bounds.left,
                hidden: area.contains_centre_of(&bounds),
            });
        }
        if let Some(runs) = surviving_runs(&glyphs) {
            plans.push((index, runs));
        }
    }
    Ok(plans)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Glyph {
    ch: Option<char>,
    left: f32,
    hidden: bool,
}

/// A stretch of glyphs kept after scrubbing, `shift` points right of the
/// object's first glyph.
#[derive(Debug, Clone, PartialEq)]
struct Run {
    text: String,
    shift: f32,
}

/// `None` when no glyph is hidden and the object can stay as it is.
fn surviving_runs(glyphs: &[Glyph]) -> Option<Vec<Run>> {
    if !glyphs.iter().any(|g| g.hidden) {
        return None;
    }
    let origin = glyphs.first().map(|g| g.left).unwrap_or_default();

    let mut runs = Vec::new();
    let mut current: Option<Run> = None;
    for glyph in glyphs {
        match (glyph.hidden, glyph.ch) {
            (false, Some(ch)) => current
                .get_or_insert_with(|| Run {
                    text: String::new(),
                    shift: glyph.left - origin,
                })
                .text
                .push(ch),
            _ => runs.extend(current.take()),
        }
    }
    runs.extend(current);
    runs.retain(|run| !run.text.trim().is_empty());
    Some(runs)
}

fn to_box(rect: PdfRect) -> TextBox {
    TextBox {
        left: rect.left().value,
        bottom: rect.bottom().value,
        right: rect.right().value,
        top: rect.top().value,
    }
}

fn to_rect(area: &TextBox) -> PdfRect {
    PdfRect::new_from_values(area.bottom, area.left, area.top, area.right)
}

fn to_color(color: Color, opacity: f32) -> PdfColor {
    PdfColor::new(
        channel(color.r),
        channel(color.g),
        channel(color.b),
        channel(opacity),
    )
}

fn channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
