//! Text watermark on every page.

use crate::codec::{Color, DocumentCodec, PageEdit, PageSize, TextAnchor};
use crate::config::EngineConfig;
use crate::error::ItemError;
use crate::handlers::{processing, Batch, HandlerOutput, ItemOutcome, OutputItem};
use crate::session::DocumentItem;

/// Baseline origin of the caption on a page.
///
/// Centring uses `chars × watermark_char_width` as the text width, not real
/// glyph metrics, so long or wide captions sit slightly off-centre.
pub fn caption_origin(page: PageSize, text: &str, config: &EngineConfig) -> (f32, f32) {
    let approx_width = text.chars().count() as f32 * config.watermark_char_width;
    (
        page.width / 2.0 - approx_width / 2.0,
        config.watermark_bottom_margin,
    )
}

pub fn watermark(
    codec: &dyn DocumentCodec,
    config: &EngineConfig,
    documents: &[DocumentItem],
    text: &str,
    opacity: f32,
) -> HandlerOutput {
    let mut batch = Batch::start(config, "watermark", documents.len());
    for (index, doc) in documents.iter().enumerate() {
        batch.begin(index, &doc.name);
        let result = watermark_one(codec, config, doc, text, opacity);
        batch.finish(index, &doc.name, result);
    }
    batch.end()
}

fn watermark_one(
    codec: &dyn DocumentCodec,
    config: &EngineConfig,
    doc: &DocumentItem,
    text: &str,
    opacity: f32,
) -> Result<ItemOutcome, ItemError> {
    let sizes = codec
        .page_sizes(&doc.bytes)
        .map_err(|e| processing(&doc.name, e))?;

    let edits: Vec<PageEdit> = sizes
        .iter()
        .enumerate()
        .map(|(page, size)| {
            let (x, y) = caption_origin(*size, text, config);
            PageEdit::Text {
                page,
                x,
                y,
                anchor: TextAnchor::Baseline,
                text: text.to_string(),
                font_size: config.watermark_font_size,
                color: Color::gray(config.watermark_gray),
                opacity,
            }
        })
        .collect();

    let bytes = codec
        .apply_edits(&doc.bytes, &edits)
        .map_err(|e| processing(&doc.name, e))?;
    Ok(ItemOutcome::Output(OutputItem {
        name: format!("watermarked_{}", doc.name),
        bytes,
        caption: Some(format!("✅ Watermarked {} page(s)", sizes.len())),
    }))
}
