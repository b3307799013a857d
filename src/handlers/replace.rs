//! Find & replace by redaction.
//!
//! Each occurrence is painted over with an opaque box and the replacement is
//! drawn from the box's top-left corner. The replacement is not reflowed, so
//! a longer word can run past the original box.

use crate::codec::{Color, DocumentCodec, PageEdit, TextAnchor, TextBox};
use crate::config::EngineConfig;
use crate::error::ItemError;
use crate::handlers::{processing, Batch, HandlerOutput, ItemOutcome, OutputItem};
use crate::session::DocumentItem;

/// Replace every case-sensitive occurrence of `find`. An empty `replace`
/// only redacts.
pub fn find_replace(
    codec: &dyn DocumentCodec,
    config: &EngineConfig,
    documents: &[DocumentItem],
    find: &str,
    replace: &str,
) -> HandlerOutput {
    let mut batch = Batch::start(config, "find_replace", documents.len());
    for (index, doc) in documents.iter().enumerate() {
        batch.begin(index, &doc.name);
        let result = replace_one(codec, config, doc, find, replace);
        batch.finish(index, &doc.name, result);
    }
    batch.end()
}

/// Edits for one document: every redaction first, so no box can cover a
/// replacement drawn for an earlier hit.
pub fn replacement_edits(
    hits: &[Vec<TextBox>],
    find: &str,
    replace: &str,
    font_size: f32,
) -> Vec<PageEdit> {
    let redactions = hits.iter().enumerate().flat_map(|(page, boxes)| {
        boxes.iter().map(move |area| PageEdit::Redact {
            page,
            area: *area,
            text: find.to_string(),
            fill: Color::WHITE,
        })
    });

    let insertions = hits
        .iter()
        .enumerate()
        .filter(|_| !replace.is_empty())
        .flat_map(|(page, boxes)| {
            boxes.iter().map(move |area| PageEdit::Text {
                page,
                x: area.left,
                y: area.top,
                anchor: TextAnchor::TopLeft,
                text: replace.to_string(),
                font_size,
                color: Color::BLACK,
                opacity: 1.0,
            })
        });

    redactions.chain(insertions).collect()
}

fn replace_one(
    codec: &dyn DocumentCodec,
    config: &EngineConfig,
    doc: &DocumentItem,
    find: &str,
    replace: &str,
) -> Result<ItemOutcome, ItemError> {
    let hits = codec
        .find_text(&doc.bytes, find)
        .map_err(|e| processing(&doc.name, e))?;
    let occurrences: usize = hits.iter().map(Vec::len).sum();
    if occurrences == 0 {
        return Ok(ItemOutcome::Notice(format!(
            "ℹ️ {}: '{}' not found",
            doc.name, find
        )));
    }

    let edits = replacement_edits(&hits, find, replace, config.replace_font_size);
    let bytes = codec
        .apply_edits(&doc.bytes, &edits)
        .map_err(|e| processing(&doc.name, e))?;

    let caption = if replace.is_empty() {
        format!("✅ Redacted {occurrences} occurrence(s) of '{find}'")
    } else {
        format!("✅ Replaced {occurrences} occurrence(s) of '{find}' with '{replace}'")
    };
    Ok(ItemOutcome::Output(OutputItem {
        name: format!("replaced_{}", doc.name),
        bytes,
        caption: Some(caption),
    }))
}
