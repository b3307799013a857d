//! Insert an image as a new page.

use crate::codec::DocumentCodec;
use crate::config::EngineConfig;
use crate::error::{HandlerError, ItemError};
use crate::handlers::{processing, Batch, HandlerOutput, ItemOutcome, OutputItem};
use crate::session::DocumentItem;

/// Insert `image` so it becomes page `position` (1-based) of every document.
///
/// Valid positions are `1..=page_count + 1`; the last one appends. A document
/// for which `position` is out of range is reported as failed and left
/// untouched.
pub fn insert_page(
    codec: &dyn DocumentCodec,
    config: &EngineConfig,
    documents: &[DocumentItem],
    position: usize,
    image: &[u8],
) -> Result<HandlerOutput, HandlerError> {
    let image = image::load_from_memory(image).map_err(|e| HandlerError::BadImage(e.to_string()))?;
    let fragment = codec
        .image_page(&image, config.insert_page_resolution)
        .map_err(|e| HandlerError::BadImage(e.to_string()))?;

    let mut batch = Batch::start(config, "insert_page", documents.len());
    for (index, doc) in documents.iter().enumerate() {
        batch.begin(index, &doc.name);
        let result = insert_one(codec, doc, position, &fragment);
        batch.finish(index, &doc.name, result);
    }
    Ok(batch.end())
}

fn insert_one(
    codec: &dyn DocumentCodec,
    doc: &DocumentItem,
    position: usize,
    fragment: &[u8],
) -> Result<ItemOutcome, ItemError> {
    let count = codec
        .page_count(&doc.bytes)
        .map_err(|e| processing(&doc.name, e))?;
    if position == 0 || position > count + 1 {
        return Err(ItemError::Processing {
            item: doc.name.clone(),
            detail: format!(
                "page {} is out of range, this document accepts 1 to {}",
                position,
                count + 1
            ),
        });
    }

    let bytes = codec
        .insert_pages(&doc.bytes, fragment, position - 1)
        .map_err(|e| processing(&doc.name, e))?;
    Ok(ItemOutcome::Output(OutputItem {
        name: format!("inserted_{}", doc.name),
        bytes,
        caption: Some(format!("✅ Inserted page at position {position}")),
    }))
}
