//! Delete pages that look like an uploaded screenshot.
//!
//! Every page is rasterised at `render_scale` and compared with the target
//! image through the [`DescriptorMatcher`]. Matching pages are removed; the
//! rest keep their order.

use crate::codec::DocumentCodec;
use crate::config::EngineConfig;
use crate::error::{CodecError, HandlerError, ItemError};
use crate::handlers::{processing, Batch, HandlerOutput, ItemOutcome, OutputItem};
use crate::matcher::{DescriptorMatcher, DescriptorSet, MatchResult};
use crate::session::DocumentItem;
use tracing::{debug, info};

pub fn delete_matching_pages(
    codec: &dyn DocumentCodec,
    config: &EngineConfig,
    documents: &[DocumentItem],
    target: &[u8],
) -> Result<HandlerOutput, HandlerError> {
    let target = image::load_from_memory(target).map_err(|e| HandlerError::BadImage(e.to_string()))?;
    let matcher = DescriptorMatcher::from_config(config);
    let target = matcher.extract(&target);
    info!("Target image: {} descriptors", target.len());

    let mut batch = Batch::start(config, "delete_pages", documents.len());
    for (index, doc) in documents.iter().enumerate() {
        batch.begin(index, &doc.name);
        let result = delete_one(codec, config, &matcher, &target, doc);
        batch.finish(index, &doc.name, result);
    }
    Ok(batch.end())
}

/// Score every page of `pdf` against `target`.
pub fn match_pages(
    codec: &dyn DocumentCodec,
    config: &EngineConfig,
    matcher: &DescriptorMatcher,
    target: &DescriptorSet,
    pdf: &[u8],
) -> Result<Vec<MatchResult>, CodecError> {
    // No target features means nothing can match; skip rendering.
    if target.is_empty() {
        return Ok((1..=codec.page_count(pdf)?)
            .map(|page| MatchResult {
                page,
                delete: false,
                matches: 0,
            })
            .collect());
    }

    let rasters = codec.render_pages(pdf, config.render_scale)?;
    let mut results = Vec::with_capacity(rasters.len());
    for (index, raster) in rasters.iter().enumerate() {
        let candidate = matcher.extract(raster);
        let result = matcher.decide(target, &candidate, index + 1);
        debug!(
            page = result.page,
            matches = result.matches,
            delete = result.delete,
            "Page compared"
        );
        results.push(result);
    }
    Ok(results)
}

fn delete_one(
    codec: &dyn DocumentCodec,
    config: &EngineConfig,
    matcher: &DescriptorMatcher,
    target: &DescriptorSet,
    doc: &DocumentItem,
) -> Result<ItemOutcome, ItemError> {
    let results = match_pages(codec, config, matcher, target, &doc.bytes)
        .map_err(|e| processing(&doc.name, e))?;

    let deleted: Vec<usize> = results.iter().filter(|r| r.delete).map(|r| r.page).collect();
    if deleted.is_empty() {
        return Ok(ItemOutcome::Notice(format!(
            "ℹ️ {}: no matching page found",
            doc.name
        )));
    }

    let keep: Vec<usize> = results
        .iter()
        .filter(|r| !r.delete)
        .map(|r| r.page - 1)
        .collect();
    let bytes = codec
        .retain_pages(&doc.bytes, &keep)
        .map_err(|e| processing(&doc.name, e))?;

    let listed = deleted
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    Ok(ItemOutcome::Output(OutputItem {
        name: format!("deleted_{}", doc.name),
        bytes,
        caption: Some(format!("🗑️ Deleted page(s): {listed}")),
    }))
}
