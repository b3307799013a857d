//! Rename documents from a numbered pattern.

use crate::config::EngineConfig;
use crate::handlers::{Batch, HandlerOutput, ItemOutcome, OutputItem};
use crate::session::DocumentItem;

/// Name for the document at 1-based `ordinal`.
///
/// Every `placeholder` in `pattern` becomes the ordinal. When the pattern has
/// no placeholder and several documents are renamed, `_<ordinal>` is appended
/// so names stay distinct. `extension` is added unless the result already
/// ends with it (compared case-insensitively).
pub fn numbered_name(
    pattern: &str,
    placeholder: &str,
    extension: &str,
    ordinal: usize,
    batch_len: usize,
) -> String {
    let mut name = if pattern.contains(placeholder) {
        pattern.replace(placeholder, &ordinal.to_string())
    } else if batch_len > 1 {
        format!("{pattern}_{ordinal}")
    } else {
        pattern.to_string()
    };
    if !name.to_lowercase().ends_with(&extension.to_lowercase()) {
        name.push_str(extension);
    }
    name
}

pub fn rename(config: &EngineConfig, documents: &[DocumentItem], pattern: &str) -> HandlerOutput {
    let mut batch = Batch::start(config, "rename", documents.len());
    for (index, doc) in documents.iter().enumerate() {
        batch.begin(index, &doc.name);
        let name = numbered_name(
            pattern,
            &config.rename_placeholder,
            &config.rename_extension,
            index + 1,
            documents.len(),
        );
        let item = OutputItem {
            caption: Some(format!("📛 {} → {}", doc.name, name)),
            name,
            bytes: doc.bytes.to_vec(),
        };
        batch.finish(index, &doc.name, Ok(ItemOutcome::Output(item)));
    }
    batch.end()
}
