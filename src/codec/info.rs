//! Thumbnail metadata in the document information dictionary.
//!
//! pdfium can read the info dictionary but not write it, so these edits go
//! through `lopdf`. The thumbnail is stored as a JPEG image XObject referenced
//! from the `/Thumbnail` key of the trailer's `/Info` dictionary.

use crate::codec::Thumbnail;
use crate::error::CodecError;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

const THUMBNAIL_KEY: &[u8] = b"Thumbnail";

/// Store `thumbnail` under `/Info /Thumbnail`, creating `/Info` if needed.
pub fn set_thumbnail(pdf: &[u8], thumbnail: &Thumbnail) -> Result<Vec<u8>, CodecError> {
    let mut doc = load(pdf)?;

    let mut image = Dictionary::new();
    image.set("Type", Object::Name(b"XObject".to_vec()));
    image.set("Subtype", Object::Name(b"Image".to_vec()));
    image.set("Width", Object::Integer(i64::from(thumbnail.width)));
    image.set("Height", Object::Integer(i64::from(thumbnail.height)));
    image.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
    image.set("BitsPerComponent", Object::Integer(8));
    image.set("Filter", Object::Name(b"DCTDecode".to_vec()));
    let image_id = doc.add_object(Stream::new(image, thumbnail.jpeg.clone()));

    info_dictionary(&mut doc)?.set(THUMBNAIL_KEY, Object::Reference(image_id));
    save(&mut doc)
}

/// Remove `/Info /Thumbnail` if present.
pub fn remove_thumbnail(pdf: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut doc = load(pdf)?;
    let removed = match info_id(&doc) {
        Some(InfoLocation::Indirect(id)) => doc
            .get_object_mut(id)
            .and_then(Object::as_dict_mut)
            .ok()
            .and_then(|info| info.remove(THUMBNAIL_KEY)),
        Some(InfoLocation::Inline) => doc
            .trailer
            .get_mut(b"Info")
            .and_then(Object::as_dict_mut)
            .ok()
            .and_then(|info| info.remove(THUMBNAIL_KEY)),
        None => None,
    };
    if let Some(Object::Reference(id)) = removed {
        doc.objects.remove(&id);
    }
    save(&mut doc)
}

/// The embedded JPEG bytes, if any.
pub fn read_thumbnail(pdf: &[u8]) -> Result<Option<Vec<u8>>, CodecError> {
    let doc = load(pdf)?;
    let info = match info_id(&doc) {
        Some(InfoLocation::Indirect(id)) => doc.get_object(id).and_then(Object::as_dict).ok(),
        Some(InfoLocation::Inline) => doc.trailer.get(b"Info").and_then(Object::as_dict).ok(),
        None => None,
    };
    let Some(info) = info else {
        return Ok(None);
    };
    let Ok(reference) = info.get(THUMBNAIL_KEY).and_then(Object::as_reference) else {
        return Ok(None);
    };
    Ok(doc
        .get_object(reference)
        .and_then(Object::as_stream)
        .ok()
        .map(|stream| stream.content.clone()))
}

enum InfoLocation {
    Indirect(ObjectId),
    Inline,
}

fn info_id(doc: &Document) -> Option<InfoLocation> {
    match doc.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => Some(InfoLocation::Indirect(*id)),
        Ok(Object::Dictionary(_)) => Some(InfoLocation::Inline),
        _ => None,
    }
}

fn info_dictionary(doc: &mut Document) -> Result<&mut Dictionary, CodecError> {
    let id = match info_id(doc) {
        Some(InfoLocation::Indirect(id)) => id,
        Some(InfoLocation::Inline) => {
            return doc
                .trailer
                .get_mut(b"Info")
                .and_then(Object::as_dict_mut)
                .map_err(|e| CodecError::Edit(format!("{:?}", e)));
        }
        None => {
            let id = doc.add_object(Dictionary::new());
            doc.trailer.set("Info", Object::Reference(id));
            id
        }
    };
    doc.get_object_mut(id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| CodecError::Edit(format!("Info dictionary unusable: {:?}", e)))
}

fn load(pdf: &[u8]) -> Result<Document, CodecError> {
    Document::load_mem(pdf).map_err(|e| CodecError::Load(format!("{:?}", e)))
}

fn save(doc: &mut Document) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| CodecError::Save(format!("{:?}", e)))?;
    Ok(out)
}
