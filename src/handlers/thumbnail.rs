//! Document thumbnail set / remove.

use crate::codec::{DocumentCodec, Thumbnail};
use crate::config::EngineConfig;
use crate::error::HandlerError;
use crate::handlers::{processing, Batch, HandlerOutput, ItemOutcome, OutputItem};
use crate::session::DocumentItem;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Decode `image`, convert to RGB and shrink it to fit `max_side` × `max_side`
/// keeping the aspect ratio. Smaller images are not enlarged.
pub fn make_thumbnail(image: &[u8], max_side: u32) -> Result<Thumbnail, HandlerError> {
    let mut rgb = decode_rgb(image)?;
    if rgb.width() > max_side || rgb.height() > max_side {
        rgb = rgb.resize(max_side, max_side, FilterType::Lanczos3);
    }
    Ok(Thumbnail {
        jpeg: encode_jpeg(&rgb)?,
        width: rgb.width(),
        height: rgb.height(),
    })
}

/// Decode any supported image format and drop its alpha channel.
pub(crate) fn decode_rgb(image: &[u8]) -> Result<DynamicImage, HandlerError> {
    let decoded = image::load_from_memory(image).map_err(|e| HandlerError::BadImage(e.to_string()))?;
    Ok(DynamicImage::ImageRgb8(decoded.to_rgb8()))
}

pub(crate) fn encode_jpeg(rgb: &DynamicImage) -> Result<Vec<u8>, HandlerError> {
    let mut jpeg = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
        .map_err(|e| HandlerError::BadImage(e.to_string()))?;
    Ok(jpeg)
}

pub fn set_thumbnail(
    codec: &dyn DocumentCodec,
    config: &EngineConfig,
    documents: &[DocumentItem],
    image: &[u8],
) -> Result<HandlerOutput, HandlerError> {
    let thumbnail = make_thumbnail(image, config.thumbnail_max_side)?;

    let mut batch = Batch::start(config, "set_thumbnail", documents.len());
    for (index, doc) in documents.iter().enumerate() {
        batch.begin(index, &doc.name);
        let result = codec
            .set_thumbnail(&doc.bytes, &thumbnail)
            .map(|bytes| {
                ItemOutcome::Output(OutputItem {
                    name: format!("thumb_{}", doc.name),
                    bytes,
                    caption: Some(format!(
                        "✅ Thumbnail {}x{} added",
                        thumbnail.width, thumbnail.height
                    )),
                })
            })
            .map_err(|e| processing(&doc.name, e));
        batch.finish(index, &doc.name, result);
    }
    Ok(batch.end())
}

pub fn remove_thumbnail(
    codec: &dyn DocumentCodec,
    config: &EngineConfig,
    documents: &[DocumentItem],
) -> HandlerOutput {
    let mut batch = Batch::start(config, "remove_thumbnail", documents.len());
    for (index, doc) in documents.iter().enumerate() {
        batch.begin(index, &doc.name);
        let result = codec
            .remove_thumbnail(&doc.bytes)
            .map(|bytes| {
                ItemOutcome::Output(OutputItem {
                    name: format!("no_thumb_{}", doc.name),
                    bytes,
                    caption: Some("✅ Thumbnail removed".to_string()),
                })
            })
            .map_err(|e| processing(&doc.name, e));
        batch.finish(index, &doc.name, result);
    }
    batch.end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 10, 10, 128]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn large_images_fit_inside_the_box() {
        let thumb = make_thumbnail(&png(1024, 512), 256).unwrap();
        assert_eq!((thumb.width, thumb.height), (256, 128));
        let decoded = image::load_from_memory(&thumb.jpeg).unwrap();
        assert_eq!(decoded.color(), image::ColorType::Rgb8);
    }

    #[test]
    fn small_images_are_not_enlarged() {
        let thumb = make_thumbnail(&png(64, 100), 256).unwrap();
        assert_eq!((thumb.width, thumb.height), (64, 100));
    }

    #[test]
    fn undecodable_image_is_rejected() {
        assert!(matches!(
            make_thumbnail(b"not an image", 256),
            Err(HandlerError::BadImage(_))
        ));
    }
}
