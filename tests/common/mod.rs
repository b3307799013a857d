//! Shared fixtures: an in-memory document codec, a scriptable muxer and a
//! transport that records every reply.
//!
//! Fake documents are `%PDF-fake\n` followed by JSON, so handlers see bytes
//! that pass the PDF magic check while tests can inspect every edit.

#![allow(dead_code)]

use async_trait::async_trait;
use edgequake_docflow::codec::{PageEdit, PageSize, TextBox, Thumbnail};
use edgequake_docflow::{
    CodecError, DocflowError, DocumentCodec, MenuOption, Reply, ToolError, Transport, VideoMuxer,
};
use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

const MAGIC: &[u8] = b"%PDF-fake\n";
pub const RASTER_SIDE: u32 = 256;

// ── Fake documents ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FakeWord {
    pub text: String,
    pub area: TextBox,
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FakePage {
    pub size: PageSize,
    pub words: Vec<FakeWord>,
    /// Seed of the block texture `render_pages` returns; 0 renders blank.
    pub seed: u64,
    /// Rectangles painted by redactions.
    pub fills: Vec<TextBox>,
    /// Pixel size of the image this page was built from, if any.
    pub image: Option<(u32, u32)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FakeDoc {
    pub pages: Vec<FakePage>,
    pub thumbnail: Option<(u32, u32)>,
}

impl FakeDoc {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = MAGIC.to_vec();
        out.extend(serde_json::to_vec(self).expect("serialise fake doc"));
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let body = bytes
            .strip_prefix(MAGIC)
            .ok_or_else(|| CodecError::Load("not a fake document".into()))?;
        serde_json::from_slice(body).map_err(|e| CodecError::Load(e.to_string()))
    }

    /// Words on the page whose text equals `text`.
    pub fn words_on(&self, page: usize, text: &str) -> Vec<&FakeWord> {
        self.pages[page].words.iter().filter(|w| w.text == text).collect()
    }
}

/// Letter-sized page carrying the given words laid out on one line each.
pub fn page(words: &[&str], seed: u64) -> FakePage {
    let words = words
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let top = 700.0 - i as f32 * 20.0;
            FakeWord {
                text: text.to_string(),
                area: TextBox {
                    left: 72.0,
                    bottom: top - 12.0,
                    right: 72.0 + text.len() as f32 * 6.0,
                    top,
                },
                opacity: 1.0,
            }
        })
        .collect();
    FakePage {
        size: PageSize {
            width: 612.0,
            height: 792.0,
        },
        words,
        seed,
        fills: Vec::new(),
        image: None,
    }
}

pub fn doc(pages: Vec<FakePage>) -> Vec<u8> {
    FakeDoc {
        pages,
        thumbnail: None,
    }
    .to_bytes()
}

/// `n` blank pages with distinct textures.
pub fn doc_with_pages(n: usize) -> Vec<u8> {
    doc((0..n).map(|i| page(&[], 100 + i as u64)).collect())
}

pub fn corrupt_doc() -> Vec<u8> {
    b"%PDF-garbage".to_vec()
}

// ── Images ───────────────────────────────────────────────────────────────────

/// Random grey blocks: dense, unique corners for the descriptor matcher.
pub fn textured(seed: u64) -> DynamicImage {
    let block = 8;
    let cols = (RASTER_SIDE / block) as usize;
    let mut state = seed;
    let values: Vec<u8> = (0..cols * cols)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 56) as u8
        })
        .collect();
    DynamicImage::ImageLuma8(GrayImage::from_fn(RASTER_SIDE, RASTER_SIDE, |x, y| {
        Luma([values[(y / block) as usize * cols + (x / block) as usize]])
    }))
}

pub fn blank() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(RASTER_SIDE, RASTER_SIDE, Rgb([255, 255, 255])))
}

pub fn png(image: &DynamicImage) -> Vec<u8> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .expect("encode png");
    buf
}

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([30, 120, 200])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .expect("encode jpeg");
    buf
}

// ── MockCodec ────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockCodec;

impl MockCodec {
    fn check(doc: &FakeDoc, page: usize) -> Result<(), CodecError> {
        if page >= doc.pages.len() {
            return Err(CodecError::PageOutOfRange {
                page,
                total: doc.pages.len(),
            });
        }
        Ok(())
    }
}

impl DocumentCodec for MockCodec {
    fn page_sizes(&self, pdf: &[u8]) -> Result<Vec<PageSize>, CodecError> {
        Ok(FakeDoc::from_bytes(pdf)?.pages.iter().map(|p| p.size).collect())
    }

    fn page_texts(&self, pdf: &[u8]) -> Result<Vec<String>, CodecError> {
        Ok(FakeDoc::from_bytes(pdf)?
            .pages
            .iter()
            .map(|p| {
                p.words
                    .iter()
                    .map(|w| w.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect())
    }

    fn find_text(&self, pdf: &[u8], needle: &str) -> Result<Vec<Vec<TextBox>>, CodecError> {
        Ok(FakeDoc::from_bytes(pdf)?
            .pages
            .iter()
            .map(|p| {
                p.words
                    .iter()
                    .filter(|w| w.text.contains(needle))
                    .map(|w| w.area)
                    .collect()
            })
            .collect())
    }

    fn render_pages(&self, pdf: &[u8], _scale: f32) -> Result<Vec<DynamicImage>, CodecError> {
        let doc = FakeDoc::from_bytes(pdf)?;
        Ok(doc
            .pages
            .iter()
            .map(|page| match page.seed {
                0 => blank(),
                seed => textured(seed),
            })
            .collect())
    }

    fn apply_edits(&self, pdf: &[u8], edits: &[PageEdit]) -> Result<Vec<u8>, CodecError> {
        let mut doc = FakeDoc::from_bytes(pdf)?;
        for edit in edits {
            match edit {
                PageEdit::Redact {
                    page, area, text, ..
                } => {
                    Self::check(&doc, *page)?;
                    let p = &mut doc.pages[*page];
                    p.words.retain(|w| !(w.text.contains(text.as_str()) && w.area.intersects(area)));
                    p.fills.push(*area);
                }
                PageEdit::Text {
                    page,
                    x,
                    y,
                    anchor,
                    text,
                    font_size,
                    opacity,
                    ..
                } => {
                    Self::check(&doc, *page)?;
                    let baseline = anchor.baseline(*y, *font_size);
                    doc.pages[*page].words.push(FakeWord {
                        text: text.clone(),
                        area: TextBox {
                            left: *x,
                            bottom: baseline,
                            right: *x + text.chars().count() as f32 * font_size * 0.5,
                            top: baseline + font_size,
                        },
                        opacity: *opacity,
                    });
                }
            }
        }
        Ok(doc.to_bytes())
    }

    fn image_page(&self, image: &DynamicImage, resolution: f32) -> Result<Vec<u8>, CodecError> {
        let (w, h) = (image.width(), image.height());
        Ok(doc(vec![FakePage {
            size: PageSize {
                width: w as f32 * 72.0 / resolution,
                height: h as f32 * 72.0 / resolution,
            },
            words: Vec::new(),
            seed: 0,
            fills: Vec::new(),
            image: Some((w, h)),
        }]))
    }

    fn insert_pages(&self, pdf: &[u8], fragment: &[u8], at: usize) -> Result<Vec<u8>, CodecError> {
        let mut doc = FakeDoc::from_bytes(pdf)?;
        let fragment = FakeDoc::from_bytes(fragment)?;
        if at > doc.pages.len() {
            return Err(CodecError::PageOutOfRange {
                page: at,
                total: doc.pages.len(),
            });
        }
        doc.pages.splice(at..at, fragment.pages);
        Ok(doc.to_bytes())
    }

    fn retain_pages(&self, pdf: &[u8], keep: &[usize]) -> Result<Vec<u8>, CodecError> {
        let mut doc = FakeDoc::from_bytes(pdf)?;
        let mut pages = Vec::with_capacity(keep.len());
        for &index in keep {
            Self::check(&doc, index)?;
            pages.push(doc.pages[index].clone());
        }
        doc.pages = pages;
        Ok(doc.to_bytes())
    }

    fn set_thumbnail(&self, pdf: &[u8], thumbnail: &Thumbnail) -> Result<Vec<u8>, CodecError> {
        let mut doc = FakeDoc::from_bytes(pdf)?;
        doc.thumbnail = Some((thumbnail.width, thumbnail.height));
        Ok(doc.to_bytes())
    }

    fn remove_thumbnail(&self, pdf: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut doc = FakeDoc::from_bytes(pdf)?;
        doc.thumbnail = None;
        Ok(doc.to_bytes())
    }
}

/// [`MockCodec`] that records which primitive each document parse came from.
#[derive(Default)]
pub struct CountingCodec {
    pub parses: Mutex<Vec<&'static str>>,
}

impl CountingCodec {
    pub fn parses(&self) -> Vec<&'static str> {
        self.parses.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.parses.lock().unwrap().push(call);
    }
}

impl DocumentCodec for CountingCodec {
    fn page_sizes(&self, pdf: &[u8]) -> Result<Vec<PageSize>, CodecError> {
        self.record("page_sizes");
        MockCodec.page_sizes(pdf)
    }

    fn page_texts(&self, pdf: &[u8]) -> Result<Vec<String>, CodecError> {
        self.record("page_texts");
        MockCodec.page_texts(pdf)
    }

    fn find_text(&self, pdf: &[u8], needle: &str) -> Result<Vec<Vec<TextBox>>, CodecError> {
        self.record("find_text");
        MockCodec.find_text(pdf, needle)
    }

    fn render_pages(&self, pdf: &[u8], scale: f32) -> Result<Vec<DynamicImage>, CodecError> {
        self.record("render_pages");
        MockCodec.render_pages(pdf, scale)
    }

    fn apply_edits(&self, pdf: &[u8], edits: &[PageEdit]) -> Result<Vec<u8>, CodecError> {
        self.record("apply_edits");
        MockCodec.apply_edits(pdf, edits)
    }

    fn image_page(&self, image: &DynamicImage, resolution: f32) -> Result<Vec<u8>, CodecError> {
        MockCodec.image_page(image, resolution)
    }

    fn insert_pages(&self, pdf: &[u8], fragment: &[u8], at: usize) -> Result<Vec<u8>, CodecError> {
        self.record("insert_pages");
        MockCodec.insert_pages(pdf, fragment, at)
    }

    fn retain_pages(&self, pdf: &[u8], keep: &[usize]) -> Result<Vec<u8>, CodecError> {
        self.record("retain_pages");
        MockCodec.retain_pages(pdf, keep)
    }

    fn set_thumbnail(&self, pdf: &[u8], thumbnail: &Thumbnail) -> Result<Vec<u8>, CodecError> {
        self.record("set_thumbnail");
        MockCodec.set_thumbnail(pdf, thumbnail)
    }

    fn remove_thumbnail(&self, pdf: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.record("remove_thumbnail");
        MockCodec.remove_thumbnail(pdf)
    }
}

// ── MockMuxer ────────────────────────────────────────────────────────────────

/// Writes `<input bytes> + tag` to the output. Inputs whose bytes contain
/// `fail_marker` fail; inputs containing `hang_marker` never finish. Every
/// staged cover file is recorded.
pub struct MockMuxer {
    pub fail_marker: Option<Vec<u8>>,
    pub hang_marker: Option<Vec<u8>>,
    pub calls: Mutex<Vec<String>>,
    pub covers: Mutex<Vec<Vec<u8>>>,
}

impl MockMuxer {
    pub fn new() -> Self {
        Self {
            fail_marker: None,
            hang_marker: None,
            calls: Mutex::new(Vec::new()),
            covers: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(marker: &[u8]) -> Self {
        Self {
            fail_marker: Some(marker.to_vec()),
            ..Self::new()
        }
    }

    pub fn hanging_on(marker: &[u8]) -> Self {
        Self {
            hang_marker: Some(marker.to_vec()),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn covers(&self) -> Vec<Vec<u8>> {
        self.covers.lock().unwrap().clone()
    }

    async fn transform(&self, call: String, input: &Path, output: &Path, tag: &[u8]) -> Result<(), ToolError> {
        self.calls.lock().unwrap().push(call);
        let mut bytes = tokio::fs::read(input).await?;
        if let Some(marker) = &self.hang_marker {
            if contains(&bytes, marker) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
        }
        if let Some(marker) = &self.fail_marker {
            if contains(&bytes, marker) {
                return Err(ToolError::Failed {
                    status: "exit status: 1".into(),
                    stderr: "Invalid data found when processing input".into(),
                });
            }
        }
        bytes.extend_from_slice(tag);
        tokio::fs::write(output, bytes).await?;
        Ok(())
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[async_trait]
impl VideoMuxer for MockMuxer {
    fn tool_name(&self) -> &str {
        "mock-ffmpeg"
    }

    async fn attach_cover(&self, video: &Path, cover: &Path, output: &Path) -> Result<(), ToolError> {
        let staged = tokio::fs::read(cover).await?;
        self.covers.lock().unwrap().push(staged);
        self.transform("attach_cover".into(), video, output, b"+cover").await
    }

    async fn burn_caption(
        &self,
        video: &Path,
        caption: &str,
        _font_size: u32,
        output: &Path,
    ) -> Result<(), ToolError> {
        let tag = format!("+caption:{caption}");
        self.transform(format!("burn_caption:{caption}"), video, output, tag.as_bytes())
            .await
    }
}

// ── RecordingTransport ───────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingTransport {
    pub replies: Mutex<Vec<Reply>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything recorded so far.
    pub fn take(&self) -> Vec<Reply> {
        std::mem::take(&mut *self.replies.lock().unwrap())
    }

    pub fn texts(replies: &[Reply]) -> Vec<String> {
        replies
            .iter()
            .filter_map(|r| match r {
                Reply::Text(t) => Some(t.clone()),
                Reply::Menu { text, .. } => Some(text.clone()),
                Reply::File { .. } => None,
            })
            .collect()
    }

    pub fn files(replies: &[Reply]) -> Vec<(String, Vec<u8>)> {
        replies
            .iter()
            .filter_map(|r| match r {
                Reply::File {
                    filename, bytes, ..
                } => Some((filename.clone(), bytes.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn menu_ids(replies: &[Reply]) -> Vec<Vec<String>> {
        replies
            .iter()
            .filter_map(|r| match r {
                Reply::Menu { options, .. } => {
                    Some(options.iter().map(|o| o.action_id.clone()).collect())
                }
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn reply(&self, text: &str) -> Result<(), DocflowError> {
        self.replies.lock().unwrap().push(Reply::text(text));
        Ok(())
    }

    async fn reply_with_file(
        &self,
        bytes: &[u8],
        filename: &str,
        caption: Option<&str>,
    ) -> Result<(), DocflowError> {
        self.replies.lock().unwrap().push(Reply::File {
            bytes: bytes.to_vec(),
            filename: filename.to_string(),
            caption: caption.map(str::to_string),
        });
        Ok(())
    }

    async fn reply_with_menu(&self, text: &str, options: &[MenuOption]) -> Result<(), DocflowError> {
        self.replies.lock().unwrap().push(Reply::Menu {
            text: text.to_string(),
            options: options.to_vec(),
        });
        Ok(())
    }
}
