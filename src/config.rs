//! Configuration for the workflow engine and its transform handlers.
//!
//! Every tunable lives in [`EngineConfig`], built via
//! [`EngineConfigBuilder`]. The matcher and layout constants are fixed values
//! in practice, but they are kept here with documented defaults so a
//! deployment can recalibrate them without touching handler code.

use crate::error::DocflowError;
use crate::progress::BatchProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for the workflow engine.
///
/// # Example
/// ```rust
/// use edgequake_docflow::EngineConfig;
///
/// let config = EngineConfig::builder()
///     .match_threshold(40)
///     .tool_timeout_secs(120)
///     .build()
///     .unwrap();
/// assert_eq!(config.match_threshold, 40);
/// ```
#[derive(Clone)]
pub struct EngineConfig {
    /// Lowe ratio for the nearest-neighbour test. Default: 0.75.
    ///
    /// A correspondence is accepted only when the nearest descriptor distance
    /// is below `match_ratio` times the second-nearest distance.
    pub match_ratio: f32,

    /// Accepted correspondences a page must *exceed* to be deleted. Default: 50.
    pub match_threshold: usize,

    /// Upscaling factor applied when rasterising pages for matching. Default: 2.0.
    ///
    /// Small features disappear at native PDF resolution; rendering at twice
    /// the page size keeps them extractable.
    pub render_scale: f32,

    /// Maximum keypoints kept per image, strongest first. Default: 800.
    pub max_keypoints: usize,

    /// Watermark caption size in points. Default: 10.
    pub watermark_font_size: f32,

    /// Approximate advance per character used to centre the caption. Default: 5.
    pub watermark_char_width: f32,

    /// Caption baseline distance above the bottom page edge, in points. Default: 20.
    pub watermark_bottom_margin: f32,

    /// Grey level of the caption fill (0 black – 1 white). Default: 0.5.
    pub watermark_gray: f32,

    /// Smallest accepted opacity (inclusive). Default: 0.1.
    pub min_opacity: f32,

    /// Largest accepted opacity (inclusive). Default: 1.0.
    pub max_opacity: f32,

    /// Replacement text size in points. Default: 10.
    pub replace_font_size: f32,

    /// Longest side of an embedded document thumbnail. Default: 256.
    pub thumbnail_max_side: u32,

    /// Resolution used to size an inserted image page. Default: 100 DPI.
    pub insert_page_resolution: f32,

    /// Number of word suggestions offered for find & replace. Default: 30.
    pub suggestion_limit: usize,

    /// Minimum word length counted for suggestions. Default: 3.
    pub min_word_len: usize,

    /// Placeholder replaced by the 1-based index when renaming. Default: `{n}`.
    pub rename_placeholder: String,

    /// Extension appended to renamed files that lack it. Default: `.pdf`.
    pub rename_extension: String,

    /// Bounded wait for each external tool invocation. Default: 600 s.
    pub tool_timeout_secs: u64,

    /// Burned-in video caption size. Default: 24.
    pub video_caption_font_size: u32,

    /// Parent directory for per-item scratch directories. Default: system temp.
    pub temp_root: Option<PathBuf>,

    /// Receives per-item events while a batch runs.
    pub progress_callback: Option<Arc<dyn BatchProgressCallback>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            match_ratio: 0.75,
            match_threshold: 50,
            render_scale: 2.0,
            max_keypoints: 800,
            watermark_font_size: 10.0,
            watermark_char_width: 5.0,
            watermark_bottom_margin: 20.0,
            watermark_gray: 0.5,
            min_opacity: 0.1,
            max_opacity: 1.0,
            replace_font_size: 10.0,
            thumbnail_max_side: 256,
            insert_page_resolution: 100.0,
            suggestion_limit: 30,
            min_word_len: 3,
            rename_placeholder: "{n}".to_string(),
            rename_extension: ".pdf".to_string(),
            tool_timeout_secs: 600,
            video_caption_font_size: 24,
            temp_root: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("match_ratio", &self.match_ratio)
            .field("match_threshold", &self.match_threshold)
            .field("render_scale", &self.render_scale)
            .field("max_keypoints", &self.max_keypoints)
            .field("watermark_font_size", &self.watermark_font_size)
            .field("min_opacity", &self.min_opacity)
            .field("max_opacity", &self.max_opacity)
            .field("thumbnail_max_side", &self.thumbnail_max_side)
            .field("suggestion_limit", &self.suggestion_limit)
            .field("tool_timeout_secs", &self.tool_timeout_secs)
            .field("temp_root", &self.temp_root)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl EngineConfig {
    /// Create a new builder for `EngineConfig`.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder {
            config: Self::default(),
        }
    }

    /// The bounded wait applied to every external tool call.
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    /// Whether `opacity` lies inside the accepted inclusive range.
    pub fn opacity_in_range(&self, opacity: f32) -> bool {
        opacity >= self.min_opacity && opacity <= self.max_opacity
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn match_ratio(mut self, ratio: f32) -> Self {
        self.config.match_ratio = ratio;
        self
    }

    pub fn match_threshold(mut self, n: usize) -> Self {
        self.config.match_threshold = n;
        self
    }

    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale;
        self
    }

    pub fn max_keypoints(mut self, n: usize) -> Self {
        self.config.max_keypoints = n.max(1);
        self
    }

    pub fn watermark_font_size(mut self, pt: f32) -> Self {
        self.config.watermark_font_size = pt;
        self
    }

    pub fn replace_font_size(mut self, pt: f32) -> Self {
        self.config.replace_font_size = pt;
        self
    }

    pub fn thumbnail_max_side(mut self, px: u32) -> Self {
        self.config.thumbnail_max_side = px;
        self
    }

    pub fn suggestion_limit(mut self, n: usize) -> Self {
        self.config.suggestion_limit = n;
        self
    }

    pub fn tool_timeout_secs(mut self, secs: u64) -> Self {
        self.config.tool_timeout_secs = secs;
        self
    }

    pub fn video_caption_font_size(mut self, size: u32) -> Self {
        self.config.video_caption_font_size = size.max(1);
        self
    }

    pub fn temp_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_root = Some(dir.into());
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn BatchProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<EngineConfig, DocflowError> {
        let c = &self.config;
        if !(c.match_ratio > 0.0 && c.match_ratio <= 1.0) {
            return Err(DocflowError::InvalidConfig(format!(
                "match ratio must be in (0, 1], got {}",
                c.match_ratio
            )));
        }
        if c.render_scale < 1.0 {
            return Err(DocflowError::InvalidConfig(format!(
                "render scale must be ≥ 1.0, got {}",
                c.render_scale
            )));
        }
        if c.min_opacity <= 0.0 || c.min_opacity > c.max_opacity || c.max_opacity > 1.0 {
            return Err(DocflowError::InvalidConfig(format!(
                "opacity range [{}, {}] is invalid",
                c.min_opacity, c.max_opacity
            )));
        }
        if c.watermark_font_size <= 0.0 || c.replace_font_size <= 0.0 {
            return Err(DocflowError::InvalidConfig(
                "font sizes must be positive".into(),
            ));
        }
        if c.thumbnail_max_side == 0 {
            return Err(DocflowError::InvalidConfig(
                "thumbnail size must be ≥ 1".into(),
            ));
        }
        if c.tool_timeout_secs == 0 {
            return Err(DocflowError::InvalidConfig(
                "tool timeout must be ≥ 1 second".into(),
            ));
        }
        if c.rename_placeholder.is_empty() {
            return Err(DocflowError::InvalidConfig(
                "rename placeholder must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
