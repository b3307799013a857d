//! Video cover and caption handlers.
//!
//! ## Scratch files
//!
//! Each video gets its own [`TempDir`] (prefix `docflow-`) holding the staged
//! input, the cover image, any intermediate file and the output. The directory
//! is removed when it drops, which covers success, a reported failure and a
//! timeout alike.
//!
//! ## Bounded waits
//!
//! Every muxer call is wrapped in [`tokio::time::timeout`]. On expiry the
//! future is dropped, which kills the child process, and the item is reported
//! as [`ItemError::Timeout`].
//!
//! ## Cover image
//!
//! The uploaded cover is decoded and re-encoded once as an RGB JPEG before
//! any video is touched. An unreadable cover fails the whole call with
//! [`HandlerError::BadImage`].

use crate::config::EngineConfig;
use crate::error::{HandlerError, ItemError, ToolError};
use crate::handlers::thumbnail::{decode_rgb, encode_jpeg};
use crate::handlers::{processing, Batch, HandlerOutput, ItemOutcome, OutputItem};
use crate::media::VideoMuxer;
use crate::session::MediaItem;
use std::future::Future;
use std::path::Path;
use tempfile::TempDir;

/// Attach `cover` to every video without re-encoding.
pub async fn set_cover(
    muxer: &dyn VideoMuxer,
    config: &EngineConfig,
    videos: &[MediaItem],
    cover: &[u8],
) -> Result<HandlerOutput, HandlerError> {
    let cover = cover_jpeg(cover)?;
    Ok(run_batch(muxer, config, "video_cover", videos, &cover, None).await)
}

/// Burn `caption` into every video, then attach `cover` in a second pass.
pub async fn caption_and_cover(
    muxer: &dyn VideoMuxer,
    config: &EngineConfig,
    videos: &[MediaItem],
    cover: &[u8],
    caption: &str,
) -> Result<HandlerOutput, HandlerError> {
    let cover = cover_jpeg(cover)?;
    Ok(run_batch(muxer, config, "video_caption", videos, &cover, Some(caption)).await)
}

/// The uploaded cover as an RGB JPEG, whatever format it arrived in.
pub fn cover_jpeg(image: &[u8]) -> Result<Vec<u8>, HandlerError> {
    encode_jpeg(&decode_rgb(image)?)
}

async fn run_batch(
    muxer: &dyn VideoMuxer,
    config: &EngineConfig,
    operation: &'static str,
    videos: &[MediaItem],
    cover: &[u8],
    caption: Option<&str>,
) -> HandlerOutput {
    let mut batch = Batch::start(config, operation, videos.len());
    for (index, video) in videos.iter().enumerate() {
        batch.begin(index, &video.name);
        let result = process_one(muxer, config, video, cover, caption)
            .await
            .map(|bytes| {
                let name = match caption {
                    Some(_) => format!("watermarked_{}", video.name),
                    None => format!("thumb_{}", video.name),
                };
                ItemOutcome::Output(OutputItem {
                    name,
                    bytes,
                    caption: Some(match caption {
                        Some(_) => "✅ Watermark and thumbnail added".to_string(),
                        None => "✅ Thumbnail set".to_string(),
                    }),
                })
            });
        batch.finish(index, &video.name, result);
    }
    batch.end()
}

async fn process_one(
    muxer: &dyn VideoMuxer,
    config: &EngineConfig,
    video: &MediaItem,
    cover: &[u8],
    caption: Option<&str>,
) -> Result<Vec<u8>, ItemError> {
    let scratch = scratch_dir(config).map_err(|e| processing(&video.name, e))?;
    let ext = extension(&video.name);
    let input = scratch.path().join(format!("input.{ext}"));
    let cover_path = scratch.path().join("cover.jpg");
    let output = scratch.path().join(format!("output.{ext}"));

    tokio::fs::write(&input, &video.bytes)
        .await
        .map_err(|e| processing(&video.name, e))?;
    tokio::fs::write(&cover_path, cover)
        .await
        .map_err(|e| processing(&video.name, e))?;

    let source = match caption {
        Some(text) => {
            let captioned = scratch.path().join(format!("captioned.{ext}"));
            bounded(
                muxer,
                config,
                &video.name,
                muxer.burn_caption(&input, text, config.video_caption_font_size, &captioned),
            )
            .await?;
            captioned
        }
        None => input,
    };

    bounded(
        muxer,
        config,
        &video.name,
        muxer.attach_cover(&source, &cover_path, &output),
    )
    .await?;

    tokio::fs::read(&output)
        .await
        .map_err(|e| processing(&video.name, e))
}

fn scratch_dir(config: &EngineConfig) -> std::io::Result<TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("docflow-");
    match &config.temp_root {
        Some(root) => builder.tempdir_in(root),
        None => builder.tempdir(),
    }
}

/// Await one tool call under the configured timeout.
async fn bounded<F>(
    muxer: &dyn VideoMuxer,
    config: &EngineConfig,
    item: &str,
    call: F,
) -> Result<(), ItemError>
where
    F: Future<Output = Result<(), ToolError>>,
{
    match tokio::time::timeout(config.tool_timeout(), call).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ItemError::ExternalTool {
            item: item.to_string(),
            tool: muxer.tool_name().to_string(),
            detail: e.to_string(),
        }),
        Err(_) => Err(ItemError::Timeout {
            item: item.to_string(),
            secs: config.tool_timeout_secs,
        }),
    }
}

/// Container extension of `name`, `mp4` when it has none.
fn extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "mp4".to_string())
}
