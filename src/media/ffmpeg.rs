//! [`VideoMuxer`] that shells out to the `ffmpeg` binary.

use crate::error::ToolError;
use crate::media::VideoMuxer;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Bytes of stderr kept in a failure report.
const STDERR_TAIL: usize = 2_000;

#[derive(Debug, Clone)]
pub struct FfmpegMuxer {
    binary: PathBuf,
}

impl Default for FfmpegMuxer {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegMuxer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Run ffmpeg with `args` and check that `output` was written.
    ///
    /// The child is killed if this future is dropped.
    async fn run(&self, args: Vec<OsString>, output: &Path) -> Result<(), ToolError> {
        debug!(binary = %self.binary.display(), ?args, "Running ffmpeg");
        let result = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ToolError::Spawn {
                binary: self.binary.display().to_string(),
                source,
            })?;

        if !result.status.success() {
            return Err(ToolError::Failed {
                status: result.status.to_string(),
                stderr: stderr_tail(&result.stderr),
            });
        }
        if !tokio::fs::try_exists(output).await? {
            return Err(ToolError::MissingOutput {
                path: output.to_path_buf(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl VideoMuxer for FfmpegMuxer {
    fn tool_name(&self) -> &str {
        "ffmpeg"
    }

    async fn attach_cover(&self, video: &Path, cover: &Path, output: &Path) -> Result<(), ToolError> {
        self.run(cover_args(video, cover, output), output).await
    }

    async fn burn_caption(
        &self,
        video: &Path,
        caption: &str,
        font_size: u32,
        output: &Path,
    ) -> Result<(), ToolError> {
        // drawtext reads the caption from a file so no quoting of user text
        // is needed in the filter graph.
        let caption_file = output.with_extension("caption.txt");
        tokio::fs::write(&caption_file, caption).await?;
        let result = self
            .run(caption_args(video, &caption_file, font_size, output), output)
            .await;
        let _ = tokio::fs::remove_file(&caption_file).await;
        result
    }
}

fn cover_args(video: &Path, cover: &Path, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-y".into(), "-i".into()];
    args.push(video.into());
    args.push("-i".into());
    args.push(cover.into());
    for arg in ["-map", "0", "-map", "1", "-c", "copy", "-disposition:v:1", "attached_pic"] {
        args.push(arg.into());
    }
    args.push(output.into());
    args
}

fn caption_args(video: &Path, caption_file: &Path, font_size: u32, output: &Path) -> Vec<OsString> {
    let filter = format!(
        "drawtext=textfile='{}':expansion=none:fontsize={}:fontcolor=white:\
borderw=2:bordercolor=black:x=(w-text_w)/2:y=h-text_h-10",
        escape_filter_path(caption_file),
        font_size
    );
    let mut args: Vec<OsString> = vec!["-y".into(), "-i".into()];
    args.push(video.into());
    for arg in ["-vf", filter.as_str(), "-c:v", "libx264", "-c:a", "aac"] {
        args.push(arg.into());
    }
    args.push(output.into());
    args
}

/// Escape a path for use inside a single-quoted filter option.
fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace('\'', r"'\''")
        .replace(':', r"\:")
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let trimmed = text.trim();
    let start = trimmed
        .char_indices()
        .map(|(i, _)| i)
        .find(|&i| trimmed.len() - i <= STDERR_TAIL)
        .unwrap_or(trimmed.len());
    trimmed[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn cover_copies_streams_and_marks_attached_pic() {
        let args = strings(&cover_args(
            Path::new("/t/in.mp4"),
            Path::new("/t/cover.jpg"),
            Path::new("/t/out.mp4"),
        ));
        assert_eq!(
            args,
            vec![
                "-y", "-i", "/t/in.mp4", "-i", "/t/cover.jpg", "-map", "0", "-map", "1", "-c",
                "copy", "-disposition:v:1", "attached_pic", "/t/out.mp4"
            ]
        );
    }

    #[test]
    fn caption_reencodes_with_drawtext() {
        let args = strings(&caption_args(
            Path::new("/t/in.mp4"),
            Path::new("/t/out.caption.txt"),
            24,
            Path::new("/t/out.mp4"),
        ));
        let filter = &args[args.iter().position(|a| a == "-vf").unwrap() + 1];
        assert!(filter.starts_with("drawtext=textfile='/t/out.caption.txt'"));
        assert!(filter.contains("fontsize=24"));
        assert!(filter.contains("x=(w-text_w)/2"));
        assert!(args.windows(2).any(|w| w == ["-c:v", "libx264"]));
        assert!(args.windows(2).any(|w| w == ["-c:a", "aac"]));
    }

    #[test]
    fn filter_paths_are_escaped() {
        assert_eq!(escape_filter_path(Path::new("/a:b/it's")), r"/a\:b/it'\''s");
    }

    #[test]
    fn stderr_keeps_the_end() {
        let long = "x".repeat(STDERR_TAIL + 100) + "END";
        let tail = stderr_tail(long.as_bytes());
        assert!(tail.ends_with("END"));
        assert!(tail.len() <= STDERR_TAIL);
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let muxer = FfmpegMuxer::new("/nonexistent/ffmpeg-binary");
        let err = muxer
            .attach_cover(Path::new("a"), Path::new("b"), Path::new("c"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
    }
}
