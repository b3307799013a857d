//! Console front end for edgequake-docflow.
//!
//! A thin transport over stdin/stdout: every line becomes an [`Event`] for one
//! operator, replies are printed, and returned files are written to the
//! output directory.

use anyhow::{bail, Context, Result};
use clap::Parser;
use edgequake_docflow::{
    Authorizer, BatchProgressCallback, DocflowError, Engine, EngineConfig, Event, FfmpegMuxer,
    MenuOption, PdfiumCodec, SingleOperator, Transport, UploadKind, UserId,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Renders one progress bar per batch and a log line per item.
struct CliBatchProgress {
    bar: Mutex<Option<ProgressBar>>,
    errors: AtomicUsize,
}

impl CliBatchProgress {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(None),
            errors: AtomicUsize::new(0),
        })
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Some(bar) = self.bar.lock().unwrap_or_else(|p| p.into_inner()).as_ref() {
            f(bar);
        }
    }
}

impl BatchProgressCallback for CliBatchProgress {
    fn on_batch_start(&self, operation: &str, total: usize) {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} files  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix(operation.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        self.errors.store(0, Ordering::SeqCst);
        *self.bar.lock().unwrap_or_else(|p| p.into_inner()) = Some(bar);
    }

    fn on_item_start(&self, _index: usize, _total: usize, name: &str) {
        self.with_bar(|bar| bar.set_message(name.to_string()));
    }

    fn on_item_complete(&self, index: usize, total: usize, name: &str) {
        self.with_bar(|bar| {
            bar.println(format!("  {} {:>3}/{:<3}  {}", green("✓"), index, total, name));
            bar.inc(1);
        });
    }

    fn on_item_error(&self, index: usize, total: usize, name: &str, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.with_bar(|bar| {
            bar.println(format!(
                "  {} {:>3}/{:<3}  {}  {}",
                red("✗"),
                index,
                total,
                name,
                red(&msg)
            ));
            bar.inc(1);
        });
    }

    fn on_batch_complete(&self, total: usize, success_count: usize) {
        if let Some(bar) = self.bar.lock().unwrap_or_else(|p| p.into_inner()).take() {
            bar.finish_and_clear();
        }
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!("{} {} of {} files done", green("✔"), bold(&success_count.to_string()), total);
        } else {
            eprintln!(
                "{} {}/{} files done  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

// ── Console transport ────────────────────────────────────────────────────────

/// Prints replies and saves returned files. Remembers the last menu so `#n`
/// can press its n-th button.
struct ConsoleTransport {
    output_dir: PathBuf,
    last_menu: Mutex<Vec<MenuOption>>,
}

impl ConsoleTransport {
    fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            last_menu: Mutex::new(Vec::new()),
        }
    }

    /// Action id of the `n`-th (1-based) button of the last menu.
    fn menu_choice(&self, n: usize) -> Option<String> {
        let menu = self.last_menu.lock().unwrap_or_else(|p| p.into_inner());
        n.checked_sub(1)
            .and_then(|i| menu.get(i))
            .map(|o| o.action_id.clone())
    }
}

#[async_trait::async_trait]
impl Transport for ConsoleTransport {
    async fn reply(&self, text: &str) -> Result<(), DocflowError> {
        println!("{text}");
        Ok(())
    }

    async fn reply_with_file(
        &self,
        bytes: &[u8],
        filename: &str,
        caption: Option<&str>,
    ) -> Result<(), DocflowError> {
        let safe = Path::new(filename)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "output.bin".into());
        let path = self.output_dir.join(safe);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| DocflowError::Transport(format!("{}: {e}", path.display())))?;
        println!(
            "{} {}  {}",
            cyan("📎"),
            bold(&path.display().to_string()),
            dim(caption.unwrap_or(""))
        );
        Ok(())
    }

    async fn reply_with_menu(&self, text: &str, options: &[MenuOption]) -> Result<(), DocflowError> {
        println!("{}", bold(text));
        for (i, option) in options.iter().enumerate() {
            println!("  {} {}  {}", cyan(&format!("#{}", i + 1)), option.label, dim(&option.action_id));
        }
        *self.last_menu.lock().unwrap_or_else(|p| p.into_inner()) = options.to_vec();
        Ok(())
    }
}

// ── Input parsing ────────────────────────────────────────────────────────────

/// What one console line asks for.
enum Command {
    Event(Event),
    Upload(PathBuf),
    Choice(usize),
    Quit,
}

fn parse_line(line: &str) -> Command {
    let trimmed = line.trim();
    if trimmed == "/quit" || trimmed == "/exit" {
        return Command::Quit;
    }
    if trimmed == "/start" {
        return Command::Event(Event::button("start"));
    }
    if let Some(action) = trimmed.strip_prefix("/press ") {
        return Command::Event(Event::button(action.trim()));
    }
    if let Some(path) = trimmed.strip_prefix("/upload ") {
        return Command::Upload(PathBuf::from(path.trim()));
    }
    if let Some(n) = trimmed.strip_prefix('#').and_then(|n| n.parse().ok()) {
        return Command::Choice(n);
    }
    Command::Event(Event::text(line))
}

fn upload_kind(path: &Path) -> Option<UploadKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some(UploadKind::Document),
        "jpg" | "jpeg" | "png" | "webp" | "gif" | "bmp" => Some(UploadKind::Image),
        "mp4" | "mov" | "mkv" | "avi" | "webm" | "m4v" => Some(UploadKind::Video),
        _ => None,
    }
}

async fn read_upload(path: &Path) -> Result<Event> {
    let Some(kind) = upload_kind(path) else {
        bail!("cannot tell whether {} is a PDF, image or video", path.display());
    };
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(Event::upload(kind, name, bytes))
}

// ── CLI ──────────────────────────────────────────────────────────────────────

const AFTER_HELP: &str = r#"COMMANDS (one per line on stdin):
  /start              open the main menu
  #3                  press the 3rd button of the last menu
  /press <action>     press a button by id (pdf_tools, add_watermark, skip_replace, ...)
  /upload <path>      upload a file; .pdf, image and video types are recognised
  /quit               exit
  anything else       sent as text (watermark text, opacity, page number, ...)

EXAMPLE SESSION:
  /start
  /press upload_pdf
  /upload report.pdf
  /press pdf_tools
  /press add_watermark
  CONFIDENTIAL
  0.3

ENVIRONMENT VARIABLES:
  ALLOWED_USER_ID   Only this operator id is served
  PDFIUM_LIB_PATH   Path to libpdfium (file or directory)
  FFMPEG_PATH       ffmpeg binary to run for video jobs
"#;

#[derive(Parser, Debug)]
#[command(
    name = "docflow",
    version,
    about = "Chat-style PDF and video editing workflows on the console",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Operator id the console speaks as.
    #[arg(long, env = "DOCFLOW_USER_ID", default_value_t = 1)]
    user_id: i64,

    /// Refuse to start unless `--user-id` matches.
    #[arg(long, env = "ALLOWED_USER_ID")]
    allowed_user_id: Option<i64>,

    /// Where returned files are written.
    #[arg(short, long, env = "DOCFLOW_OUTPUT_DIR", default_value = "docflow-out")]
    output_dir: PathBuf,

    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    #[arg(long, env = "FFMPEG_PATH", default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// Seconds before an ffmpeg call is abandoned.
    #[arg(long, env = "DOCFLOW_TOOL_TIMEOUT", default_value_t = 600)]
    tool_timeout: u64,

    /// Parent directory for per-item scratch directories.
    #[arg(long, env = "DOCFLOW_TEMP_DIR")]
    temp_dir: Option<PathBuf>,

    #[arg(long, env = "DOCFLOW_NO_PROGRESS")]
    no_progress: bool,

    #[arg(short, long, env = "DOCFLOW_VERBOSE")]
    verbose: bool,

    #[arg(short, long, env = "DOCFLOW_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let user = UserId(cli.user_id);
    if let Some(allowed) = cli.allowed_user_id {
        if !SingleOperator(UserId(allowed)).is_authorized(user) {
            bail!("user {} is not the allowed operator", user);
        }
    }

    // ── Build engine ─────────────────────────────────────────────────────
    let mut builder = EngineConfig::builder().tool_timeout_secs(cli.tool_timeout);
    if let Some(ref dir) = cli.temp_dir {
        builder = builder.temp_root(dir);
    }
    if !cli.quiet && !cli.no_progress {
        builder = builder.progress_callback(CliBatchProgress::new());
    }
    let config = builder.build().context("Invalid configuration")?;

    let codec = match cli.pdfium_lib {
        Some(ref path) => PdfiumCodec::with_library(path),
        None => PdfiumCodec::default(),
    };
    let engine = Engine::new(
        config,
        Arc::new(codec),
        Arc::new(FfmpegMuxer::new(&cli.ffmpeg)),
    );

    tokio::fs::create_dir_all(&cli.output_dir)
        .await
        .with_context(|| format!("Failed to create {}", cli.output_dir.display()))?;
    let transport = ConsoleTransport::new(cli.output_dir.clone());

    if !cli.quiet {
        eprintln!("{} {}", cyan("◆"), bold("docflow ready. Type /start, or /quit to exit."));
    }

    // ── Event loop ───────────────────────────────────────────────────────
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        let event = match parse_line(&line) {
            Command::Quit => break,
            Command::Event(event) => event,
            Command::Choice(n) => match transport.menu_choice(n) {
                Some(id) => Event::button(id),
                None => {
                    eprintln!("{} no button #{n} on the last menu", red("✗"));
                    continue;
                }
            },
            Command::Upload(path) => match read_upload(&path).await {
                Ok(event) => event,
                Err(e) => {
                    eprintln!("{} {e:#}", red("✗"));
                    continue;
                }
            },
        };
        engine
            .handle(user, event, &transport)
            .await
            .context("Failed to handle event")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_upload_kinds() {
        assert_eq!(upload_kind(Path::new("a.PDF")), Some(UploadKind::Document));
        assert_eq!(upload_kind(Path::new("shot.png")), Some(UploadKind::Image));
        assert_eq!(upload_kind(Path::new("clip.mov")), Some(UploadKind::Video));
        assert_eq!(upload_kind(Path::new("notes.txt")), None);
        assert_eq!(upload_kind(Path::new("noext")), None);
    }

    #[test]
    fn parses_console_commands() {
        assert!(matches!(parse_line("/quit"), Command::Quit));
        assert!(matches!(parse_line("#2"), Command::Choice(2)));
        assert!(matches!(
            parse_line("/press add_watermark"),
            Command::Event(Event::ButtonPressed(ref id)) if id == "add_watermark"
        ));
        assert!(matches!(
            parse_line("0.3"),
            Command::Event(Event::TextEntered(ref t)) if t == "0.3"
        ));
        assert!(matches!(parse_line("/upload a.pdf"), Command::Upload(_)));
    }

    #[test]
    fn menu_choice_is_one_based() {
        let transport = ConsoleTransport::new(PathBuf::from("."));
        *transport.last_menu.lock().unwrap() = vec![MenuOption {
            label: "Help".into(),
            action_id: "help".into(),
        }];
        assert_eq!(transport.menu_choice(1).as_deref(), Some("help"));
        assert_eq!(transport.menu_choice(0), None);
        assert_eq!(transport.menu_choice(2), None);
    }
}
