//! The per-user workflow state machine.
//!
//! ```text
//!  Event ──► EventKind::of ──► table::lookup(mode, kind) ──► Effect
//!                                                             │
//!            ┌───────────────────────────┬────────────────────┤
//!            ▼                           ▼                    ▼
//!      store input and             reply / menu        terminal: reset to idle,
//!      advance the mode            (mode unchanged)    snapshot a Job for a handler
//! ```
//!
//! [`step`] is pure over the [`Session`]: it never performs I/O and never
//! blocks, so the [`Engine`] runs it inside the per-user exclusive section and
//! releases the lock before any [`Job`] executes.

pub mod engine;
pub mod mode;
pub mod table;
pub mod words;

pub use engine::Engine;
pub use mode::{ModeKind, WorkflowMode};
pub use table::{Effect, EventKind, Transition, TRANSITIONS};

use crate::codec::is_pdf;
use crate::config::EngineConfig;
use crate::error::FlowError;
use crate::menu::{self, Action, HELP_TEXT};
use crate::session::{DocumentItem, MediaItem, Session};
use crate::transport::{Event, Reply};
use std::sync::Arc;
use table::{MenuKind, Requires, When};
use tracing::{debug, error, info};

/// Work handed to the engine once the session lock is released.
#[derive(Debug, Clone)]
pub enum Job {
    /// Compute word suggestions, then enter the find-word step.
    Suggest { documents: Vec<DocumentItem> },
    /// Run a document handler on a blocking worker. The mode is already idle.
    Document(DocumentJob),
    /// Run a video handler. The mode is already idle.
    Video(VideoJob),
}

impl Job {
    /// Short operation name for logs and progress callbacks.
    pub fn operation(&self) -> &'static str {
        match self {
            Job::Suggest { .. } => "suggest_words",
            Job::Document(DocumentJob::Watermark { .. }) => "watermark",
            Job::Document(DocumentJob::DeletePages { .. }) => "delete_pages",
            Job::Document(DocumentJob::InsertPage { .. }) => "insert_page",
            Job::Document(DocumentJob::FindReplace { .. }) => "find_replace",
            Job::Document(DocumentJob::Rename { .. }) => "rename",
            Job::Document(DocumentJob::SetThumbnail { .. }) => "set_thumbnail",
            Job::Document(DocumentJob::RemoveThumbnail { .. }) => "remove_thumbnail",
            Job::Video(VideoJob::Cover { .. }) => "video_cover",
            Job::Video(VideoJob::Caption { .. }) => "video_caption",
        }
    }

    fn busy_text(&self) -> &'static str {
        match self {
            Job::Suggest { .. } => "🔍 Scanning documents for common words...",
            Job::Document(DocumentJob::Watermark { .. }) => "⏳ Adding watermark...",
            Job::Document(DocumentJob::DeletePages { .. }) => "⏳ Matching pages against the image...",
            Job::Document(DocumentJob::InsertPage { .. }) => "⏳ Inserting page...",
            Job::Document(DocumentJob::FindReplace { .. }) => "⏳ Replacing text...",
            Job::Document(DocumentJob::Rename { .. }) => "⏳ Renaming files...",
            Job::Document(DocumentJob::SetThumbnail { .. }) => "⏳ Creating thumbnails...",
            Job::Document(DocumentJob::RemoveThumbnail { .. }) => "⏳ Removing thumbnails...",
            Job::Video(VideoJob::Cover { .. }) => "⏳ Setting video thumbnails...",
            Job::Video(VideoJob::Caption { .. }) => "⏳ Adding watermark and thumbnails...",
        }
    }
}

/// A terminal document handler invocation with every parameter it needs.
#[derive(Debug, Clone)]
pub enum DocumentJob {
    Watermark {
        documents: Vec<DocumentItem>,
        text: String,
        opacity: f32,
    },
    DeletePages {
        documents: Vec<DocumentItem>,
        target: Arc<[u8]>,
    },
    InsertPage {
        documents: Vec<DocumentItem>,
        /// 1-based.
        position: usize,
        image: Arc<[u8]>,
    },
    FindReplace {
        documents: Vec<DocumentItem>,
        find: String,
        /// Empty means redact only.
        replace: String,
    },
    Rename {
        documents: Vec<DocumentItem>,
        pattern: String,
    },
    SetThumbnail {
        documents: Vec<DocumentItem>,
        image: Arc<[u8]>,
    },
    RemoveThumbnail {
        documents: Vec<DocumentItem>,
    },
}

/// A terminal video handler invocation.
#[derive(Debug, Clone)]
pub enum VideoJob {
    Cover {
        videos: Vec<MediaItem>,
        cover: Arc<[u8]>,
    },
    Caption {
        videos: Vec<MediaItem>,
        cover: Arc<[u8]>,
        caption: String,
    },
}

/// Replies to send and an optional job to run, in that order.
#[derive(Debug, Default)]
pub struct Outcome {
    pub replies: Vec<Reply>,
    pub job: Option<Job>,
}

impl Outcome {
    fn reply(reply: Reply) -> Self {
        Self {
            replies: vec![reply],
            job: None,
        }
    }

    fn replies(replies: Vec<Reply>) -> Self {
        Self { replies, job: None }
    }
}

/// Advance `session` by one event.
///
/// Validation and precondition failures leave the mode untouched. A session
/// whose state contradicts the transition table is reset to idle.
pub fn step(session: &mut Session, event: Event, config: &EngineConfig) -> Outcome {
    let before = session.mode.kind();
    match advance(session, event, config) {
        Ok(outcome) => {
            debug!(from = ?before, to = ?session.mode.kind(), "Workflow step");
            outcome
        }
        Err(err @ FlowError::FatalSession(_)) => {
            error!(mode = ?before, "Resetting session: {}", err);
            session.reset_mode();
            Outcome::replies(vec![Reply::text(err.to_string()), Reply::menu(menu::main_menu())])
        }
        Err(err @ FlowError::Validation(_)) => {
            debug!(mode = ?before, "Rejected input: {}", err);
            Outcome::replies(vec![
                Reply::text(err.to_string()),
                Reply::text(session.mode.kind().prompt()),
            ])
        }
        Err(err) => {
            debug!(mode = ?before, "Precondition failed: {}", err);
            Outcome::reply(Reply::text(err.to_string()))
        }
    }
}

/// Store freshly computed suggestions and enter the find-word step.
///
/// Returns no replies when the operator moved on while the words were being
/// counted.
pub fn suggestions_ready(session: &mut Session, words: Vec<(String, usize)>) -> Vec<Reply> {
    if !session.mode.is_idle() {
        debug!(mode = ?session.mode.kind(), "Dropping suggestions, session moved on");
        return Vec::new();
    }
    let menu = menu::suggestions_menu(&words);
    session.word_frequencies = words;
    session.mode = WorkflowMode::AwaitingFindWord;
    vec![Reply::menu(menu)]
}

// ── Transition execution ──────────────────────────────────────────────────

/// Event payload once classification is done.
enum Input {
    Button(Option<Action>),
    File { name: Option<String>, bytes: Vec<u8> },
    Text(String),
}

impl From<Event> for Input {
    fn from(event: Event) -> Self {
        match event {
            Event::ButtonPressed(id) => Input::Button(id.parse().ok()),
            Event::FileUploaded { name, bytes, .. } => Input::File { name, bytes },
            Event::TextEntered(text) => Input::Text(text),
        }
    }
}

impl Input {
    fn text(self) -> Result<String, FlowError> {
        match self {
            Input::Text(text) => Ok(text),
            _ => Err(FlowError::FatalSession("expected text input".into())),
        }
    }

    fn file(self) -> Result<(Option<String>, Vec<u8>), FlowError> {
        match self {
            Input::File { name, bytes } => Ok((name, bytes)),
            _ => Err(FlowError::FatalSession("expected an uploaded file".into())),
        }
    }

    fn suggestion(&self) -> Result<usize, FlowError> {
        match self {
            Input::Button(Some(Action::Suggest(i))) => Ok(*i),
            _ => Err(FlowError::FatalSession("expected a suggestion".into())),
        }
    }
}

fn advance(session: &mut Session, event: Event, config: &EngineConfig) -> Result<Outcome, FlowError> {
    let mode = session.mode.kind();
    let on = EventKind::of(&event)
        .map_err(|id| FlowError::Validation(format!("Unknown action '{id}'")))?;

    let Some(transition) = table::lookup(mode, on) else {
        return Ok(Outcome::reply(Reply::text(hint(mode, on))));
    };

    if let Some(noun) = missing(transition.requires, session) {
        return Err(match transition.when {
            When::Any => FlowError::Precondition(format!("No {noun} uploaded! Upload {noun} first.")),
            When::In(kind) => FlowError::FatalSession(format!("{kind:?} with no {noun}")),
        });
    }

    apply(session, transition.effect, Input::from(event), config)
}

fn missing(requires: Requires, session: &Session) -> Option<&'static str> {
    match requires {
        Requires::Documents if session.documents.is_empty() => Some("PDFs"),
        Requires::Videos if session.videos.is_empty() => Some("videos"),
        _ => None,
    }
}

fn apply(
    session: &mut Session,
    effect: Effect,
    input: Input,
    config: &EngineConfig,
) -> Result<Outcome, FlowError> {
    let outcome = match effect {
        Effect::ShowMenu(kind) => Outcome::reply(Reply::menu(match kind {
            MenuKind::Main => menu::main_menu(),
            MenuKind::PdfTools => menu::pdf_tools_menu(),
            MenuKind::ThumbnailTools => menu::thumbnail_tools_menu(),
            MenuKind::VideoTools => menu::video_tools_menu(),
        })),
        Effect::Help => Outcome::reply(Reply::text(HELP_TEXT)),
        Effect::BackToMain => {
            session.reset_mode();
            Outcome::reply(Reply::menu(menu::main_menu()))
        }
        Effect::Cancel => {
            session.reset_mode();
            Outcome::replies(vec![
                Reply::text("✖️ Cancelled."),
                Reply::menu(menu::main_menu()),
            ])
        }
        Effect::NewBatch => {
            session.clear_files();
            session.reset_mode();
            info!("New batch started");
            Outcome::replies(vec![
                Reply::text("🆕 New batch started. All uploaded files were cleared."),
                Reply::menu(menu::main_menu()),
            ])
        }
        Effect::Enter(kind) => {
            session.mode = kind
                .entry()
                .ok_or_else(|| FlowError::FatalSession(format!("{kind:?} needs parameters")))?;
            Outcome::reply(Reply::text(kind.prompt()))
        }

        Effect::StoreDocument => {
            let (name, bytes) = input.file()?;
            let name = name.unwrap_or_else(|| format!("document_{}.pdf", session.documents.len() + 1));
            if !is_pdf(&bytes) {
                return Err(FlowError::Validation(format!("{name} is not a PDF file")));
            }
            session.documents.push(DocumentItem::new(name.clone(), bytes));
            Outcome::reply(Reply::text(format!(
                "✅ Added: {name}\n📊 Total PDFs: {}",
                session.documents.len()
            )))
        }
        Effect::StoreVideo => {
            let (name, bytes) = input.file()?;
            let name = name.unwrap_or_else(|| format!("video_{}.mp4", session.videos.len() + 1));
            session.videos.push(MediaItem::new(name.clone(), bytes));
            Outcome::reply(Reply::text(format!(
                "✅ Added: {name}\n📊 Total Videos: {}",
                session.videos.len()
            )))
        }

        Effect::StartSuggestions => {
            let documents = session.documents.clone();
            dispatch(session, Job::Suggest { documents })
        }
        Effect::SkipSuggestions => {
            Outcome::reply(Reply::text(ModeKind::AwaitingFindWord.prompt()))
        }
        Effect::AcceptSuggestion => {
            let index = input.suggestion()?;
            let (word, _) = session.word_frequencies.get(index).ok_or_else(|| {
                FlowError::Validation(format!("Suggestion {} is not on the list", index + 1))
            })?;
            let find = word.clone();
            let reply = Reply::menu(menu::replace_menu(&find));
            session.mode = WorkflowMode::AwaitingReplaceWord { find };
            Outcome::reply(reply)
        }
        Effect::TakeWatermarkText => {
            let text = non_empty(input.text()?, "Watermark text cannot be empty")?;
            session.mode = WorkflowMode::AwaitingOpacity { text };
            Outcome::reply(Reply::text(ModeKind::AwaitingOpacity.prompt()))
        }
        Effect::TakePageNumber => {
            let position = input
                .text()?
                .trim()
                .parse::<usize>()
                .map_err(|_| FlowError::Validation("Invalid page number!".into()))?;
            session.mode = WorkflowMode::AwaitingInsertImage { position };
            Outcome::reply(Reply::text(ModeKind::AwaitingInsertImage.prompt()))
        }
        Effect::TakeFindWord => {
            let find = non_empty(input.text()?, "Send a word to find")?;
            let reply = Reply::menu(menu::replace_menu(&find));
            session.mode = WorkflowMode::AwaitingReplaceWord { find };
            Outcome::reply(reply)
        }
        Effect::TakeCover => {
            let (_, bytes) = input.file()?;
            session.mode = WorkflowMode::AwaitingVideoWatermarkText {
                cover: Arc::from(bytes),
            };
            Outcome::reply(Reply::text(ModeKind::AwaitingVideoWatermarkText.prompt()))
        }

        Effect::RunWatermark => {
            let WorkflowMode::AwaitingOpacity { text } = &session.mode else {
                return Err(FlowError::FatalSession("opacity step without watermark text".into()));
            };
            let text = text.clone();
            let opacity = parse_opacity(&input.text()?, config)?;
            let documents = session.documents.clone();
            dispatch(session, Job::Document(DocumentJob::Watermark {
                documents,
                text,
                opacity,
            }))
        }
        Effect::RunDelete => {
            let (_, bytes) = input.file()?;
            let documents = session.documents.clone();
            dispatch(session, Job::Document(DocumentJob::DeletePages {
                documents,
                target: Arc::from(bytes),
            }))
        }
        Effect::RunInsert => {
            let WorkflowMode::AwaitingInsertImage { position } = session.mode else {
                return Err(FlowError::FatalSession("insert image step without a position".into()));
            };
            let (_, bytes) = input.file()?;
            let documents = session.documents.clone();
            dispatch(session, Job::Document(DocumentJob::InsertPage {
                documents,
                position,
                image: Arc::from(bytes),
            }))
        }
        Effect::RunReplace | Effect::RunRedactOnly => {
            let WorkflowMode::AwaitingReplaceWord { find } = &session.mode else {
                return Err(FlowError::FatalSession("replace step without a find word".into()));
            };
            let find = find.clone();
            let replace = match effect {
                Effect::RunReplace => input.text()?,
                _ => String::new(),
            };
            let documents = session.documents.clone();
            dispatch(session, Job::Document(DocumentJob::FindReplace {
                documents,
                find,
                replace,
            }))
        }
        Effect::RunRename => {
            let pattern = non_empty(input.text()?, "The name pattern cannot be empty")?;
            let documents = session.documents.clone();
            dispatch(session, Job::Document(DocumentJob::Rename { documents, pattern }))
        }
        Effect::RunSetThumbnail => {
            let (_, bytes) = input.file()?;
            let documents = session.documents.clone();
            dispatch(session, Job::Document(DocumentJob::SetThumbnail {
                documents,
                image: Arc::from(bytes),
            }))
        }
        Effect::RunRemoveThumbnail => {
            let documents = session.documents.clone();
            dispatch(session, Job::Document(DocumentJob::RemoveThumbnail { documents }))
        }
        Effect::RunVideoCover => {
            let (_, bytes) = input.file()?;
            let videos = session.videos.clone();
            dispatch(session, Job::Video(VideoJob::Cover {
                videos,
                cover: Arc::from(bytes),
            }))
        }
        Effect::RunVideoCaption => {
            let WorkflowMode::AwaitingVideoWatermarkText { cover } = &session.mode else {
                return Err(FlowError::FatalSession("caption step without a cover image".into()));
            };
            let cover = Arc::clone(cover);
            let caption = non_empty(input.text()?, "Watermark text cannot be empty")?;
            let videos = session.videos.clone();
            dispatch(session, Job::Video(VideoJob::Caption {
                videos,
                cover,
                caption,
            }))
        }
    };
    Ok(outcome)
}

/// Reset to idle and hand `job` to the engine.
fn dispatch(session: &mut Session, job: Job) -> Outcome {
    session.reset_mode();
    info!(operation = job.operation(), "Workflow complete, dispatching job");
    Outcome {
        replies: vec![Reply::text(job.busy_text())],
        job: Some(job),
    }
}

fn non_empty(text: String, message: &str) -> Result<String, FlowError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(FlowError::Validation(message.to_string()));
    }
    Ok(trimmed.to_string())
}

fn parse_opacity(text: &str, config: &EngineConfig) -> Result<f32, FlowError> {
    let opacity = text
        .trim()
        .parse::<f32>()
        .map_err(|_| FlowError::Validation("Invalid number!".into()))?;
    if !config.opacity_in_range(opacity) {
        return Err(FlowError::Validation(format!(
            "Opacity must be between {} and {}",
            config.min_opacity, config.max_opacity
        )));
    }
    Ok(opacity)
}

fn hint(mode: ModeKind, on: EventKind) -> String {
    let hint = match on {
        EventKind::DocumentUploaded => "ℹ️ Press 📤 Upload PDFs before sending documents.",
        EventKind::VideoUploaded => "ℹ️ Press 📤 Upload Videos before sending videos.",
        EventKind::ImageUploaded => "ℹ️ This step is not expecting an image.",
        EventKind::TextEntered => "ℹ️ Nothing is waiting for text right now.",
        EventKind::Select(_) | EventKind::Suggestion => {
            "ℹ️ That button belongs to a step that is no longer active."
        }
    };
    if mode == ModeKind::Idle {
        format!("{hint}\nUse /start to open the menu.")
    } else {
        format!("{hint}\n{}", mode.prompt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::UploadKind;

    fn pdf_session(count: usize) -> Session {
        let mut s = Session::new();
        for i in 0..count {
            s.documents
                .push(DocumentItem::new(format!("{i}.pdf"), b"%PDF-1.7".to_vec()));
        }
        s
    }

    fn texts(outcome: &Outcome) -> Vec<String> {
        outcome
            .replies
            .iter()
            .filter_map(|r| match r {
                Reply::Text(t) => Some(t.clone()),
                Reply::Menu { text, .. } => Some(text.clone()),
                Reply::File { .. } => None,
            })
            .collect()
    }

    #[test]
    fn entering_a_document_flow_without_documents_is_rejected() {
        let mut s = Session::new();
        let config = EngineConfig::default();
        let out = step(&mut s, Event::button("add_watermark"), &config);
        assert!(s.mode.is_idle());
        assert!(out.job.is_none());
        assert!(texts(&out)[0].contains("Upload PDFs first"));
    }

    #[test]
    fn opacity_validation_keeps_mode() {
        let mut s = pdf_session(1);
        let config = EngineConfig::default();
        step(&mut s, Event::button("add_watermark"), &config);
        step(&mut s, Event::text("CONFIDENTIAL"), &config);
        assert_eq!(s.mode.kind(), ModeKind::AwaitingOpacity);

        for bad in ["0.05", "1.5", "abc", "NaN"] {
            let out = step(&mut s, Event::text(bad), &config);
            assert!(out.job.is_none(), "{bad} was accepted");
            assert_eq!(
                s.mode,
                WorkflowMode::AwaitingOpacity {
                    text: "CONFIDENTIAL".into()
                }
            );
            assert!(texts(&out).iter().any(|t| t.contains("opacity")));
        }

        let out = step(&mut s, Event::text("0.3"), &config);
        assert!(s.mode.is_idle());
        match out.job {
            Some(Job::Document(DocumentJob::Watermark { text, opacity, .. })) => {
                assert_eq!(text, "CONFIDENTIAL");
                assert!((opacity - 0.3).abs() < 1e-6);
            }
            other => panic!("unexpected job {other:?}"),
        }
    }

    #[test]
    fn page_number_must_be_numeric() {
        let mut s = pdf_session(1);
        let config = EngineConfig::default();
        step(&mut s, Event::button("insert_page"), &config);
        step(&mut s, Event::text("three"), &config);
        assert_eq!(s.mode.kind(), ModeKind::AwaitingPageNumber);
        step(&mut s, Event::text("-1"), &config);
        assert_eq!(s.mode.kind(), ModeKind::AwaitingPageNumber);
        step(&mut s, Event::text(" 3 "), &config);
        assert_eq!(s.mode, WorkflowMode::AwaitingInsertImage { position: 3 });
    }

    #[test]
    fn switching_flows_drops_previous_parameters() {
        let mut s = pdf_session(1);
        let config = EngineConfig::default();
        step(&mut s, Event::button("add_watermark"), &config);
        step(&mut s, Event::text("DRAFT"), &config);
        step(&mut s, Event::button("insert_page"), &config);
        assert_eq!(s.mode, WorkflowMode::AwaitingPageNumber);
        // Opacity text no longer reaches a watermark.
        let out = step(&mut s, Event::text("0.5"), &config);
        assert!(out.job.is_none());
        assert_eq!(s.mode, WorkflowMode::AwaitingPageNumber);
    }

    #[test]
    fn non_pdf_upload_is_rejected() {
        let mut s = Session::new();
        let config = EngineConfig::default();
        step(&mut s, Event::button("upload_pdf"), &config);
        let out = step(
            &mut s,
            Event::upload(UploadKind::Document, "notes.txt", b"hello".to_vec()),
            &config,
        );
        assert!(s.documents.is_empty());
        assert!(texts(&out)[0].contains("notes.txt is not a PDF"));
        assert_eq!(s.mode.kind(), ModeKind::UploadingDocuments);
    }

    #[test]
    fn uploads_report_running_total() {
        let mut s = Session::new();
        let config = EngineConfig::default();
        step(&mut s, Event::button("upload_videos"), &config);
        let out = step(
            &mut s,
            Event::FileUploaded {
                kind: UploadKind::Video,
                name: None,
                bytes: vec![0; 8],
            },
            &config,
        );
        assert_eq!(s.videos[0].name, "video_1.mp4");
        assert!(texts(&out)[0].contains("Total Videos: 1"));
    }

    #[test]
    fn find_replace_through_suggestions() {
        let mut s = pdf_session(2);
        let config = EngineConfig::default();
        let out = step(&mut s, Event::button("find_replace"), &config);
        assert!(matches!(out.job, Some(Job::Suggest { ref documents }) if documents.len() == 2));

        let replies = suggestions_ready(&mut s, vec![("invoice".into(), 4)]);
        assert_eq!(replies.len(), 1);
        assert_eq!(s.mode.kind(), ModeKind::AwaitingFindWord);

        let out = step(&mut s, Event::button("suggest:7"), &config);
        assert!(texts(&out)[0].contains("not on the list"));
        assert_eq!(s.mode.kind(), ModeKind::AwaitingFindWord);

        step(&mut s, Event::button("suggest:0"), &config);
        assert_eq!(
            s.mode,
            WorkflowMode::AwaitingReplaceWord {
                find: "invoice".into()
            }
        );

        let out = step(&mut s, Event::button("skip_replace"), &config);
        assert!(s.mode.is_idle());
        match out.job {
            Some(Job::Document(DocumentJob::FindReplace { find, replace, .. })) => {
                assert_eq!(find, "invoice");
                assert!(replace.is_empty());
            }
            other => panic!("unexpected job {other:?}"),
        }
    }

    #[test]
    fn cleared_files_mid_flow_is_a_fatal_session() {
        let mut s = pdf_session(1);
        let config = EngineConfig::default();
        step(&mut s, Event::button("rename_files"), &config);
        s.clear_files();
        let out = step(&mut s, Event::text("Doc_{n}"), &config);
        assert!(out.job.is_none());
        assert!(s.mode.is_idle());
        assert!(texts(&out)[0].contains("start it again"));
    }

    #[test]
    fn new_batch_clears_and_resets() {
        let mut s = pdf_session(3);
        let config = EngineConfig::default();
        step(&mut s, Event::button("rename_files"), &config);
        step(&mut s, Event::button("new_batch"), &config);
        assert!(s.documents.is_empty());
        assert!(s.mode.is_idle());
    }

    #[test]
    fn stray_text_gets_a_hint() {
        let mut s = Session::new();
        let out = step(&mut s, Event::text("hello"), &EngineConfig::default());
        assert!(s.mode.is_idle());
        assert!(texts(&out)[0].contains("Nothing is waiting"));
    }

    #[test]
    fn stray_images_get_a_hint() {
        let mut s = Session::new();
        let out = step(
            &mut s,
            Event::upload(UploadKind::Image, "shot.png", vec![1, 2, 3]),
            &EngineConfig::default(),
        );
        assert!(out.job.is_none());
        assert!(s.mode.is_idle());
        assert!(texts(&out)[0].contains("not expecting an image"));
    }

    #[test]
    fn video_caption_collects_cover_then_text() {
        let mut s = Session::new();
        s.videos.push(MediaItem::new("a.mp4", vec![0u8; 4]));
        let config = EngineConfig::default();
        step(&mut s, Event::button("video_thumb_watermark"), &config);
        step(
            &mut s,
            Event::upload(UploadKind::Image, "cover.jpg", vec![9, 9]),
            &config,
        );
        assert_eq!(s.mode.kind(), ModeKind::AwaitingVideoWatermarkText);
        let out = step(&mut s, Event::text("Episode 1"), &config);
        assert!(s.mode.is_idle());
        match out.job {
            Some(Job::Video(VideoJob::Caption { cover, caption, videos })) => {
                assert_eq!(&cover[..], &[9, 9]);
                assert_eq!(caption, "Episode 1");
                assert_eq!(videos.len(), 1);
            }
            other => panic!("unexpected job {other:?}"),
        }
    }

    #[test]
    fn cleared_batch_drops_a_staged_cover_on_the_next_step() {
        let mut s = Session::new();
        s.videos.push(MediaItem::new("a.mp4", vec![0u8; 4]));
        let config = EngineConfig::default();
        step(&mut s, Event::button("video_thumb_watermark"), &config);
        step(
            &mut s,
            Event::upload(UploadKind::Image, "cover.jpg", vec![9, 9]),
            &config,
        );

        s.clear_files();
        assert!(matches!(
            s.mode,
            WorkflowMode::AwaitingVideoWatermarkText { .. }
        ));

        let out = step(&mut s, Event::text("Episode 1"), &config);
        assert!(out.job.is_none());
        assert!(s.mode.is_idle());
        assert!(texts(&out)[0].contains("inconsistent"));
    }

    #[test]
    fn unknown_button_is_reported() {
        let mut s = Session::new();
        let out = step(&mut s, Event::button("launch_rockets"), &EngineConfig::default());
        assert!(texts(&out)[0].contains("Unknown action"));
    }
}
