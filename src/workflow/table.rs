//! The static transition table.
//!
//! Every `(mode, event kind)` pair the engine reacts to is one row of
//! [`TRANSITIONS`]. Rows are tried in order and the first match wins, so
//! mode-specific rows come before the `Any` rows they refine. A pair with no
//! row gets a hint and leaves the mode untouched.

use crate::menu::Action;
use crate::transport::{Event, UploadKind};
use crate::workflow::mode::ModeKind;

/// Classification of an incoming event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A menu button other than a word suggestion.
    Select(Action),
    /// One of the numbered word-suggestion buttons.
    Suggestion,
    DocumentUploaded,
    ImageUploaded,
    VideoUploaded,
    TextEntered,
}

impl EventKind {
    /// `Err` carries the unparseable action id.
    pub fn of(event: &Event) -> Result<EventKind, String> {
        Ok(match event {
            Event::ButtonPressed(id) => match id.parse::<Action>() {
                Ok(Action::Suggest(_)) => EventKind::Suggestion,
                Ok(action) => EventKind::Select(action),
                Err(_) => return Err(id.clone()),
            },
            Event::FileUploaded { kind, .. } => match kind {
                UploadKind::Document => EventKind::DocumentUploaded,
                UploadKind::Image => EventKind::ImageUploaded,
                UploadKind::Video => EventKind::VideoUploaded,
            },
            Event::TextEntered(_) => EventKind::TextEntered,
        })
    }
}

/// Modes a row applies in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum When {
    Any,
    In(ModeKind),
}

impl When {
    fn admits(self, mode: ModeKind) -> bool {
        match self {
            When::Any => true,
            When::In(kind) => kind == mode,
        }
    }
}

/// Session state a row needs before it may fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requires {
    Nothing,
    Documents,
    Videos,
}

/// Menus the engine can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuKind {
    Main,
    PdfTools,
    ThumbnailTools,
    VideoTools,
}

/// What a row does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    // ── Navigation ───────────────────────────────────────────────────────
    ShowMenu(MenuKind),
    Help,
    BackToMain,
    Cancel,
    NewBatch,
    /// Enter a parameterless mode and prompt for its input.
    Enter(ModeKind),

    // ── Uploads ──────────────────────────────────────────────────────────
    StoreDocument,
    StoreVideo,

    // ── Parameter steps ──────────────────────────────────────────────────
    StartSuggestions,
    SkipSuggestions,
    AcceptSuggestion,
    TakeWatermarkText,
    TakePageNumber,
    TakeFindWord,
    TakeCover,

    // ── Terminal steps ───────────────────────────────────────────────────
    RunWatermark,
    RunDelete,
    RunInsert,
    RunReplace,
    RunRedactOnly,
    RunRename,
    RunSetThumbnail,
    RunRemoveThumbnail,
    RunVideoCover,
    RunVideoCaption,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub when: When,
    pub on: EventKind,
    pub requires: Requires,
    pub effect: Effect,
}

const fn any(action: Action, requires: Requires, effect: Effect) -> Transition {
    Transition {
        when: When::Any,
        on: EventKind::Select(action),
        requires,
        effect,
    }
}

const fn within(mode: ModeKind, on: EventKind, requires: Requires, effect: Effect) -> Transition {
    Transition {
        when: When::In(mode),
        on,
        requires,
        effect,
    }
}

use self::EventKind::{DocumentUploaded, ImageUploaded, Suggestion, TextEntered, VideoUploaded};
use self::Requires::{Documents, Nothing, Videos};

pub static TRANSITIONS: &[Transition] = &[
    // Parameter steps reached through buttons.
    within(
        ModeKind::AwaitingFindWord,
        EventKind::Select(Action::SkipSuggestions),
        Nothing,
        Effect::SkipSuggestions,
    ),
    within(ModeKind::AwaitingFindWord, Suggestion, Documents, Effect::AcceptSuggestion),
    within(
        ModeKind::AwaitingReplaceWord,
        EventKind::Select(Action::SkipReplace),
        Documents,
        Effect::RunRedactOnly,
    ),
    // Menu selections, valid from any mode.
    any(Action::BackMain, Nothing, Effect::BackToMain),
    any(Action::PdfTools, Nothing, Effect::ShowMenu(MenuKind::PdfTools)),
    any(Action::ThumbnailTools, Nothing, Effect::ShowMenu(MenuKind::ThumbnailTools)),
    any(Action::VideoTools, Nothing, Effect::ShowMenu(MenuKind::VideoTools)),
    any(Action::Help, Nothing, Effect::Help),
    any(Action::Cancel, Nothing, Effect::Cancel),
    any(Action::NewBatch, Nothing, Effect::NewBatch),
    any(Action::UploadPdf, Nothing, Effect::Enter(ModeKind::UploadingDocuments)),
    any(Action::UploadVideos, Nothing, Effect::Enter(ModeKind::UploadingVideos)),
    any(Action::DeleteByImage, Documents, Effect::Enter(ModeKind::AwaitingDeleteTarget)),
    any(Action::AddWatermark, Documents, Effect::Enter(ModeKind::AwaitingWatermarkText)),
    any(Action::InsertPage, Documents, Effect::Enter(ModeKind::AwaitingPageNumber)),
    any(Action::FindReplace, Documents, Effect::StartSuggestions),
    any(Action::RenameFiles, Documents, Effect::Enter(ModeKind::AwaitingRenamePattern)),
    any(Action::CreateThumb, Documents, Effect::Enter(ModeKind::AwaitingThumbnailImage)),
    any(Action::RemoveThumb, Documents, Effect::RunRemoveThumbnail),
    any(Action::SetVideoThumb, Videos, Effect::Enter(ModeKind::AwaitingVideoThumbImage)),
    any(
        Action::VideoThumbWatermark,
        Videos,
        Effect::Enter(ModeKind::AwaitingVideoWatermarkImage),
    ),
    // Uploads.
    within(ModeKind::UploadingDocuments, DocumentUploaded, Nothing, Effect::StoreDocument),
    within(ModeKind::UploadingVideos, VideoUploaded, Nothing, Effect::StoreVideo),
    within(ModeKind::AwaitingDeleteTarget, ImageUploaded, Documents, Effect::RunDelete),
    within(ModeKind::AwaitingInsertImage, ImageUploaded, Documents, Effect::RunInsert),
    within(ModeKind::AwaitingThumbnailImage, ImageUploaded, Documents, Effect::RunSetThumbnail),
    within(ModeKind::AwaitingVideoThumbImage, ImageUploaded, Videos, Effect::RunVideoCover),
    within(ModeKind::AwaitingVideoWatermarkImage, ImageUploaded, Videos, Effect::TakeCover),
    // Text input.
    within(ModeKind::AwaitingWatermarkText, TextEntered, Documents, Effect::TakeWatermarkText),
    within(ModeKind::AwaitingOpacity, TextEntered, Documents, Effect::RunWatermark),
    within(ModeKind::AwaitingPageNumber, TextEntered, Documents, Effect::TakePageNumber),
    within(ModeKind::AwaitingFindWord, TextEntered, Documents, Effect::TakeFindWord),
    within(ModeKind::AwaitingReplaceWord, TextEntered, Documents, Effect::RunReplace),
    within(ModeKind::AwaitingRenamePattern, TextEntered, Documents, Effect::RunRename),
    within(ModeKind::AwaitingVideoWatermarkText, TextEntered, Videos, Effect::RunVideoCaption),
];

/// The first row admitting `(mode, on)`.
pub fn lookup(mode: ModeKind, on: EventKind) -> Option<&'static Transition> {
    TRANSITIONS
        .iter()
        .find(|t| t.on == on && t.when.admits(mode))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_selection_applies_in_any_mode() {
        for mode in [ModeKind::Idle, ModeKind::AwaitingOpacity, ModeKind::UploadingVideos] {
            let t = lookup(mode, EventKind::Select(Action::AddWatermark)).unwrap();
            assert_eq!(t.effect, Effect::Enter(ModeKind::AwaitingWatermarkText));
            assert_eq!(t.requires, Requires::Documents);
        }
    }

    #[test]
    fn text_only_advances_text_modes() {
        assert!(lookup(ModeKind::Idle, EventKind::TextEntered).is_none());
        assert!(lookup(ModeKind::AwaitingDeleteTarget, EventKind::TextEntered).is_none());
        assert_eq!(
            lookup(ModeKind::AwaitingOpacity, EventKind::TextEntered).map(|t| t.effect),
            Some(Effect::RunWatermark)
        );
    }

    #[test]
    fn skip_replace_outside_its_step_has_no_row() {
        assert!(lookup(ModeKind::Idle, EventKind::Select(Action::SkipReplace)).is_none());
        assert!(lookup(ModeKind::Idle, EventKind::Suggestion).is_none());
    }

    #[test]
    fn every_entered_mode_is_parameterless() {
        for t in TRANSITIONS {
            if let Effect::Enter(kind) = t.effect {
                assert!(kind.entry().is_some(), "{kind:?} cannot be entered directly");
            }
        }
    }

    #[test]
    fn every_continuation_row_is_reachable() {
        // A row bound to a mode is only useful if some other row leads there.
        let entered: Vec<ModeKind> = TRANSITIONS
            .iter()
            .filter_map(|t| match t.effect {
                Effect::Enter(kind) => Some(kind),
                Effect::TakeWatermarkText => Some(ModeKind::AwaitingOpacity),
                Effect::TakePageNumber => Some(ModeKind::AwaitingInsertImage),
                Effect::TakeFindWord | Effect::AcceptSuggestion => {
                    Some(ModeKind::AwaitingReplaceWord)
                }
                Effect::TakeCover => Some(ModeKind::AwaitingVideoWatermarkText),
                Effect::StartSuggestions => Some(ModeKind::AwaitingFindWord),
                _ => None,
            })
            .collect();
        for t in TRANSITIONS {
            if let When::In(kind) = t.when {
                assert!(
                    kind == ModeKind::Idle || entered.contains(&kind),
                    "{kind:?} is never entered"
                );
            }
        }
    }

    #[test]
    fn classifies_events() {
        assert_eq!(
            EventKind::of(&Event::button("suggest:3")),
            Ok(EventKind::Suggestion)
        );
        assert_eq!(
            EventKind::of(&Event::button("help")),
            Ok(EventKind::Select(Action::Help))
        );
        assert_eq!(EventKind::of(&Event::button("bogus")), Err("bogus".to_string()));
        assert_eq!(EventKind::of(&Event::text("hi")), Ok(EventKind::TextEntered));
    }
}
