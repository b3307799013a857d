//! Per-user session state and the store that owns it.
//!
//! A [`Session`] holds the operator's uploaded files, the current
//! [`WorkflowMode`] and the cached word suggestions. Sessions live only for
//! the lifetime of the process.
//!
//! All access goes through [`SessionStore`]. The store map is locked only long
//! enough to fetch or insert a session handle; each session then has its own
//! async mutex, so work for one user never waits on another user.

use crate::workflow::WorkflowMode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

/// Opaque identity of a chat user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An uploaded file. Immutable once stored; the bytes are shared so a
/// handler can take a snapshot without copying them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentItem {
    pub name: String,
    pub bytes: Arc<[u8]>,
}

impl DocumentItem {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Images and videos share the document shape.
pub type MediaItem = DocumentItem;

/// Mutable per-user state.
#[derive(Debug, Default)]
pub struct Session {
    /// Current step. Scratch parameters live inside the variant.
    pub mode: WorkflowMode,
    pub documents: Vec<DocumentItem>,
    pub videos: Vec<MediaItem>,
    /// Suggestion list from the last find & replace entry, most frequent first.
    pub word_frequencies: Vec<(String, usize)>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty every file collection and the suggestion cache.
    ///
    /// The mode is left untouched, and so are the parameters it carries (a
    /// pending watermark text, a staged cover image). Callers clearing files
    /// mid-workflow must also call [`Session::reset_mode`]. If they do not,
    /// the next step of that workflow finds its collection empty, fails with
    /// [`FlowError::FatalSession`](crate::error::FlowError::FatalSession) and
    /// the reset drops those parameters.
    pub fn clear_files(&mut self) {
        self.documents.clear();
        self.videos.clear();
        self.word_frequencies.clear();
    }

    /// Return to idle, dropping any parameters the current workflow collected.
    pub fn reset_mode(&mut self) {
        self.mode = WorkflowMode::Idle;
    }
}

/// Process-wide session table keyed by user.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<UserId, Arc<AsyncMutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the user's session handle, creating an empty idle session on
    /// first access.
    pub fn get_or_create(&self, user: UserId) -> Arc<AsyncMutex<Session>> {
        // A poisoned map only means another thread panicked while inserting;
        // the map itself is still consistent.
        let mut map = self
            .sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(map.entry(user).or_insert_with(|| {
            debug!("Creating session for user {}", user);
            Arc::new(AsyncMutex::new(Session::new()))
        }))
    }

    /// Run `f` inside the user's exclusive section.
    ///
    /// Every state mutation funnels through here so two events for the same
    /// user can never interleave their reads and writes.
    pub async fn with_session<R>(&self, user: UserId, f: impl FnOnce(&mut Session) -> R) -> R {
        let handle = self.get_or_create(user);
        let mut session = handle.lock().await;
        f(&mut session)
    }

    /// Empty the user's files, scratch suggestions included. Mode is kept.
    pub async fn clear_files(&self, user: UserId) {
        self.with_session(user, Session::clear_files).await;
    }

    /// Number of sessions created so far.
    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::ModeKind;

    fn item(name: &str) -> DocumentItem {
        DocumentItem::new(name, b"%PDF-1.7".to_vec())
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let store = SessionStore::new();
        let a = store.get_or_create(UserId(7));
        let b = store.get_or_create(UserId(7));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.len(), 1);
        assert_eq!(a.lock().await.mode.kind(), ModeKind::Idle);
    }

    #[tokio::test]
    async fn clear_files_twice_equals_once() {
        let store = SessionStore::new();
        let user = UserId(1);
        store
            .with_session(user, |s| {
                s.documents.push(item("a.pdf"));
                s.videos.push(item("v.mp4"));
                s.word_frequencies.push(("invoice".into(), 2));
                s.mode = WorkflowMode::AwaitingRenamePattern;
            })
            .await;

        store.clear_files(user).await;
        let once = store
            .with_session(user, |s| {
                (
                    s.documents.len(),
                    s.videos.len(),
                    s.word_frequencies.len(),
                    s.mode.kind(),
                )
            })
            .await;
        store.clear_files(user).await;
        let twice = store
            .with_session(user, |s| {
                (
                    s.documents.len(),
                    s.videos.len(),
                    s.word_frequencies.len(),
                    s.mode.kind(),
                )
            })
            .await;

        assert_eq!(once, (0, 0, 0, ModeKind::AwaitingRenamePattern));
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let store = SessionStore::new();
        store
            .with_session(UserId(1), |s| s.documents.push(item("a.pdf")))
            .await;
        let other = store.with_session(UserId(2), |s| s.documents.len()).await;
        assert_eq!(other, 0);
    }

    #[tokio::test]
    async fn concurrent_appends_are_serialised() {
        let store = Arc::new(SessionStore::new());
        let user = UserId(9);
        let mut tasks = Vec::new();
        for i in 0..32 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store
                    .with_session(user, |s| s.documents.push(item(&format!("{i}.pdf"))))
                    .await;
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }
        let count = store.with_session(user, |s| s.documents.len()).await;
        assert_eq!(count, 32);
    }
}
