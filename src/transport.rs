//! The chat transport boundary.
//!
//! The engine consumes typed [`Event`]s and answers through the three
//! [`Transport`] primitives. It never assumes a concrete chat protocol, and it
//! assumes every event already passed the collaborator's [`Authorizer`].

use crate::error::DocflowError;
use crate::menu::MenuOption;
use crate::session::UserId;
use async_trait::async_trait;

/// What kind of file the operator uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadKind {
    Document,
    Image,
    Video,
}

/// An incoming event for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A menu button; carries the action id.
    ButtonPressed(String),
    /// An uploaded file. `name` is `None` when the transport has no filename
    /// (e.g. an inline video).
    FileUploaded {
        kind: UploadKind,
        name: Option<String>,
        bytes: Vec<u8>,
    },
    /// Free text typed by the operator.
    TextEntered(String),
}

impl Event {
    pub fn button(action_id: impl Into<String>) -> Self {
        Event::ButtonPressed(action_id.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Event::TextEntered(text.into())
    }

    pub fn upload(kind: UploadKind, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Event::FileUploaded {
            kind,
            name: Some(name.into()),
            bytes: bytes.into(),
        }
    }
}

/// A message the engine wants delivered, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Menu {
        text: String,
        options: Vec<MenuOption>,
    },
    File {
        bytes: Vec<u8>,
        filename: String,
        caption: Option<String>,
    },
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }

    pub fn menu((text, options): (String, Vec<MenuOption>)) -> Self {
        Reply::Menu { text, options }
    }
}

/// Outbound primitives provided by the chat collaborator.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn reply(&self, text: &str) -> Result<(), DocflowError>;

    async fn reply_with_file(
        &self,
        bytes: &[u8],
        filename: &str,
        caption: Option<&str>,
    ) -> Result<(), DocflowError>;

    async fn reply_with_menu(&self, text: &str, options: &[MenuOption])
        -> Result<(), DocflowError>;
}

/// Send one [`Reply`] through the matching transport primitive.
pub async fn deliver(transport: &dyn Transport, reply: &Reply) -> Result<(), DocflowError> {
    match reply {
        Reply::Text(text) => transport.reply(text).await,
        Reply::Menu { text, options } => transport.reply_with_menu(text, options).await,
        Reply::File {
            bytes,
            filename,
            caption,
        } => {
            transport
                .reply_with_file(bytes, filename, caption.as_deref())
                .await
        }
    }
}

/// Gate evaluated by the transport before an event reaches the engine.
pub trait Authorizer: Send + Sync {
    fn is_authorized(&self, user: UserId) -> bool;
}

/// Admits exactly one operator.
#[derive(Debug, Clone, Copy)]
pub struct SingleOperator(pub UserId);

impl Authorizer for SingleOperator {
    fn is_authorized(&self, user: UserId) -> bool {
        user == self.0
    }
}
