use std::path::PathBuf;

use async_trait::async_trait;
use switchyard_core::{ChannelInfo, MessageRef};

use crate::error::Result;
use crate::types::MediaFile;

/// One inline button under a master-side message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Button {
    /// Pressing it delivers `data` back as an interaction on the message.
    Callback { label: String, data: String },
    Url { label: String, url: String },
}

impl Button {
    pub fn callback(label: impl Into<String>, data: impl Into<String>) -> Self {
        Button::Callback {
            label: label.into(),
            data: data.into(),
        }
    }

    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Button::Url {
            label: label.into(),
            url: url.into(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Button::Callback { label, .. } | Button::Url { label, .. } => label,
        }
    }
}

/// Rows of inline buttons.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new(rows: Vec<Vec<Button>>) -> Self {
        Self { rows }
    }

    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Animation,
    Document,
    Voice,
    Audio,
    Video,
}

/// A file to upload to the master surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMedia {
    pub kind: MediaKind,
    pub path: PathBuf,
    /// Name shown for documents; the basename of `path` otherwise.
    pub file_name: Option<String>,
    pub caption: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Venue {
    pub latitude: f64,
    pub longitude: f64,
    pub title: String,
    pub address: String,
}

/// The surface the operator reads and drives everything from.
///
/// `chat` arguments are the master platform's native chat ids (the `uid`
/// half of a master [`ChatKey`](switchyard_core::ChatKey)).
#[async_trait]
pub trait MasterSurface: Send + Sync {
    fn info(&self) -> &ChannelInfo;

    async fn send_text(
        &self,
        chat: &str,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageRef>;

    /// Replace the text (and keyboard) of a message sent earlier.
    async fn edit_text(&self, msg: &MessageRef, text: &str, keyboard: Option<Keyboard>)
        -> Result<()>;

    async fn send_media(&self, chat: &str, media: OutboundMedia) -> Result<MessageRef>;

    async fn send_venue(&self, chat: &str, venue: Venue) -> Result<MessageRef>;

    /// Send `text` as a reply quoting `to`.
    async fn reply_text(&self, to: &MessageRef, text: &str) -> Result<MessageRef>;

    /// Fetch a file the operator sent, by the platform's file id, into local
    /// storage. `stem` becomes the start of the stored file name.
    async fn download(&self, file_id: &str, stem: &str) -> Result<MediaFile>;

    /// Deep link that adds the bot to a group and delivers `/start {token}` there.
    fn group_invite_link(&self, token: &str) -> String;
}
