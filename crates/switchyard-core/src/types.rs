use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SwitchyardError;

/// Names one conversation on one platform: `{channel}.{uid}`.
///
/// The channel id never contains a `.`; the uid may, so parsing splits at
/// the first dot only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChatKey {
    pub channel: String,
    pub uid: String,
}

impl ChatKey {
    pub fn new(channel: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            uid: uid.into(),
        }
    }

    pub fn parse(s: &str) -> crate::error::Result<Self> {
        match s.split_once('.') {
            Some((channel, uid)) if !channel.is_empty() && !uid.is_empty() => {
                Ok(Self::new(channel, uid))
            }
            _ => Err(SwitchyardError::InvalidChatKey(s.to_string())),
        }
    }
}

impl fmt::Display for ChatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.channel, self.uid)
    }
}

impl std::str::FromStr for ChatKey {
    type Err = SwitchyardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A message on the master surface, in the master's native ids.
///
/// Interactive prompts are keyed by this value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat: String,
    pub message_id: String,
}

impl MessageRef {
    pub fn new(chat: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            chat: chat.into(),
            message_id: message_id.into(),
        }
    }
}

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.chat, self.message_id)
    }
}

/// Kind of conversation a message or chat belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    User,
    Group,
    System,
}

impl ChatType {
    /// Emoji used in rendered prefixes and picker buttons.
    pub fn emoji(&self) -> &'static str {
        match self {
            ChatType::User => "☺",
            ChatType::Group => "👥",
            ChatType::System => "💻",
        }
    }
}

impl fmt::Display for ChatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatType::User => write!(f, "User"),
            ChatType::Group => write!(f, "Group"),
            ChatType::System => write!(f, "System"),
        }
    }
}

/// Payload kind of a relayed message, as recorded in the message log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    Text,
    Link,
    Image,
    Sticker,
    File,
    Audio,
    Video,
    Location,
    Command,
    System,
    Unsupported,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "Text",
            MessageKind::Link => "Link",
            MessageKind::Image => "Image",
            MessageKind::Sticker => "Sticker",
            MessageKind::File => "File",
            MessageKind::Audio => "Audio",
            MessageKind::Video => "Video",
            MessageKind::Location => "Location",
            MessageKind::Command => "Command",
            MessageKind::System => "System",
            MessageKind::Unsupported => "Unsupported",
        }
    }

    /// Only plain text and links are folded into an earlier message.
    pub fn is_mergeable(&self) -> bool {
        matches!(self, MessageKind::Text | MessageKind::Link)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MessageKind {
    type Err = SwitchyardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Text" => MessageKind::Text,
            "Link" => MessageKind::Link,
            "Image" => MessageKind::Image,
            "Sticker" => MessageKind::Sticker,
            "File" => MessageKind::File,
            "Audio" => MessageKind::Audio,
            "Video" => MessageKind::Video,
            "Location" => MessageKind::Location,
            "Command" => MessageKind::Command,
            "System" => MessageKind::System,
            "Unsupported" => MessageKind::Unsupported,
            other => return Err(SwitchyardError::UnknownMessageKind(other.to_string())),
        })
    }
}

/// Who sent something, or which chat it came from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub name: String,
    pub alias: String,
}

impl Identity {
    pub fn new(uid: impl Into<String>, name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            alias: alias.into(),
        }
    }

    /// `alias` when it equals `name`, otherwise `alias (name)`.
    pub fn display_name(&self) -> String {
        if self.alias == self.name || self.name.is_empty() {
            self.alias.clone()
        } else if self.alias.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.alias, self.name)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Master,
    Slave,
}

/// Static metadata every channel adapter exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    /// Stable identifier; the `channel` half of every [`ChatKey`] it owns.
    pub id: String,
    pub name: String,
    pub emoji: String,
    pub kind: ChannelKind,
}
