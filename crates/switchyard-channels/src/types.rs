use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use switchyard_core::{ChatKey, ChatType, Identity, MessageKind};

/// A media payload already downloaded to a temporary file.
///
/// Whoever consumes the message removes the file once it is delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaFile {
    pub path: PathBuf,
    pub mime: String,
}

impl MediaFile {
    pub fn new(path: impl Into<PathBuf>, mime: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mime: mime.into(),
        }
    }

    /// A missing file counts as empty.
    pub async fn is_empty(&self) -> bool {
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        }
    }

    pub fn file_name(&self) -> Option<String> {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// One invocable option attached to a `Command` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDescriptor {
    /// Button label shown to the operator.
    pub label: String,
    /// Extra function name on the originating channel.
    pub callable: String,
    #[serde(default)]
    pub args: String,
}

/// Payload of a relayed message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageBody {
    Text,
    Link { url: String },
    Image(MediaFile),
    Sticker(MediaFile),
    File(MediaFile),
    Audio(MediaFile),
    Video(MediaFile),
    Location { latitude: f64, longitude: f64 },
    Command { commands: Vec<CommandDescriptor> },
    System,
    Unsupported,
}

impl MessageBody {
    pub fn kind(&self) -> MessageKind {
        match self {
            MessageBody::Text => MessageKind::Text,
            MessageBody::Link { .. } => MessageKind::Link,
            MessageBody::Image(_) => MessageKind::Image,
            MessageBody::Sticker(_) => MessageKind::Sticker,
            MessageBody::File(_) => MessageKind::File,
            MessageBody::Audio(_) => MessageKind::Audio,
            MessageBody::Video(_) => MessageKind::Video,
            MessageBody::Location { .. } => MessageKind::Location,
            MessageBody::Command { .. } => MessageKind::Command,
            MessageBody::System => MessageKind::System,
            MessageBody::Unsupported => MessageKind::Unsupported,
        }
    }

    pub fn media(&self) -> Option<&MediaFile> {
        match self {
            MessageBody::Image(f)
            | MessageBody::Sticker(f)
            | MessageBody::File(f)
            | MessageBody::Audio(f)
            | MessageBody::Video(f) => Some(f),
            _ => None,
        }
    }
}

/// A message in flight between a platform and the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMessage {
    /// Id of the channel the message came from (or is headed to).
    pub channel_id: String,
    pub channel_emoji: String,
    pub source: ChatType,
    /// The chat the message belongs to.
    pub origin: Identity,
    /// Sender inside a group chat.
    pub member: Option<Identity>,
    /// Slave-side target when travelling master to slave.
    pub destination: Option<ChatKey>,
    pub text: String,
    pub body: MessageBody,
    pub reply_to: Option<Box<NormalizedMessage>>,
}

impl NormalizedMessage {
    /// Plain text message from a chat on `channel_id`.
    pub fn text(
        channel_id: impl Into<String>,
        channel_emoji: impl Into<String>,
        source: ChatType,
        origin: Identity,
        text: impl Into<String>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            channel_emoji: channel_emoji.into(),
            source,
            origin,
            member: None,
            destination: None,
            text: text.into(),
            body: MessageBody::Text,
            reply_to: None,
        }
    }

    pub fn with_member(mut self, member: Identity) -> Self {
        self.member = Some(member);
        self
    }

    pub fn with_body(mut self, body: MessageBody) -> Self {
        self.body = body;
        self
    }

    /// Key of the conversation this message belongs to.
    pub fn origin_key(&self) -> ChatKey {
        ChatKey::new(self.channel_id.clone(), self.origin.uid.clone())
    }
}

/// A conversation as listed by [`Channel::list_chats`](crate::Channel::list_chats).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub uid: String,
    pub name: String,
    pub alias: String,
    pub chat_type: ChatType,
}

impl ChatEntry {
    pub fn identity(&self) -> Identity {
        Identity::new(self.uid.clone(), self.name.clone(), self.alias.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraFunction {
    pub name: String,
    pub display_name: String,
    /// May contain `{function_name}`, replaced by the invoking command.
    pub description: String,
}

/// Result of a successful `send_message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub message_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn zero_byte_and_missing_files_are_empty() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let media = MediaFile::new(file.path(), "image/png");
        assert!(media.is_empty().await);

        let mut full = tempfile::NamedTempFile::new().unwrap();
        full.write_all(b"\x89PNG").unwrap();
        assert!(!MediaFile::new(full.path(), "image/png").is_empty().await);

        assert!(MediaFile::new("/nonexistent/x.png", "image/png").is_empty().await);
    }

    #[test]
    fn origin_key_joins_channel_and_uid() {
        let msg = NormalizedMessage::text(
            "loopback",
            "★",
            ChatType::User,
            Identity::new("alice", "Alice", "Alice"),
            "hi",
        );
        assert_eq!(msg.origin_key().to_string(), "loopback.alice");
        assert_eq!(msg.body.kind(), MessageKind::Text);
    }

    #[test]
    fn body_is_tagged_by_type() {
        let link = serde_json::to_value(MessageBody::Link {
            url: "https://example.com".into(),
        })
        .unwrap();
        assert_eq!(
            link,
            serde_json::json!({"type": "link", "url": "https://example.com"})
        );

        let image: MessageBody = serde_json::from_value(serde_json::json!({
            "type": "image",
            "path": "/tmp/a.png",
            "mime": "image/png"
        }))
        .unwrap();
        assert_eq!(image.kind(), MessageKind::Image);
        assert_eq!(image.media().map(|m| m.mime.as_str()), Some("image/png"));
    }
}
