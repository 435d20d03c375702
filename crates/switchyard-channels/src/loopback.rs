//! A slave channel that lives entirely in-process.
//!
//! Everything sent to one of its chats is echoed back through the queue as if
//! the remote side had answered. Handy for exercising the relay end to end
//! without credentials for a real platform.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use switchyard_core::{ChannelInfo, ChatType, Identity};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use crate::{
    channel::{slave_info, Channel},
    error::{ChannelError, Result},
    queue::MessageQueue,
    types::{ChatEntry, Delivery, ExtraFunction, MessageBody, NormalizedMessage},
};

pub const LOOPBACK_ID: &str = "loopback";
const LOOPBACK_EMOJI: &str = "🔁";

pub struct LoopbackChannel {
    info: ChannelInfo,
    chats: Vec<ChatEntry>,
    inbox_tx: mpsc::UnboundedSender<NormalizedMessage>,
    inbox_rx: Mutex<mpsc::UnboundedReceiver<NormalizedMessage>>,
    next_id: AtomicU64,
}

impl LoopbackChannel {
    /// Loopback with the default pair of chats: one user, one group.
    pub fn new() -> Self {
        Self::with_chats(vec![
            ChatEntry {
                uid: "echo".to_string(),
                name: "Echo".to_string(),
                alias: "Echo".to_string(),
                chat_type: ChatType::User,
            },
            ChatEntry {
                uid: "echo-room".to_string(),
                name: "Echo Room".to_string(),
                alias: "Echo Room".to_string(),
                chat_type: ChatType::Group,
            },
        ])
    }

    pub fn with_chats(chats: Vec<ChatEntry>) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            info: slave_info(LOOPBACK_ID, "Loopback", LOOPBACK_EMOJI),
            chats,
            inbox_tx,
            inbox_rx: Mutex::new(inbox_rx),
            next_id: AtomicU64::new(1),
        }
    }

    /// Push a message as if it had arrived from the platform.
    pub fn inject(&self, msg: NormalizedMessage) -> Result<()> {
        self.inbox_tx
            .send(msg)
            .map_err(|_| ChannelError::ConnectionFailed("loopback inbox closed".into()))
    }

    /// Text message from one of the configured chats.
    pub fn message_from(&self, uid: &str, text: &str) -> Result<NormalizedMessage> {
        let chat = self.chat(uid)?;
        Ok(NormalizedMessage::text(
            self.info.id.clone(),
            self.info.emoji.clone(),
            chat.chat_type,
            chat.identity(),
            text,
        ))
    }

    fn chat(&self, uid: &str) -> Result<&ChatEntry> {
        self.chats
            .iter()
            .find(|c| c.uid == uid)
            .ok_or_else(|| ChannelError::ChatNotFound(format!("{}.{uid}", self.info.id)))
    }
}

impl Default for LoopbackChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Channel for LoopbackChannel {
    fn info(&self) -> &ChannelInfo {
        &self.info
    }

    async fn list_chats(&self) -> Result<Vec<ChatEntry>> {
        Ok(self.chats.clone())
    }

    async fn send_message(&self, msg: NormalizedMessage) -> Result<Delivery> {
        let dest = msg
            .destination
            .clone()
            .ok_or_else(|| ChannelError::ChatNotFound("no destination".into()))?;
        let chat = self.chat(&dest.uid)?;

        let echoed = match &msg.body {
            MessageBody::Text => MessageBody::Text,
            MessageBody::Link { url } => MessageBody::Link { url: url.clone() },
            MessageBody::Location {
                latitude,
                longitude,
            } => MessageBody::Location {
                latitude: *latitude,
                longitude: *longitude,
            },
            other => return Err(ChannelError::UnsupportedType(other.kind().to_string())),
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(chat = %dest, id, "loopback delivery");

        let mut reply = NormalizedMessage::text(
            self.info.id.clone(),
            self.info.emoji.clone(),
            chat.chat_type,
            chat.identity(),
            msg.text.clone(),
        )
        .with_body(echoed);
        if chat.chat_type == ChatType::Group {
            reply.member = Some(Identity::new("echo-bot", "Echo Bot", "Echo Bot"));
        }
        self.inject(reply)?;

        Ok(Delivery {
            message_id: id.to_string(),
        })
    }

    fn extra_functions(&self) -> Vec<ExtraFunction> {
        vec![
            ExtraFunction {
                name: "ping".to_string(),
                display_name: "Ping".to_string(),
                description: "Check the loopback is alive. Usage: {function_name}".to_string(),
            },
            ExtraFunction {
                name: "echo".to_string(),
                display_name: "Echo".to_string(),
                description: "Return the arguments. Usage: {function_name} <text>".to_string(),
            },
        ]
    }

    async fn call_extra(&self, name: &str, args: &str) -> Result<String> {
        match name {
            "ping" => Ok("pong".to_string()),
            "echo" => Ok(args.to_string()),
            other => Err(ChannelError::FunctionNotFound(other.to_string())),
        }
    }

    async fn poll(&self, queue: MessageQueue) -> Result<()> {
        let mut inbox = self.inbox_rx.lock().await;
        info!(channel = %self.info.id, "loopback polling");
        while let Some(msg) = inbox.recv().await {
            queue.publish(msg)?;
        }
        Ok(())
    }
}
