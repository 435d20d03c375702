//! Master to slave: operator replies and messages in linked groups.

use switchyard_channels::{Delivery, MessageBody, NormalizedMessage};
use switchyard_core::{ChatType, Identity, MessageKind, MessageRef};
use switchyard_store::MessageLogEntry;
use tracing::{debug, instrument, warn};

use crate::context::RelayContext;
use crate::error::{RelayError, Result};

/// A message the operator sent on the master surface.
#[derive(Debug, Clone, PartialEq)]
pub struct MasterInbound {
    pub chat: String,
    pub message_id: String,
    pub sender: Identity,
    pub is_private: bool,
    /// Id of the master message this one replies to.
    pub reply_to: Option<String>,
    pub text: String,
    /// `None` when the adapter could not map the master message type.
    pub body: Option<MessageBody>,
}

impl MasterInbound {
    pub fn message_ref(&self) -> MessageRef {
        MessageRef::new(self.chat.clone(), self.message_id.clone())
    }
}

/// Forward `msg` to the slave chat it addresses.
///
/// Failures are replied to the operator's message and returned.
#[instrument(skip(ctx, msg), fields(chat = %msg.chat, msg = %msg.message_id))]
pub async fn forward_to_slave(ctx: &RelayContext, msg: MasterInbound) -> Result<Delivery> {
    let origin = msg.message_ref();
    let media = msg.body.as_ref().and_then(|b| b.media()).map(|m| m.path.clone());

    let result = forward(ctx, msg).await;

    if let Some(path) = media {
        if let Err(e) = tokio::fs::remove_file(&path).await {
            debug!(path = %path.display(), error = %e, "media file already gone");
        }
    }
    if let Err(e) = &result {
        warn!(code = e.code(), error = %e, "reverse delivery failed");
        ctx.master.reply_text(&origin, &e.operator_text()).await?;
    }
    result
}

async fn forward(ctx: &RelayContext, msg: MasterInbound) -> Result<Delivery> {
    let master_chat = ctx.master_key(&msg.chat);
    let replied = match &msg.reply_to {
        Some(id) => ctx.store.get_message_log(&master_chat, id)?,
        None => None,
    };

    let (destination, quoted) = if msg.is_private {
        match (&msg.reply_to, replied) {
            (None, _) => return Err(RelayError::UnknownRecipient("UC01")),
            (Some(_), None) => return Err(RelayError::UnknownRecipient("UC02")),
            (Some(_), Some(entry)) => (Some(entry.slave_origin.clone()), Some(entry)),
        }
    } else {
        if msg.reply_to.is_some() && replied.is_none() {
            return Err(RelayError::UnknownRecipient("UC03"));
        }
        // A group can carry several slave chats; a reply goes to the one it quotes.
        let linked = ctx.store.get_slave_chats(&master_chat)?;
        let target = replied
            .as_ref()
            .map(|entry| &entry.slave_origin)
            .filter(|origin| linked.contains(origin))
            .cloned()
            .or_else(|| linked.into_iter().next());
        (target, replied)
    };
    let destination = destination.ok_or(RelayError::UnknownRecipient("UC02"))?;

    let slave = ctx
        .slaves
        .get(&destination.channel)
        .ok_or_else(|| RelayError::ChannelNotFound(destination.channel.clone()))?;
    let body = msg.body.ok_or(RelayError::UnsupportedByMaster)?;

    let reply_to = quoted
        .filter(|entry| entry.slave_origin == destination && entry.msg_type != MessageKind::System)
        .map(|entry| Box::new(quoted_message(&entry, ctx.master.info().emoji.clone())));

    let outbound = NormalizedMessage {
        channel_id: ctx.master_id().to_string(),
        channel_emoji: ctx.master.info().emoji.clone(),
        source: if msg.is_private { ChatType::User } else { ChatType::Group },
        origin: msg.sender,
        member: None,
        destination: Some(destination.clone()),
        text: msg.text,
        body,
        reply_to,
    };
    debug!(destination = %destination, kind = %outbound.body.kind(), "forwarding to slave");
    Ok(slave.send_message(outbound).await?)
}

/// The logged message an operator replied to, as the slave should quote it.
fn quoted_message(entry: &MessageLogEntry, emoji: String) -> NormalizedMessage {
    let origin = Identity::new(
        entry.slave_origin.uid.clone(),
        entry.slave_origin_display_name.clone(),
        entry.slave_origin_display_name.clone(),
    );
    let mut quoted = NormalizedMessage::text(
        entry.slave_origin.channel.clone(),
        emoji,
        if entry.slave_member_uid.is_some() {
            ChatType::Group
        } else {
            ChatType::User
        },
        origin,
        entry.text.clone(),
    );
    if let (Some(uid), Some(name)) = (&entry.slave_member_uid, &entry.slave_member_display_name) {
        quoted = quoted.with_member(Identity::new(uid.clone(), name.clone(), name.clone()));
    }
    quoted.destination = Some(entry.slave_origin.clone());
    quoted
}
