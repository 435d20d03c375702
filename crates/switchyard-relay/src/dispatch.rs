//! Slave → master delivery.

use chrono::Duration;
use switchyard_channels::{
    Button, Keyboard, MediaFile, MediaKind, MessageBody, NormalizedMessage, OutboundMedia, Venue,
};
use switchyard_core::{ChatKey, ChatType, MessageKind, MessageRef};
use switchyard_sessions::{PendingCommand, Session};
use switchyard_store::{MessageLogEntry, SentTo};
use tracing::{debug, instrument, warn};

use crate::context::RelayContext;
use crate::error::{RelayError, Result};
use crate::render::{template, Template};

/// What ended up on the master, for the log.
struct Sent {
    msg: MessageRef,
    /// Text recorded in the log (merged text when `update`).
    text: String,
    kind: MessageKind,
    update: bool,
}

/// Deliver one slave message to its master chat and log it.
///
/// The destination's lock is held for the whole read-decide-send-write
/// sequence so two messages for the same chat cannot both decide to merge
/// into the same earlier message.
#[instrument(skip(ctx, msg), fields(origin = %msg.origin_key(), kind = %msg.body.kind()))]
pub async fn deliver(ctx: &RelayContext, msg: NormalizedMessage) -> Result<()> {
    let origin = msg.origin_key();
    let linked_to = ctx.store.get_master_chat(&origin)?;
    let linked = linked_to.is_some();
    let dest = match linked_to {
        Some(dest) => dest,
        None => ctx.default_destination()?,
    };
    let tpl = template(&msg, linked);
    debug!(dest = %dest, linked, "resolved destination");

    let _guard = ctx.dest_locks.lock(&dest).await;

    let media = msg.body.media().cloned();
    let outcome = send(ctx, &dest, &tpl, &msg).await;
    if let Some(file) = media {
        remove_quietly(&file.path).await;
    }

    let Some(sent) = outcome? else {
        return Ok(());
    };

    if matches!(msg.source, ChatType::User | ChatType::Group) {
        let member = msg.member.as_ref().filter(|_| msg.source == ChatType::Group);
        ctx.store.append_message_log(&MessageLogEntry {
            master_chat: dest,
            master_msg_id: sent.msg.message_id,
            text: sent.text,
            msg_type: sent.kind,
            sent_to: SentTo::Master,
            slave_origin: origin,
            slave_origin_display_name: msg.origin.display_name(),
            slave_member_uid: member.map(|m| m.uid.clone()),
            slave_member_display_name: member.map(|m| m.display_name()),
            created_at: ctx.clock.now(),
            update: sent.update,
        })?;
    }
    Ok(())
}

/// Returns `None` when a notice was delivered instead of the content.
async fn send(
    ctx: &RelayContext,
    dest: &ChatKey,
    tpl: &Template,
    msg: &NormalizedMessage,
) -> Result<Option<Sent>> {
    let chat = dest.uid.as_str();
    let master = &ctx.master;
    let kind = msg.body.kind();

    if let Some(file) = msg.body.media() {
        if file.is_empty().await {
            let err = RelayError::EmptyPayload {
                kind: kind.to_string(),
                code: empty_code(kind),
            };
            warn!(code = err.code(), path = %file.path.display(), "empty media payload");
            master.send_text(chat, &tpl.apply(&err.to_string()), None).await?;
            return Ok(None);
        }
    }

    let sent = match &msg.body {
        MessageBody::Text | MessageBody::Link { .. } => {
            let text = match &msg.body {
                MessageBody::Link { url } if msg.text.is_empty() => url.clone(),
                _ => msg.text.clone(),
            };
            return send_text(ctx, dest, tpl, msg, text, kind).await.map(Some);
        }
        MessageBody::Image(file) | MessageBody::Sticker(file) => {
            let default = if kind == MessageKind::Sticker {
                "sent a sticker."
            } else {
                "sent a picture."
            };
            let caption = or_default(&msg.text, default);
            let media_kind = if file.mime == "image/gif" {
                MediaKind::Animation
            } else {
                MediaKind::Photo
            };
            let sent = master
                .send_media(chat, outbound(media_kind, file, None, tpl.apply(&caption)))
                .await?;
            (sent, caption)
        }
        MessageBody::File(file) => {
            let (name, caption) = if msg.text.is_empty() {
                (file.file_name(), "sent a file.".to_string())
            } else {
                (Some(msg.text.clone()), msg.text.clone())
            };
            let sent = master
                .send_media(chat, outbound(MediaKind::Document, file, name, tpl.apply(&caption)))
                .await?;
            (sent, caption)
        }
        MessageBody::Video(file) => {
            let caption = or_default(&msg.text, "sent a video.");
            let sent = master
                .send_media(chat, outbound(MediaKind::Video, file, None, tpl.apply(&caption)))
                .await?;
            (sent, caption)
        }
        MessageBody::Audio(file) => (send_audio(ctx, chat, tpl, &msg.text, file).await?, msg.text.clone()),
        MessageBody::Location {
            latitude,
            longitude,
        } => {
            let venue = Venue {
                latitude: *latitude,
                longitude: *longitude,
                title: msg.text.clone(),
                address: tpl.apply(""),
            };
            (master.send_venue(chat, venue).await?, msg.text.clone())
        }
        MessageBody::Command { commands } => {
            let rows = commands
                .iter()
                .enumerate()
                .map(|(i, c)| vec![Button::callback(c.label.clone(), i.to_string())])
                .collect();
            let text = tpl.apply(&msg.text);
            let sent = master
                .send_text(chat, &text, Some(Keyboard::new(rows)))
                .await?;
            ctx.sessions.put(
                sent.clone(),
                Session::CommandPending(PendingCommand {
                    channel: msg.channel_id.clone(),
                    text,
                    commands: commands.clone(),
                }),
            );
            (sent, msg.text.clone())
        }
        MessageBody::System => (
            master.send_text(chat, &tpl.apply(&msg.text), None).await?,
            msg.text.clone(),
        ),
        MessageBody::Unsupported => {
            let notice = "Unsupported incoming message type. (UT01)";
            warn!(code = "UT01", "unsupported slave message");
            (master.send_text(chat, &tpl.apply(notice), None).await?, notice.to_string())
        }
    };

    let (msg_ref, text) = sent;
    Ok(Some(Sent {
        msg: msg_ref,
        text,
        kind,
        update: false,
    }))
}

/// Send text, or fold it into the previous message from the same sender when
/// that one is recent enough.
async fn send_text(
    ctx: &RelayContext,
    dest: &ChatKey,
    tpl: &Template,
    msg: &NormalizedMessage,
    text: String,
    kind: MessageKind,
) -> Result<Sent> {
    if let Some(last) = ctx.store.get_last_message(dest)? {
        if should_merge(ctx, &last, msg) {
            let merged = format!("{}\n{}", last.text, text);
            let target = MessageRef::new(dest.uid.clone(), last.master_msg_id.clone());
            debug!(target = %target, "merging into previous message");
            ctx.master
                .edit_text(&target, &tpl.apply(&merged), None)
                .await?;
            return Ok(Sent {
                msg: target,
                text: merged,
                kind,
                update: true,
            });
        }
    }

    let sent = ctx.master.send_text(&dest.uid, &tpl.apply(&text), None).await?;
    Ok(Sent {
        msg: sent,
        text,
        kind,
        update: false,
    })
}

fn should_merge(ctx: &RelayContext, last: &MessageLogEntry, msg: &NormalizedMessage) -> bool {
    if !last.msg_type.is_mergeable() || last.slave_origin != msg.origin_key() {
        return false;
    }
    if msg.source == ChatType::Group {
        let member = msg.member.as_ref().map(|m| m.uid.as_str());
        if last.slave_member_uid.as_deref() != member {
            return false;
        }
    }
    let window = Duration::seconds(ctx.config.join_msg_threshold_secs as i64);
    ctx.clock.now() - last.created_at <= window
}

async fn send_audio(
    ctx: &RelayContext,
    chat: &str,
    tpl: &Template,
    text: &str,
    file: &MediaFile,
) -> Result<MessageRef> {
    let caption = tpl.apply(text);
    if ctx.config.no_conversion {
        let kind = if file.mime == "audio/mpeg" {
            MediaKind::Audio
        } else {
            MediaKind::Document
        };
        return Ok(ctx
            .master
            .send_media(chat, outbound(kind, file, None, caption))
            .await?);
    }

    let voice = match ctx.transcoder.to_voice(&file.path).await {
        Ok(voice) => voice,
        Err(e) => {
            warn!(code = e.code(), error = %e, "transcode failed, sending the original file");
            return Ok(ctx
                .master
                .send_media(chat, outbound(MediaKind::Document, file, file.file_name(), caption))
                .await?);
        }
    };
    let media = OutboundMedia {
        kind: MediaKind::Voice,
        path: voice.clone(),
        file_name: None,
        caption,
    };
    let result = ctx.master.send_media(chat, media).await;
    remove_quietly(&voice).await;
    Ok(result?)
}

fn outbound(kind: MediaKind, file: &MediaFile, file_name: Option<String>, caption: String) -> OutboundMedia {
    OutboundMedia {
        kind,
        path: file.path.clone(),
        file_name,
        caption,
    }
}

fn or_default(text: &str, default: &str) -> String {
    if text.is_empty() {
        default.to_string()
    } else {
        text.to_string()
    }
}

fn empty_code(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::File => "MS02",
        MessageKind::Audio => "MS03",
        MessageKind::Video => "MS04",
        _ => "MS01",
    }
}

async fn remove_quietly(path: &std::path::Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "could not remove media file");
        }
    }
}
