//! Update handlers registered in the teloxide Dispatcher.

use std::path::PathBuf;
use std::sync::Arc;

use switchyard_core::{Identity, MessageRef};
use switchyard_relay::{
    forward_to_slave, handle_command, handle_interaction, CommandOrigin, MasterCommand,
    MasterInbound, RecogTarget, RelayContext, VoiceNote,
};
use teloxide::prelude::*;
use teloxide::types::User;
use tracing::{debug, warn};

use crate::allow;
use crate::attach;
use crate::error::TelegramError;

/// Shared state handed to every handler invocation.
pub struct HandlerState {
    pub relay: Arc<RelayContext>,
    pub admins: Vec<i64>,
    pub storage_dir: PathBuf,
}

/// Runs for every incoming `Message`:
/// 1. Bot-message filter
/// 2. Admin allowlist (deny-by-default)
/// 3. Command interception
/// 4. Media download and forwarding to the slave side
pub async fn handle_message(
    bot: Bot,
    msg: Message,
    state: Arc<HandlerState>,
) -> ResponseResult<()> {
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    if from.is_bot {
        return Ok(());
    }
    if !allow::is_admin(&state.admins, from.id.0) {
        debug!(user = from.id.0, chat = msg.chat.id.0, "ignoring message from non-admin");
        return Ok(());
    }

    let text = msg.text().or(msg.caption()).unwrap_or("").to_string();
    if let Some(cmd) = MasterCommand::parse(&text) {
        let origin = CommandOrigin {
            message: message_ref(&msg),
            sender_chat: from.id.0.to_string(),
            is_private: msg.chat.is_private(),
            recog_target: recog_target(&msg),
        };
        if let Err(e) = handle_command(&state.relay, cmd, &origin).await {
            debug!(code = e.code(), error = %e, "command ended with error");
        }
        return Ok(());
    }

    let body = match attach::inbound_body(&bot, &msg, &state.storage_dir).await {
        Ok(body) => body,
        Err(e) => {
            warn!(chat = msg.chat.id.0, error = %e, "Telegram: failed to fetch attachment");
            let notice = attachment_notice(&e);
            if let Err(e) = state.relay.master.reply_text(&message_ref(&msg), &notice).await {
                warn!(chat = msg.chat.id.0, error = %e, "could not report the failed download");
            }
            return Ok(());
        }
    };

    let inbound = MasterInbound {
        chat: msg.chat.id.0.to_string(),
        message_id: msg.id.0.to_string(),
        sender: identity(from),
        is_private: msg.chat.is_private(),
        reply_to: msg.reply_to_message().map(|r| r.id.0.to_string()),
        text,
        body,
    };
    if let Err(e) = forward_to_slave(&state.relay, inbound).await {
        debug!(code = e.code(), "message not forwarded");
    }
    Ok(())
}

/// Runs for every inline button press.
pub async fn handle_callback(
    bot: Bot,
    query: CallbackQuery,
    state: Arc<HandlerState>,
) -> ResponseResult<()> {
    // Dismiss the loading spinner whatever happens next.
    bot.answer_callback_query(&query.id).await?;

    if !allow::is_admin(&state.admins, query.from.id.0) {
        debug!(user = query.from.id.0, "ignoring button press from non-admin");
        return Ok(());
    }
    let (Some(data), Some(message)) = (query.data.as_deref(), query.message.as_ref()) else {
        return Ok(());
    };
    let prompt = MessageRef::new(message.chat().id.0.to_string(), message.id().0.to_string());
    if let Err(e) = handle_interaction(&state.relay, &prompt, data).await {
        warn!(code = e.code(), prompt = %prompt, error = %e, "interaction ended with error");
    }
    Ok(())
}

/// Told to the operator when their attachment never reached local storage.
fn attachment_notice(e: &TelegramError) -> String {
    format!("Error: Attachment not forwarded, download failed. ({e})")
}

fn message_ref(msg: &Message) -> MessageRef {
    MessageRef::new(msg.chat.id.0.to_string(), msg.id.0.to_string())
}

fn identity(user: &User) -> Identity {
    let name = user.full_name();
    let alias = user.username.clone().unwrap_or_else(|| name.clone());
    Identity::new(user.id.0.to_string(), name, alias)
}

/// What a `/recog` command replied to.
fn recog_target(msg: &Message) -> Option<RecogTarget> {
    let replied = msg.reply_to_message()?;
    Some(match replied.voice() {
        Some(voice) => RecogTarget::Voice(VoiceNote {
            message: message_ref(replied),
            file_id: voice.file.id.to_string(),
            duration_secs: voice.duration.seconds(),
        }),
        None => RecogTarget::Other,
    })
}
