//! The master surface on top of the Telegram Bot API.
//!
//! Telegram caps messages at 4096 characters and captions at 1024; longer
//! text is clipped rather than split so a merged message keeps a single id.

use std::path::PathBuf;

use async_trait::async_trait;
use switchyard_channels::{
    Button, ChannelError, Keyboard, MasterSurface, MediaFile, MediaKind, OutboundMedia, Venue,
};
use switchyard_core::config::TelegramConfig;
use switchyard_core::{ChannelInfo, ChannelKind, MessageRef};
use teloxide::prelude::*;
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, InputFile, MessageId, ReplyParameters,
};
use teloxide::{ApiError, RequestError};
use tracing::{debug, info};

use crate::attach::download_to;
use crate::error::TelegramError;

pub const TELEGRAM_ID: &str = "telegram";
const TEXT_MAX: usize = 4096;
const CAPTION_MAX: usize = 1024;

type ChannelResult<T> = std::result::Result<T, ChannelError>;

pub struct TelegramMaster {
    bot: Bot,
    info: ChannelInfo,
    username: String,
    storage_dir: PathBuf,
}

impl TelegramMaster {
    /// Check the token with `getMe` and remember the bot's username for
    /// invite links.
    pub async fn connect(
        config: &TelegramConfig,
        storage_dir: impl Into<PathBuf>,
    ) -> Result<Self, TelegramError> {
        if config.bot_token.is_empty() {
            return Err(TelegramError::NoToken);
        }
        let bot = Bot::new(&config.bot_token);
        let me = bot.get_me().await?;
        let username = me.username.clone().unwrap_or_default();
        info!(bot = %username, "connected to Telegram");
        Ok(Self::with_bot(bot, username, storage_dir))
    }

    pub fn with_bot(bot: Bot, username: impl Into<String>, storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            bot,
            info: ChannelInfo {
                id: TELEGRAM_ID.to_string(),
                name: "Telegram".to_string(),
                emoji: "✈".to_string(),
                kind: ChannelKind::Master,
            },
            username: username.into(),
            storage_dir: storage_dir.into(),
        }
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    async fn send_media_inner(
        &self,
        chat: &str,
        media: OutboundMedia,
    ) -> Result<MessageRef, TelegramError> {
        let chat_id = chat_id(chat)?;
        let input = match media.file_name {
            Some(name) => InputFile::file(media.path).file_name(name),
            None => InputFile::file(media.path),
        };
        let caption = clip(&media.caption, CAPTION_MAX);
        let bot = &self.bot;
        let sent = match media.kind {
            MediaKind::Photo => bot.send_photo(chat_id, input).caption(caption).await,
            MediaKind::Animation => bot.send_animation(chat_id, input).caption(caption).await,
            MediaKind::Document => bot.send_document(chat_id, input).caption(caption).await,
            MediaKind::Voice => bot.send_voice(chat_id, input).caption(caption).await,
            MediaKind::Audio => bot.send_audio(chat_id, input).caption(caption).await,
            MediaKind::Video => bot.send_video(chat_id, input).caption(caption).await,
        }?;
        Ok(MessageRef::new(chat, sent.id.0.to_string()))
    }
}

#[async_trait]
impl MasterSurface for TelegramMaster {
    fn info(&self) -> &ChannelInfo {
        &self.info
    }

    async fn send_text(
        &self,
        chat: &str,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> ChannelResult<MessageRef> {
        let mut req = self.bot.send_message(chat_id(chat)?, clip(text, TEXT_MAX));
        if let Some(kb) = keyboard {
            req = req.reply_markup(markup(&kb)?);
        }
        let sent = req.await.map_err(TelegramError::from)?;
        Ok(MessageRef::new(chat, sent.id.0.to_string()))
    }

    async fn edit_text(
        &self,
        msg: &MessageRef,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> ChannelResult<()> {
        let mut req = self.bot.edit_message_text(
            chat_id(&msg.chat)?,
            message_id(&msg.message_id)?,
            clip(text, TEXT_MAX),
        );
        if let Some(kb) = keyboard {
            req = req.reply_markup(markup(&kb)?);
        }
        match req.await {
            Ok(_) => Ok(()),
            Err(RequestError::Api(ApiError::MessageNotModified)) => {
                debug!(msg = %msg, "edit left message unchanged");
                Ok(())
            }
            Err(e) => Err(TelegramError::from(e).into()),
        }
    }

    async fn send_media(&self, chat: &str, media: OutboundMedia) -> ChannelResult<MessageRef> {
        Ok(self.send_media_inner(chat, media).await?)
    }

    async fn send_venue(&self, chat: &str, venue: Venue) -> ChannelResult<MessageRef> {
        let title = if venue.title.is_empty() {
            "Location".to_string()
        } else {
            venue.title
        };
        let address = if venue.address.trim().is_empty() {
            title.clone()
        } else {
            venue.address
        };
        let sent = self
            .bot
            .send_venue(chat_id(chat)?, venue.latitude, venue.longitude, title, address)
            .await
            .map_err(TelegramError::from)?;
        Ok(MessageRef::new(chat, sent.id.0.to_string()))
    }

    async fn reply_text(&self, to: &MessageRef, text: &str) -> ChannelResult<MessageRef> {
        let params = ReplyParameters::new(message_id(&to.message_id)?).allow_sending_without_reply();
        let sent = self
            .bot
            .send_message(chat_id(&to.chat)?, clip(text, TEXT_MAX))
            .reply_parameters(params)
            .await
            .map_err(TelegramError::from)?;
        Ok(MessageRef::new(to.chat.clone(), sent.id.0.to_string()))
    }

    async fn download(&self, file_id: &str, stem: &str) -> ChannelResult<MediaFile> {
        Ok(download_to(&self.bot, file_id, &self.storage_dir, stem, None).await?)
    }

    fn group_invite_link(&self, token: &str) -> String {
        invite_link(&self.username, token)
    }
}

fn invite_link(username: &str, token: &str) -> String {
    format!("https://t.me/{username}?startgroup={token}")
}

fn chat_id(chat: &str) -> Result<ChatId, TelegramError> {
    chat.parse::<i64>()
        .map(ChatId)
        .map_err(|_| TelegramError::InvalidChatId(chat.to_string()))
}

fn message_id(id: &str) -> Result<MessageId, TelegramError> {
    id.parse::<i32>()
        .map(MessageId)
        .map_err(|_| TelegramError::InvalidMessageId(id.to_string()))
}

/// Inline keyboard for a relay [`Keyboard`].
pub fn markup(kb: &Keyboard) -> Result<InlineKeyboardMarkup, TelegramError> {
    let rows = kb
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| match b {
                    Button::Callback { label, data } => {
                        Ok(InlineKeyboardButton::callback(label.clone(), data.clone()))
                    }
                    Button::Url { label, url } => {
                        Ok(InlineKeyboardButton::url(label.clone(), url.parse()?))
                    }
                })
                .collect::<Result<Vec<_>, TelegramError>>()
        })
        .collect::<Result<Vec<_>, TelegramError>>()?;
    Ok(InlineKeyboardMarkup::new(rows))
}

/// At most `max` characters of `text`.
fn clip(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}
