//! Inbound media handling for the Telegram adapter.
//!
//! Downloads Telegram media via `get_file` + `download_file` into the storage
//! directory and describes it as a [`MessageBody`] for the slave side.

use std::future::Future;
use std::path::{Path, PathBuf};

use switchyard_channels::{MediaFile, MessageBody};
use teloxide::net::Download;
use teloxide::prelude::*;
use tracing::{debug, warn};

use crate::error::TelegramError;

/// Map a master message to the body sent to the slave.
///
/// `Ok(None)` means the message kind has no slave-side equivalent.
pub async fn inbound_body(
    bot: &Bot,
    msg: &Message,
    dir: &Path,
) -> Result<Option<MessageBody>, TelegramError> {
    if msg.text().is_some() {
        return Ok(Some(MessageBody::Text));
    }
    let stem = format!("{}_{}", msg.chat.id.0, msg.id.0);

    // photo: highest resolution is the last size
    if let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) {
        let file = download_to(bot, &photo.file.id, dir, &stem, Some("image/jpeg")).await?;
        return Ok(Some(MessageBody::Image(file)));
    }

    if let Some(sticker) = msg.sticker() {
        let file = download_to(bot, &sticker.file.id, dir, &stem, Some("image/webp")).await?;
        return Ok(Some(MessageBody::Sticker(file)));
    }

    // animations also carry a document, so look at them first
    if let Some(animation) = msg.animation() {
        let mime = animation
            .mime_type
            .as_ref()
            .map(|m| m.as_ref())
            .unwrap_or("video/mp4");
        let file = download_to(bot, &animation.file.id, dir, &stem, Some(mime)).await?;
        return Ok(Some(MessageBody::Video(file)));
    }

    if let Some(doc) = msg.document() {
        let mime = doc
            .mime_type
            .as_ref()
            .map(|m| m.as_ref())
            .unwrap_or("application/octet-stream");
        let stem = match doc.file_name.as_deref().and_then(|n| Path::new(n).file_stem()) {
            Some(name) => format!("{stem}_{}", sanitize(&name.to_string_lossy())),
            None => stem,
        };
        let file = download_named(
            bot,
            &doc.file.id,
            dir,
            &stem,
            Some(mime),
            doc.file_name.as_deref(),
        )
        .await?;
        return Ok(Some(MessageBody::File(file)));
    }

    if let Some(video) = msg.video() {
        let mime = video
            .mime_type
            .as_ref()
            .map(|m| m.as_ref())
            .unwrap_or("video/mp4");
        let file = download_to(bot, &video.file.id, dir, &stem, Some(mime)).await?;
        return Ok(Some(MessageBody::Video(file)));
    }

    if let Some(audio) = msg.audio() {
        let mime = audio
            .mime_type
            .as_ref()
            .map(|m| m.as_ref())
            .unwrap_or("audio/mpeg");
        let file = download_to(bot, &audio.file.id, dir, &stem, Some(mime)).await?;
        return Ok(Some(MessageBody::Audio(file)));
    }

    // voice (OGG/Opus)
    if let Some(voice) = msg.voice() {
        let file = download_to(bot, &voice.file.id, dir, &stem, Some("audio/ogg")).await?;
        return Ok(Some(MessageBody::Audio(file)));
    }

    if let Some(location) = msg.location() {
        return Ok(Some(MessageBody::Location {
            latitude: location.latitude,
            longitude: location.longitude,
        }));
    }

    Ok(None)
}

/// Download `file_id` to `dir/{stem}{ext}`.
///
/// Without a known MIME type the type is guessed from Telegram's own file
/// path.
pub async fn download_to(
    bot: &Bot,
    file_id: &str,
    dir: &Path,
    stem: &str,
    mime: Option<&str>,
) -> Result<MediaFile, TelegramError> {
    download_named(bot, file_id, dir, stem, mime, None).await
}

async fn download_named(
    bot: &Bot,
    file_id: &str,
    dir: &Path,
    stem: &str,
    mime: Option<&str>,
    original: Option<&str>,
) -> Result<MediaFile, TelegramError> {
    tokio::fs::create_dir_all(dir).await?;
    let file = bot.get_file(file_id).await?;

    let (name, mime) = stored_name(stem, original, &file.path, mime);
    let path: PathBuf = dir.join(name);

    let remote = file.path.as_str();
    write_fresh(&path, |mut dst| async move { bot.download_file(remote, &mut dst).await }).await?;
    debug!(file_id, path = %path.display(), size = file.size, "telegram file downloaded");

    Ok(MediaFile::new(path, mime))
}

/// Create `path` and hand it to `fill`. A failed fill leaves no file behind.
async fn write_fresh<F, Fut, E>(path: &Path, fill: F) -> Result<(), TelegramError>
where
    F: FnOnce(tokio::fs::File) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    TelegramError: From<E>,
{
    let dst = tokio::fs::File::create(path).await?;
    if let Err(e) = fill(dst).await {
        if let Err(rm) = tokio::fs::remove_file(path).await {
            warn!(path = %path.display(), error = %rm, "could not remove partial download");
        }
        return Err(e.into());
    }
    Ok(())
}

/// File name and MIME type for a download.
///
/// The extension is taken from the sender's file name, then Telegram's file
/// path, then the first extension registered for `mime`.
fn stored_name(
    stem: &str,
    original: Option<&str>,
    telegram_path: &str,
    mime: Option<&str>,
) -> (String, String) {
    let ext = original
        .and_then(extension_of)
        .or_else(|| extension_of(telegram_path))
        .or_else(|| {
            mime.and_then(mime_guess::get_mime_extensions_str)
                .and_then(|exts| exts.first())
                .map(|e| e.to_string())
        });
    let name = match ext {
        Some(ext) => format!("{stem}.{}", sanitize(&ext)),
        None => stem.to_string(),
    };
    let mime = match mime {
        Some(m) => m.to_string(),
        None => mime_guess::from_path(&name).first_or_octet_stream().to_string(),
    };
    (name, mime)
}

fn extension_of(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .filter(|e| !e.is_empty())
}

/// Keep a user-supplied file name safe to use inside the storage directory.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}
