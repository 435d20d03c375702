//! `/recog`: run speech recognition on a voice message the operator replied to.

use std::path::Path;

use async_trait::async_trait;
use switchyard_core::MessageRef;
use tracing::{debug, warn};

use crate::context::RelayContext;
use crate::error::{RelayError, Result};

/// Voices longer than this are refused.
pub const MAX_VOICE_SECS: u32 = 60;

/// Languages accepted without asking the backends.
const BUILTIN_LANGS: [&str; 3] = ["zh", "en", "ja"];

const NOT_ENABLED: &str = "Not enabled or error in configuration.";

/// A speech-to-text backend.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    fn name(&self) -> &str;

    /// Language codes this backend understands, e.g. `"en-US"`.
    fn languages(&self) -> Vec<String>;

    /// Languages tried when the operator did not ask for one.
    fn default_languages(&self) -> Vec<String>;

    /// Candidate transcripts, best first.
    async fn recognize(&self, audio: &Path, lang: &str) -> Result<Vec<String>>;
}

/// A voice message on the master, as described by the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceNote {
    pub message: MessageRef,
    pub file_id: String,
    pub duration_secs: u32,
}

/// What `/recog` was replying to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecogTarget {
    Voice(VoiceNote),
    /// A reply to something that is not a voice message.
    Other,
}

fn language_supported(ctx: &RelayContext, lang: &str) -> bool {
    let prefix: String = lang.chars().take(2).collect();
    BUILTIN_LANGS.contains(&prefix.as_str())
        || ctx
            .recognizers
            .iter()
            .any(|r| r.languages().iter().any(|l| l == lang))
}

/// Languages `recognizer` should try for the operator's request.
fn languages_for(recognizer: &dyn SpeechRecognizer, requested: Option<&str>) -> Vec<String> {
    match requested {
        None => recognizer.default_languages(),
        Some(lang) => {
            let supported = recognizer.languages();
            if supported.iter().any(|l| l == lang) {
                return vec![lang.to_string()];
            }
            let prefix: String = lang.chars().take(2).collect();
            supported
                .into_iter()
                .find(|l| l.starts_with(&prefix))
                .into_iter()
                .collect()
        }
    }
}

/// Validate the request, fetch the voice, run every backend and reply to the
/// voice with the grouped transcripts.
pub async fn recognize_speech(
    ctx: &RelayContext,
    target: Option<RecogTarget>,
    lang: Option<&str>,
) -> Result<MessageRef> {
    let voice = match target {
        None => return Err(RelayError::RecogNoReply),
        Some(RecogTarget::Other) => return Err(RelayError::RecogNotVoice),
        Some(RecogTarget::Voice(v)) => v,
    };
    if let Some(lang) = lang {
        if !language_supported(ctx, lang) {
            return Err(RelayError::RecogLanguage(lang.to_string()));
        }
    }
    if voice.duration_secs > MAX_VOICE_SECS {
        return Err(RelayError::RecogTooLong(voice.duration_secs));
    }

    let mut sections: Vec<(String, Vec<String>)> = Vec::new();
    if ctx.recognizers.is_empty() {
        sections.push(("Speech recognition".to_string(), vec![NOT_ENABLED.to_string()]));
    } else {
        let stem = format!("Audio_{}_{}", voice.message.chat, voice.message.message_id);
        let file = ctx.master.download(&voice.file_id, &stem).await?;
        for recognizer in &ctx.recognizers {
            for l in languages_for(recognizer.as_ref(), lang) {
                debug!(backend = recognizer.name(), lang = %l, "recognising voice");
                let lines = match recognizer.recognize(&file.path, &l).await {
                    Ok(lines) => lines,
                    Err(e) => {
                        warn!(backend = recognizer.name(), error = %e, "speech backend failed");
                        vec![NOT_ENABLED.to_string()]
                    }
                };
                sections.push((format!("{} ({l})", recognizer.name()), lines));
            }
        }
        if let Err(e) = tokio::fs::remove_file(&file.path).await {
            warn!(path = %file.path.display(), error = %e, "could not remove voice file");
        }
    }

    let mut text = String::from("Results:\n");
    for (label, lines) in &sections {
        text.push_str(&format!("\n{label}:\n"));
        for line in lines {
            text.push_str(line);
            text.push('\n');
        }
    }
    Ok(ctx.master.reply_text(&voice.message, &text).await?)
}
