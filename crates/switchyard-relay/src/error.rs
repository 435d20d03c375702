use switchyard_channels::ChannelError;
use switchyard_sessions::SessionError;
use switchyard_store::StoreError;
use thiserror::Error;

/// Everything that can go wrong while relaying one message or handling one
/// operator action.
///
/// Variants that carry a code render as the exact text shown to the operator.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("channel: {0}")]
    Channel(#[from] ChannelError),

    #[error("{0}")]
    Session(#[from] SessionError),

    #[error("Error: Empty {kind} received. ({code})")]
    EmptyPayload { kind: String, code: &'static str },

    /// Code is one of UC01, UC02, UC03.
    #[error("Unknown recipient ({0}).")]
    UnknownRecipient(&'static str),

    #[error("Internal error: Channel not found. (CH01)")]
    ChannelNotFound(String),

    #[error("Internal error: Chat not found in channel. (CN01)")]
    ChatNotFound(String),

    #[error("Message type not supported. (MN01)")]
    UnsupportedBySlave(String),

    #[error("Message type not supported. (MN02)")]
    UnsupportedByMaster,

    #[error("Invalid slave channel ID. (XC01)")]
    InvalidSlaveIndex(usize),

    #[error("Command not found in selected channel. (XC02)")]
    FunctionNotFound(String),

    #[error("Link request expired or unknown. (LK01)")]
    LinkExpired,

    #[error("Chat '{0}' is already linked to another chat. (LK02)")]
    AlreadyLinked(String),

    #[error("Invalid filter ({0}). (IP03)")]
    InvalidFilter(String),

    #[error(
        "/recog [lang_code]\nReply to a voice with this command to recognize it.\nExamples:\n/recog\n/recog zh\n/recog en\n(RS01)"
    )]
    RecogNoReply,

    #[error("Reply only to a voice with this command to recognize it. (RS02)")]
    RecogNotVoice,

    #[error("Language is not supported. Try with zh, ja or en. (RS03)")]
    RecogLanguage(String),

    #[error("Only voice shorter than 60s is supported. (RS04)")]
    RecogTooLong(u32),

    #[error("no admin chat configured for unlinked messages")]
    NoDefaultChat,

    #[error("transcode failed: {0}")]
    Transcode(String),

    #[error("speech recognition failed: {0}")]
    Speech(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    /// Stable code used in logs and in operator-facing messages.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::Store(StoreError::Conflict { .. }) => "LK02",
            RelayError::Store(_) => "STORE_ERROR",
            RelayError::Channel(ChannelError::ChatNotFound(_)) => "CN01",
            RelayError::Channel(ChannelError::UnsupportedType(_)) => "MN01",
            RelayError::Channel(ChannelError::FunctionNotFound(_)) => "XC02",
            RelayError::Channel(_) => "CHANNEL_ERROR",
            RelayError::Session(e) => e.code().unwrap_or("SESSION_ERROR"),
            RelayError::EmptyPayload { code, .. } => *code,
            RelayError::UnknownRecipient(code) => *code,
            RelayError::ChannelNotFound(_) => "CH01",
            RelayError::ChatNotFound(_) => "CN01",
            RelayError::UnsupportedBySlave(_) => "MN01",
            RelayError::UnsupportedByMaster => "MN02",
            RelayError::InvalidSlaveIndex(_) => "XC01",
            RelayError::FunctionNotFound(_) => "XC02",
            RelayError::LinkExpired => "LK01",
            RelayError::AlreadyLinked(_) => "LK02",
            RelayError::InvalidFilter(_) => "IP03",
            RelayError::RecogNoReply => "RS01",
            RelayError::RecogNotVoice => "RS02",
            RelayError::RecogLanguage(_) => "RS03",
            RelayError::RecogTooLong(_) => "RS04",
            RelayError::NoDefaultChat => "NO_DEFAULT_CHAT",
            RelayError::Transcode(_) => "TRANSCODE_ERROR",
            RelayError::Speech(_) => "SPEECH_ERROR",
            RelayError::Io(_) => "IO_ERROR",
        }
    }

    /// Text shown to the operator on the message that triggered the failure.
    ///
    /// Slave errors with an operator code are rendered with that code's
    /// message; anything else keeps its own text behind an `Error:` marker.
    pub fn operator_text(&self) -> String {
        match self {
            RelayError::Channel(ChannelError::ChatNotFound(uid)) => {
                RelayError::ChatNotFound(uid.clone()).to_string()
            }
            RelayError::Channel(ChannelError::UnsupportedType(kind)) => {
                RelayError::UnsupportedBySlave(kind.clone()).to_string()
            }
            RelayError::Channel(ChannelError::FunctionNotFound(name)) => {
                RelayError::FunctionNotFound(name.clone()).to_string()
            }
            RelayError::Channel(e) => format!("Error: {e}"),
            RelayError::Store(_)
            | RelayError::Transcode(_)
            | RelayError::Speech(_)
            | RelayError::Io(_) => format!("Error: {self}"),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
