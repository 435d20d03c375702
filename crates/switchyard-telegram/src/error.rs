use switchyard_channels::ChannelError;
use teloxide::{ApiError, DownloadError, RequestError};

/// Errors produced by the Telegram adapter.
#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("teloxide error: {0}")]
    Teloxide(#[from] RequestError),

    #[error("download failed: {0}")]
    Download(#[from] DownloadError),

    #[error("no bot token configured")]
    NoToken,

    #[error("invalid chat id: {0}")]
    InvalidChatId(String),

    #[error("invalid message id: {0}")]
    InvalidMessageId(String),

    #[error("invalid button url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TelegramError> for ChannelError {
    fn from(e: TelegramError) -> Self {
        match e {
            TelegramError::Teloxide(RequestError::Api(ApiError::ChatNotFound)) => {
                ChannelError::ChatNotFound("telegram".to_string())
            }
            TelegramError::InvalidChatId(chat) => ChannelError::ChatNotFound(chat),
            TelegramError::Io(e) => ChannelError::Io(e),
            TelegramError::NoToken => ChannelError::Config("no bot token configured".into()),
            other => ChannelError::SendFailed(other.to_string()),
        }
    }
}
