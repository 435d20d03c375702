use thiserror::Error;

#[derive(Debug, Error)]
pub enum SwitchyardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid chat key: {0}")]
    InvalidChatKey(String),

    #[error("Unknown message kind: {0}")]
    UnknownMessageKind(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SwitchyardError {
    /// Short error code string used in logs.
    pub fn code(&self) -> &'static str {
        match self {
            SwitchyardError::Config(_) => "CONFIG_ERROR",
            SwitchyardError::InvalidChatKey(_) => "INVALID_CHAT_KEY",
            SwitchyardError::UnknownMessageKind(_) => "UNKNOWN_MESSAGE_KIND",
            SwitchyardError::Io(_) => "IO_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, SwitchyardError>;
