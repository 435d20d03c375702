use thiserror::Error;

/// Rejected interactions. The display string is what the operator sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Session expired. Please try again. (SE01)")]
    Expired,

    /// Bad payload on a link picker.
    #[error("Invalid parameter ({0}). (IP01)")]
    InvalidLinkParameter(String),

    /// Bad payload on a chat-head picker.
    #[error("Invalid parameter ({0}). (IP02)")]
    InvalidChatParameter(String),

    #[error("Command '{command}' ({data}) is not recognised, please try again")]
    UnrecognisedCommand { command: String, data: String },

    #[error("Invalid parameter: {0}. (CE01)")]
    InvalidIndex(String),

    #[error("Index out of bound: {0}. (CE02)")]
    IndexOutOfBound(String),
}

impl SessionError {
    /// Code suffix shown to the operator, if the message carries one.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            SessionError::Expired => Some("SE01"),
            SessionError::InvalidLinkParameter(_) => Some("IP01"),
            SessionError::InvalidChatParameter(_) => Some("IP02"),
            SessionError::UnrecognisedCommand { .. } => None,
            SessionError::InvalidIndex(_) => Some("CE01"),
            SessionError::IndexOutOfBound(_) => Some("CE02"),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
