use thiserror::Error;

/// Errors that can occur within any channel adapter.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The destination chat is not known to the channel.
    #[error("Chat not found: {0}")]
    ChatNotFound(String),

    /// The channel cannot carry this kind of message.
    #[error("Unsupported message type: {0}")]
    UnsupportedType(String),

    /// No extra function with this name is exposed by the channel.
    #[error("Function not found: {0}")]
    FunctionNotFound(String),

    /// A message could not be delivered to the remote endpoint.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// The underlying transport could not be established or dropped.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The message queue consumer is gone.
    #[error("Message queue closed")]
    QueueClosed,

    /// The channel-specific configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ChannelError>;
