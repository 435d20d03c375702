use thiserror::Error;

/// Errors raised by the association store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The slave chat is already linked to a different master chat.
    #[error("chat {slave} is already linked to {existing}")]
    Conflict { slave: String, existing: String },

    /// A stored chat key or timestamp could not be parsed back.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
