pub mod adapter;
pub mod allow;
pub mod attach;
pub mod error;
pub mod handler;
pub mod send;

pub use adapter::TelegramAdapter;
pub use error::TelegramError;
pub use handler::HandlerState;
pub use send::TelegramMaster;
