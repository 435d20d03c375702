pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use error::{Result, SwitchyardError};
pub use types::{ChannelInfo, ChannelKind, ChatKey, ChatType, Identity, MessageKind, MessageRef};
