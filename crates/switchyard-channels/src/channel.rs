use async_trait::async_trait;
use switchyard_core::{ChannelInfo, ChannelKind};

use crate::{
    error::{ChannelError, Result},
    queue::MessageQueue,
    types::{ChatEntry, Delivery, ExtraFunction, NormalizedMessage},
};

/// Common interface implemented by every slave platform adapter.
///
/// Implementations must be `Send + Sync` so they can be stored in a
/// [`ChannelRegistry`](crate::registry::ChannelRegistry) and driven from
/// multiple Tokio tasks.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Static metadata. `info().id` is the key inside the registry and the
    /// `channel` half of every chat key this adapter produces.
    fn info(&self) -> &ChannelInfo;

    /// Every conversation the platform currently knows about.
    async fn list_chats(&self) -> Result<Vec<ChatEntry>>;

    /// Deliver a message to `msg.destination`.
    ///
    /// Fails with [`ChannelError::ChatNotFound`] for an unknown destination and
    /// [`ChannelError::UnsupportedType`] when the body kind cannot be carried.
    async fn send_message(&self, msg: NormalizedMessage) -> Result<Delivery>;

    /// Ad-hoc functions the operator can invoke from the master surface.
    fn extra_functions(&self) -> Vec<ExtraFunction> {
        Vec::new()
    }

    async fn call_extra(&self, name: &str, _args: &str) -> Result<String> {
        Err(ChannelError::FunctionNotFound(name.to_string()))
    }

    /// Receive loop. Publishes every inbound message to `queue` and only
    /// returns when the platform connection ends.
    async fn poll(&self, queue: MessageQueue) -> Result<()>;
}

pub(crate) fn slave_info(id: &str, name: &str, emoji: &str) -> ChannelInfo {
    ChannelInfo {
        id: id.to_string(),
        name: name.to_string(),
        emoji: emoji.to_string(),
        kind: ChannelKind::Slave,
    }
}
