pub mod channel;
pub mod error;
pub mod loopback;
pub mod master;
pub mod queue;
pub mod registry;
pub mod types;

pub use channel::Channel;
pub use error::ChannelError;
pub use loopback::{LoopbackChannel, LOOPBACK_ID};
pub use master::{Button, Keyboard, MasterSurface, MediaKind, OutboundMedia, Venue};
pub use queue::{message_queue, MessageQueue, QueueReceiver};
pub use registry::ChannelRegistry;
pub use types::{
    ChatEntry, CommandDescriptor, Delivery, ExtraFunction, MediaFile, MessageBody,
    NormalizedMessage,
};
