pub mod error;
pub mod locks;
pub mod machine;
pub mod store;
pub mod types;

pub use error::SessionError;
pub use locks::{KeyedGuard, KeyedLocks};
pub use machine::{step, Effect, Interaction, Step};
pub use store::SessionStore;
pub use types::{ChatCandidate, ChatPicker, Flow, LinkTarget, PendingCommand, PendingLink, Session};
