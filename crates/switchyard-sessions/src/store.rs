use dashmap::DashMap;
use switchyard_core::MessageRef;
use tracing::debug;
use uuid::Uuid;

use crate::types::{PendingLink, Session};

/// In-memory sessions keyed by prompt message, plus outstanding link tokens.
///
/// Nothing here survives a restart; a prompt without an entry is expired.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<MessageRef, Session>,
    links: DashMap<String, PendingLink>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, prompt: &MessageRef) -> Option<Session> {
        self.sessions.get(prompt).map(|s| s.value().clone())
    }

    pub fn put(&self, prompt: MessageRef, session: Session) {
        debug!(prompt = %prompt, state = session.name(), "session stored");
        self.sessions.insert(prompt, session);
    }

    /// Forget the session of `prompt` along with any link token it issued.
    pub fn clear(&self, prompt: &MessageRef) -> Option<Session> {
        self.drop_links_for(prompt);
        let removed = self.sessions.remove(prompt).map(|(_, s)| s);
        if removed.is_some() {
            debug!(prompt = %prompt, "session cleared");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Store `link` under a fresh random token and return the token. A
    /// prompt has at most one live token; issuing again revokes the old one.
    ///
    /// Tokens are 32 hex chars so they fit a Telegram `startgroup` payload.
    pub fn issue_link(&self, link: PendingLink) -> String {
        self.drop_links_for(&link.prompt);
        let token = Uuid::new_v4().simple().to_string();
        self.links.insert(token.clone(), link);
        token
    }

    /// Redeem a token. Each token works once.
    pub fn take_link(&self, token: &str) -> Option<PendingLink> {
        self.links.remove(token).map(|(_, l)| l)
    }

    pub fn pending_links(&self) -> usize {
        self.links.len()
    }

    fn drop_links_for(&self, prompt: &MessageRef) {
        self.links.retain(|_, l| &l.prompt != prompt);
    }
}
