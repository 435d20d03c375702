use serde::{Deserialize, Serialize};
use switchyard_channels::CommandDescriptor;
use switchyard_core::{ChatKey, ChatType, Identity, MessageRef};

/// One selectable slave chat in a picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCandidate {
    pub key: ChatKey,
    pub channel_name: String,
    pub channel_emoji: String,
    pub identity: Identity,
    pub chat_type: ChatType,
    /// Linked to some master chat when the list was built.
    pub linked: bool,
}

impl ChatCandidate {
    pub fn display_name(&self) -> String {
        self.identity.display_name()
    }
}

/// Which command opened a picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Flow {
    Link,
    ChatHead,
}

/// A paginated list of candidates, computed once and reused by every page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPicker {
    pub candidates: Vec<ChatCandidate>,
    /// One line per channel, e.g. `"🔁: Loopback"`.
    pub legend: Vec<String>,
    pub offset: usize,
    pub filter: Option<String>,
}

impl ChatPicker {
    pub fn total(&self) -> usize {
        self.candidates.len()
    }

    /// Candidates on the current page with their absolute indices.
    pub fn page(&self, size: usize) -> impl Iterator<Item = (usize, &ChatCandidate)> {
        self.candidates
            .iter()
            .enumerate()
            .skip(self.offset)
            .take(size)
    }

    pub fn has_prev(&self) -> bool {
        self.offset > 0
    }

    pub fn has_next(&self, size: usize) -> bool {
        self.offset + size < self.total()
    }
}

/// The chat chosen for linking, plus the list its index refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkTarget {
    pub candidates: Vec<ChatCandidate>,
    pub selected: usize,
}

impl LinkTarget {
    pub fn chat(&self) -> Option<&ChatCandidate> {
        self.candidates.get(self.selected)
    }
}

/// A slave-supplied menu waiting for the operator to pick an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCommand {
    pub channel: String,
    /// Prompt text as delivered; the result is appended below it.
    pub text: String,
    pub commands: Vec<CommandDescriptor>,
}

/// Transient state attached to one prompt message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Session {
    LinkConfirm(ChatPicker),
    LinkExec(LinkTarget),
    ChatPicker(ChatPicker),
    CommandPending(PendingCommand),
}

impl Session {
    pub fn name(&self) -> &'static str {
        match self {
            Session::LinkConfirm(_) => "link_confirm",
            Session::LinkExec(_) => "link_exec",
            Session::ChatPicker(_) => "chat_picker",
            Session::CommandPending(_) => "command_pending",
        }
    }
}

/// Issued when a link prompt offers a group deep link. Redeemed by
/// `/start {token}` in the group the bot gets added to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingLink {
    pub candidate: ChatCandidate,
    /// The link prompt to update once the group is linked.
    pub prompt: MessageRef,
    /// Replace an existing link instead of refusing it.
    pub relink: bool,
}
