use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use switchyard_core::{ChatKey, MessageKind};

/// A persisted link between a master chat and one slave chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatAssociation {
    pub master: ChatKey,
    pub slave: ChatKey,
    pub created_at: DateTime<Utc>,
}

/// Which side a logged message was delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentTo {
    Master,
    Slave,
}

impl SentTo {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentTo::Master => "master",
            SentTo::Slave => "slave",
        }
    }

    pub(crate) fn from_db(s: &str) -> Self {
        if s == "slave" {
            SentTo::Slave
        } else {
            SentTo::Master
        }
    }
}

/// One row of the message log, keyed by the master-side message.
///
/// Written after every successful delivery to the master; read back to
/// thread replies and to decide whether new text merges into this message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageLogEntry {
    pub master_chat: ChatKey,
    pub master_msg_id: String,
    pub text: String,
    pub msg_type: MessageKind,
    pub sent_to: SentTo,
    pub slave_origin: ChatKey,
    pub slave_origin_display_name: String,
    /// Only set for group sources.
    pub slave_member_uid: Option<String>,
    pub slave_member_display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    /// When set, the entry replaces the most recent row for `master_chat`
    /// instead of adding a new one.
    pub update: bool,
}
