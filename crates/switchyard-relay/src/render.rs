//! Prefixes put in front of relayed content so the operator can tell who is
//! talking.

use switchyard_channels::NormalizedMessage;
use switchyard_core::ChatType;

/// A rendered header, applied to whatever content is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    prefix: String,
}

impl Template {
    pub fn apply(&self, body: &str) -> String {
        format!("{}{body}", self.prefix)
    }
}

/// Pick the template for `msg`.
///
/// A linked chat already has its own master thread, so only the group member
/// is named. Unlinked chats all land in one place and need the full header.
pub fn template(msg: &NormalizedMessage, linked: bool) -> Template {
    let member = msg
        .member
        .as_ref()
        .map(|m| m.display_name())
        .unwrap_or_default();

    let prefix = if linked {
        if msg.source == ChatType::Group && !member.is_empty() {
            format!("{member}:\n")
        } else {
            String::new()
        }
    } else {
        match msg.source {
            ChatType::User => format!(
                "{}{} {}:\n",
                msg.channel_emoji,
                ChatType::User.emoji(),
                msg.origin.display_name()
            ),
            ChatType::Group => format!(
                "{}{} {member} [{}]:\n",
                msg.channel_emoji,
                ChatType::Group.emoji(),
                msg.origin.display_name()
            ),
            ChatType::System => "System Message: ".to_string(),
        }
    };
    Template { prefix }
}
