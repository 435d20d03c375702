//! Building and drawing the paginated slave-chat pickers.

use regex::RegexBuilder;
use switchyard_channels::{Button, Keyboard};
use switchyard_core::{ChatKey, ChatType};
use switchyard_sessions::{ChatCandidate, ChatPicker, Flow};
use tracing::debug;

use crate::context::RelayContext;
use crate::error::{RelayError, Result};

pub const LINK_EMOJI: &str = "🔗";

/// Collect candidates from every slave, keeping those whose description
/// matches `filter` (case-insensitive, `.` matches newlines).
pub async fn build_picker(ctx: &RelayContext, filter: Option<&str>) -> Result<ChatPicker> {
    let filter = filter.map(str::trim).filter(|f| !f.is_empty());
    let re = filter
        .map(|f| {
            RegexBuilder::new(f)
                .case_insensitive(true)
                .dot_matches_new_line(true)
                .build()
                .map_err(|_| RelayError::InvalidFilter(f.to_string()))
        })
        .transpose()?;

    let mut legend = vec![
        format!("{LINK_EMOJI}: Linked"),
        format!("{}: User", ChatType::User.emoji()),
        format!("{}: Group", ChatType::Group.emoji()),
    ];
    let mut candidates = Vec::new();

    for slave in ctx.slaves.iter() {
        let info = slave.info();
        legend.push(format!("{}: {}", info.emoji, info.name));
        for chat in slave.list_chats().await? {
            let description = format!(
                "Channel: {}\nName: {}\nAlias: {}\nID: {}\nType: {}",
                info.name, chat.name, chat.alias, chat.uid, chat.chat_type
            );
            if let Some(re) = &re {
                if !re.is_match(&description) {
                    continue;
                }
            }
            let key = ChatKey::new(info.id.clone(), chat.uid.clone());
            let linked = ctx.store.get_master_chat(&key)?.is_some();
            candidates.push(ChatCandidate {
                key,
                channel_name: info.name.clone(),
                channel_emoji: info.emoji.clone(),
                identity: chat.identity(),
                chat_type: chat.chat_type,
                linked,
            });
        }
    }
    debug!(count = candidates.len(), filter = ?filter, "picker built");

    Ok(ChatPicker {
        candidates,
        legend,
        offset: 0,
        filter: filter.map(String::from),
    })
}

fn heading(flow: Flow) -> &'static str {
    match flow {
        Flow::Link => "Please choose the chat you want to link with ...",
        Flow::ChatHead => "Choose a chat you want to start with...",
    }
}

/// Prompt text and keyboard for the picker's current page.
pub fn render_page(flow: Flow, picker: &ChatPicker, per_page: usize) -> (String, Keyboard) {
    let per_page = per_page.max(1);
    let mut text = format!("{}\n\nLegend:\n", heading(flow));
    for line in &picker.legend {
        text.push_str(line);
        text.push('\n');
    }

    let mut rows: Vec<Vec<Button>> = picker
        .page(per_page)
        .map(|(i, c)| {
            let linked = if c.linked { LINK_EMOJI } else { "" };
            let label = format!(
                "{}{}: {} {}",
                c.channel_emoji,
                c.chat_type.emoji(),
                c.display_name(),
                linked
            );
            vec![Button::callback(label.trim_end(), format!("chat {i}"))]
        })
        .collect();

    let mut nav = Vec::new();
    if picker.offset >= per_page {
        nav.push(Button::callback(
            "< Prev",
            format!("offset {}", picker.offset - per_page),
        ));
    }
    nav.push(Button::callback("Cancel", "cancel"));
    if picker.has_next(per_page) {
        nav.push(Button::callback(
            "Next >",
            format!("offset {}", picker.offset + per_page),
        ));
    }
    rows.push(nav);

    (text, Keyboard::new(rows))
}

/// `'{name}' from '{emoji} {channel}'`, as shown in link prompts.
pub fn describe(c: &ChatCandidate) -> String {
    if c.channel_name.is_empty() {
        format!("'{}'", c.display_name())
    } else {
        format!(
            "'{}' from '{} {}'",
            c.display_name(),
            c.channel_emoji,
            c.channel_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_core::Identity;

    fn picker(n: usize, offset: usize) -> ChatPicker {
        ChatPicker {
            candidates: (0..n)
                .map(|i| ChatCandidate {
                    key: ChatKey::new("loopback", format!("c{i}")),
                    channel_name: "Loopback".into(),
                    channel_emoji: "🔁".into(),
                    identity: Identity::new(format!("c{i}"), format!("n{i}"), format!("n{i}")),
                    chat_type: ChatType::User,
                    linked: i == 0,
                })
                .collect(),
            legend: vec!["🔁: Loopback".into()],
            offset,
            filter: None,
        }
    }

    fn nav(kb: &Keyboard) -> Vec<String> {
        kb.rows
            .last()
            .unwrap()
            .iter()
            .map(|b| b.label().to_string())
            .collect()
    }

    #[test]
    fn first_page_has_next_only() {
        let (text, kb) = render_page(Flow::Link, &picker(25, 0), 10);
        assert!(text.starts_with("Please choose the chat you want to link with ..."));
        assert!(text.contains("🔁: Loopback"));
        assert_eq!(kb.rows.len(), 11);
        assert_eq!(nav(&kb), vec!["Cancel", "Next >"]);
        assert_eq!(
            kb.rows[0][0],
            Button::callback("🔁☺: n0 🔗", "chat 0")
        );
        assert_eq!(kb.rows[1][0], Button::callback("🔁☺: n1", "chat 1"));
    }

    #[test]
    fn middle_and_last_pages() {
        let (_, kb) = render_page(Flow::ChatHead, &picker(25, 10), 10);
        assert_eq!(nav(&kb), vec!["< Prev", "Cancel", "Next >"]);
        assert_eq!(
            kb.rows[0][0],
            Button::callback("🔁☺: n10", "chat 10")
        );

        let (_, kb) = render_page(Flow::ChatHead, &picker(25, 20), 10);
        assert_eq!(kb.rows.len(), 6);
        assert_eq!(nav(&kb), vec!["< Prev", "Cancel"]);
        let last = kb.rows.last().unwrap();
        assert_eq!(last[0], Button::callback("< Prev", "offset 10"));
    }

    #[test]
    fn describe_includes_channel() {
        let p = picker(1, 0);
        assert_eq!(describe(&p.candidates[0]), "'n0' from '🔁 Loopback'");
    }
}
