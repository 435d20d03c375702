//! Operator commands typed on the master surface.

use std::sync::OnceLock;

use regex::Regex;
use switchyard_core::MessageRef;
use switchyard_sessions::Flow;
use tracing::{debug, warn};

use crate::context::RelayContext;
use crate::error::{RelayError, Result};
use crate::interact::{complete_group_link, start_picker};
use crate::speech::{recognize_speech, RecogTarget};

pub const WELCOME: &str = "Welcome to Switchyard.\n\n\
    Messages from your other chat platforms show up here. \
    Use /link to bind a remote chat to a group, /chat to start a conversation \
    and /extra to see what each platform offers.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MasterCommand {
    Link(Option<String>),
    Chat(Option<String>),
    Extra,
    Call {
        index: usize,
        name: String,
        args: String,
    },
    Recog(Option<String>),
    Start(Option<String>),
}

fn call_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^/(?P<id>[0-9]+)_(?P<command>[a-z0-9_-]+)(?:@\S+)?(?:\s+(?P<args>[\s\S]*))?$")
            .unwrap_or_else(|e| unreachable!("static pattern: {e}"))
    })
}

impl MasterCommand {
    /// Parse a master message. `None` when it is not a command we handle.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if !text.starts_with('/') {
            return None;
        }
        if let Some(caps) = call_pattern().captures(text) {
            let index = caps["id"].parse().ok()?;
            return Some(MasterCommand::Call {
                index,
                name: caps["command"].to_string(),
                args: caps
                    .name("args")
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default(),
            });
        }

        let (head, rest) = match text.split_once(char::is_whitespace) {
            Some((h, r)) => (h, Some(r.trim())),
            None => (text, None),
        };
        let rest = rest.filter(|r| !r.is_empty()).map(String::from);
        // `/cmd@botname` is how clients address a bot in groups.
        let name = head.trim_start_matches('/').split('@').next().unwrap_or_default();
        match name {
            "link" => Some(MasterCommand::Link(rest)),
            "chat" | "list" => Some(MasterCommand::Chat(rest)),
            "extra" => Some(MasterCommand::Extra),
            "recog" => Some(MasterCommand::Recog(rest)),
            "start" => Some(MasterCommand::Start(rest)),
            _ => None,
        }
    }
}

/// Where a command was typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOrigin {
    /// The command message itself.
    pub message: MessageRef,
    /// Private chat with the sender.
    pub sender_chat: String,
    pub is_private: bool,
    /// For `/recog`: what the command replied to.
    pub recog_target: Option<RecogTarget>,
}

/// Run `cmd`. Operator-facing failures are also replied to the command.
pub async fn handle_command(
    ctx: &RelayContext,
    cmd: MasterCommand,
    origin: &CommandOrigin,
) -> Result<()> {
    debug!(command = ?cmd, chat = %origin.message.chat, "master command");
    let chat = origin.message.chat.as_str();
    let result = match cmd {
        MasterCommand::Link(filter) => start_picker(ctx, chat, Flow::Link, filter.as_deref())
            .await
            .map(|_| ()),
        MasterCommand::Chat(filter) => {
            start_picker(ctx, &origin.sender_chat, Flow::ChatHead, filter.as_deref())
                .await
                .map(|_| ())
        }
        MasterCommand::Extra => {
            ctx.master.send_text(chat, &extra_help(ctx), None).await?;
            Ok(())
        }
        MasterCommand::Call { index, name, args } => {
            call_extra(ctx, chat, index, &name, &args).await
        }
        MasterCommand::Recog(lang) => {
            recognize_speech(ctx, origin.recog_target.clone(), lang.as_deref())
                .await
                .map(|_| ())
        }
        MasterCommand::Start(Some(token)) if !origin.is_private => {
            // complete_group_link reports its own failures in the group.
            return complete_group_link(ctx, chat, &token).await;
        }
        MasterCommand::Start(_) => {
            ctx.master.send_text(&origin.sender_chat, WELCOME, None).await?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        if is_operator_error(e) {
            warn!(code = e.code(), "command failed");
            ctx.master.reply_text(&origin.message, &e.to_string()).await?;
        }
    }
    result
}

/// Errors whose text is meant for the operator rather than the log.
fn is_operator_error(e: &RelayError) -> bool {
    matches!(
        e,
        RelayError::InvalidSlaveIndex(_)
            | RelayError::FunctionNotFound(_)
            | RelayError::RecogNoReply
            | RelayError::RecogNotVoice
            | RelayError::RecogLanguage(_)
            | RelayError::RecogTooLong(_)
    )
}

/// `/extra`: every slave with its callable functions.
pub fn extra_help(ctx: &RelayContext) -> String {
    let mut msg = String::from("List of slave channel features:");
    for (n, slave) in ctx.slaves.iter().enumerate() {
        let info = slave.info();
        msg.push_str(&format!("\n\n{} {}", info.emoji, info.name));
        let functions = slave.extra_functions();
        if functions.is_empty() {
            msg.push_str("\nNo command found.");
            continue;
        }
        for f in functions {
            let command = format!("/{n}_{}", f.name);
            let description = f.description.replace("{function_name}", &command);
            msg.push_str(&format!(
                "\n\n{command} ({})\n{description}",
                f.display_name
            ));
        }
    }
    msg
}

/// `/{n}_{name} [args]`: run a slave function, showing a placeholder while
/// it works.
pub async fn call_extra(
    ctx: &RelayContext,
    chat: &str,
    index: usize,
    name: &str,
    args: &str,
) -> Result<()> {
    let slave = ctx
        .slaves
        .nth(index)
        .ok_or(RelayError::InvalidSlaveIndex(index))?;
    let function = slave
        .extra_functions()
        .into_iter()
        .find(|f| f.name == name)
        .ok_or_else(|| RelayError::FunctionNotFound(name.to_string()))?;

    let info = slave.info();
    let header = format!(
        "{} {}: {}\n-------\n",
        info.emoji, info.name, function.display_name
    );
    let placeholder = ctx
        .master
        .send_text(chat, &format!("{header}Please wait..."), None)
        .await?;
    let result = match slave.call_extra(name, args).await {
        Ok(r) => r,
        Err(e) => {
            warn!(channel = %info.id, function = name, error = %e, "extra function failed");
            RelayError::from(e).operator_text()
        }
    };
    ctx.master
        .edit_text(&placeholder, &format!("{header}{result}"), None)
        .await?;
    Ok(())
}
