//! Runs the session state machine against the master surface and the store.

use switchyard_channels::{Button, Keyboard};
use switchyard_core::{MessageKind, MessageRef};
use switchyard_sessions::{
    step, ChatCandidate, ChatPicker, Effect, Flow, LinkTarget, PendingLink, Session,
    SessionError,
};
use switchyard_store::{MessageLogEntry, SentTo, StoreError};
use tracing::{debug, info, instrument, warn};

use crate::context::RelayContext;
use crate::error::{RelayError, Result};
use crate::picker::{build_picker, describe, render_page};

/// Send a picker prompt to `chat` and attach its session.
#[instrument(skip(ctx))]
pub async fn start_picker(
    ctx: &RelayContext,
    chat: &str,
    flow: Flow,
    filter: Option<&str>,
) -> Result<MessageRef> {
    let prompt = ctx.master.send_text(chat, "Processing...", None).await?;
    let _guard = ctx.prompt_locks.lock(&prompt).await;

    let picker = match build_picker(ctx, filter).await {
        Ok(p) => p,
        Err(e) => {
            ctx.master.edit_text(&prompt, &e.to_string(), None).await?;
            return Err(e);
        }
    };
    show_page(ctx, &prompt, flow, &picker).await?;
    let session = match flow {
        Flow::Link => Session::LinkConfirm(picker),
        Flow::ChatHead => Session::ChatPicker(picker),
    };
    ctx.sessions.put(prompt.clone(), session);
    Ok(prompt)
}

async fn show_page(
    ctx: &RelayContext,
    prompt: &MessageRef,
    flow: Flow,
    picker: &ChatPicker,
) -> Result<()> {
    let (text, keyboard) = render_page(flow, picker, ctx.config.chats_per_page);
    ctx.master.edit_text(prompt, &text, Some(keyboard)).await?;
    Ok(())
}

/// Handle a button press on `prompt`.
///
/// Rejected input is reported on the prompt, clears the session and is
/// returned as an error. An expired prompt is reported without touching the
/// store.
#[instrument(skip(ctx, prompt), fields(prompt = %prompt))]
pub async fn handle_interaction(ctx: &RelayContext, prompt: &MessageRef, data: &str) -> Result<()> {
    let _guard = ctx.prompt_locks.lock(prompt).await;

    let step = match step(ctx.sessions.get(prompt), data) {
        Ok(s) => s,
        Err(e) => {
            debug!(code = ?e.code(), "no session for prompt");
            ctx.master.edit_text(prompt, &e.to_string(), None).await?;
            return Err(e.into());
        }
    };
    match step.next {
        Some(next) => ctx.sessions.put(prompt.clone(), next),
        None => {
            ctx.sessions.clear(prompt);
        }
    }

    match step.effect {
        Effect::ShowPage { flow, picker } => show_page(ctx, prompt, flow, &picker).await,
        Effect::ShowLinkExec(target) => show_link_exec(ctx, prompt, &target).await,
        Effect::Unlink(chat) => {
            ctx.store.remove_association(&chat.key)?;
            info!(slave = %chat.key, "chat unlinked");
            let text = format!("Chat {} is unlinked.", describe(&chat));
            ctx.master.edit_text(prompt, &text, None).await?;
            Ok(())
        }
        Effect::StartChat(chat) => start_chat(ctx, prompt, &chat).await,
        Effect::InvokeCommand {
            channel,
            callable,
            args,
            text,
        } => {
            let outcome = match ctx.slaves.get(&channel) {
                Some(slave) => slave.call_extra(&callable, &args).await.map_err(RelayError::from),
                None => Err(RelayError::ChannelNotFound(channel.clone())),
            };
            let (result, outcome) = match outcome {
                Ok(result) => (result, Ok(())),
                Err(e) => {
                    warn!(channel = %channel, callable = %callable, code = e.code(), error = %e, "command failed");
                    (e.operator_text(), Err(e))
                }
            };
            ctx.master
                .edit_text(prompt, &format!("{text}\n------\n{result}"), None)
                .await?;
            outcome
        }
        Effect::Cancelled => {
            ctx.master.edit_text(prompt, "Cancelled.", None).await?;
            Ok(())
        }
        Effect::Rejected(e) => {
            warn!(code = ?e.code(), data, "interaction rejected");
            ctx.master.edit_text(prompt, &e.to_string(), None).await?;
            Err(e.into())
        }
    }
}

async fn show_link_exec(ctx: &RelayContext, prompt: &MessageRef, target: &LinkTarget) -> Result<()> {
    let chat = target
        .chat()
        .ok_or_else(|| SessionError::InvalidLinkParameter(target.selected.to_string()))?;
    let linked = ctx.store.get_master_chat(&chat.key)?.is_some();

    let mut text = format!("You've selected chat {}.", describe(chat));
    if linked {
        text.push_str(&format!(
            "\nThis chat has already linked to {}.",
            ctx.master.info().name
        ));
    }
    text.push_str("\nWhat would you like to do?");

    let token = ctx.sessions.issue_link(PendingLink {
        candidate: chat.clone(),
        prompt: prompt.clone(),
        relink: linked,
    });
    let url = ctx.master.group_invite_link(&token);
    let mut row = if linked {
        vec![
            Button::url("Relink", url),
            Button::callback("Unlink", format!("unlink {}", target.selected)),
        ]
    } else {
        vec![Button::url("Link", url)]
    };
    row.push(Button::callback("Cancel", "cancel"));

    ctx.master
        .edit_text(prompt, &text, Some(Keyboard::new(vec![row])))
        .await?;
    Ok(())
}

/// Turn the prompt into a chat head: replies to it go to `chat`.
///
/// The log row is a `System` entry so later text from `chat` never merges
/// into the prompt.
async fn start_chat(ctx: &RelayContext, prompt: &MessageRef, chat: &ChatCandidate) -> Result<()> {
    let display = describe(chat);
    let text = format!("Reply to this message to chat with {display}.");
    ctx.store.append_message_log(&MessageLogEntry {
        master_chat: ctx.master_key(&prompt.chat),
        master_msg_id: prompt.message_id.clone(),
        text: text.clone(),
        msg_type: MessageKind::System,
        sent_to: SentTo::Master,
        slave_origin: chat.key.clone(),
        slave_origin_display_name: display,
        slave_member_uid: None,
        slave_member_display_name: None,
        created_at: ctx.clock.now(),
        update: false,
    })?;
    ctx.master.edit_text(prompt, &text, None).await?;
    Ok(())
}

/// `/start {token}` arrived in master group `group`: link it to the chat the
/// token was issued for.
#[instrument(skip(ctx, token))]
pub async fn complete_group_link(ctx: &RelayContext, group: &str, token: &str) -> Result<()> {
    let Some(link) = ctx.sessions.take_link(token) else {
        let err = RelayError::LinkExpired;
        ctx.master.send_text(group, &err.to_string(), None).await?;
        return Err(err);
    };
    let chat = link.candidate;
    let name = chat.display_name();
    if link.relink {
        ctx.store.remove_association(&chat.key)?;
    }

    match ctx.store.add_association(&ctx.master_key(group), &chat.key) {
        Ok(()) => {}
        Err(StoreError::Conflict { existing, .. }) => {
            debug!(existing = %existing, "slave already linked elsewhere");
            let err = RelayError::AlreadyLinked(name);
            ctx.master.send_text(group, &err.to_string(), None).await?;
            return Err(err);
        }
        Err(e) => return Err(e.into()),
    }
    info!(slave = %chat.key, "chat linked");

    let text = format!("Chat '{name}' is now linked.");
    ctx.master.send_text(group, &text, None).await?;

    let _guard = ctx.prompt_locks.lock(&link.prompt).await;
    ctx.sessions.put(
        link.prompt.clone(),
        Session::LinkExec(LinkTarget {
            candidates: vec![chat],
            selected: 0,
        }),
    );
    let keyboard = Keyboard::new(vec![vec![Button::callback("Unlink", "unlink 0")]]);
    ctx.master
        .edit_text(&link.prompt, &text, Some(keyboard))
        .await?;
    Ok(())
}
