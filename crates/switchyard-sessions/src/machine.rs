//! Transition function for interactive prompts.
//!
//! [`step`] only decides. Sending, editing and store writes are performed by
//! the caller from the returned [`Effect`], under the prompt's lock.

use crate::error::SessionError;
use crate::types::{ChatCandidate, ChatPicker, Flow, LinkTarget, Session};

/// A button payload, parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    Offset(usize),
    Cancel,
    Chat(usize),
    Unlink(usize),
    Index(usize),
    Other(String),
}

impl Interaction {
    pub fn parse(data: &str) -> Self {
        let data = data.trim();
        if data == "cancel" {
            return Interaction::Cancel;
        }
        if let Ok(i) = data.parse::<usize>() {
            return Interaction::Index(i);
        }
        let Some((verb, arg)) = data.split_once(' ') else {
            return Interaction::Other(data.to_string());
        };
        let Ok(n) = arg.trim().parse::<usize>() else {
            return Interaction::Other(data.to_string());
        };
        match verb {
            "offset" => Interaction::Offset(n),
            "chat" => Interaction::Chat(n),
            "unlink" => Interaction::Unlink(n),
            _ => Interaction::Other(data.to_string()),
        }
    }
}

/// What the caller has to do after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Redraw the picker at its (new) offset.
    ShowPage { flow: Flow, picker: ChatPicker },
    /// Replace the link picker with the link/unlink prompt for one chat.
    ShowLinkExec(LinkTarget),
    /// Remove the chat's association and report it.
    Unlink(ChatCandidate),
    /// Make the prompt a chat head routing replies to this chat.
    StartChat(ChatCandidate),
    /// Run a slave extra function and append its result to the prompt.
    InvokeCommand {
        channel: String,
        callable: String,
        args: String,
        text: String,
    },
    Cancelled,
    Rejected(SessionError),
}

/// Outcome of one transition. `next == None` clears the session.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub next: Option<Session>,
    pub effect: Effect,
}

impl Step {
    fn clear(effect: Effect) -> Self {
        Self { next: None, effect }
    }

    fn reject(err: SessionError) -> Self {
        Self::clear(Effect::Rejected(err))
    }
}

/// Decide the transition for `data` arriving on a prompt whose session is
/// `session`.
///
/// A missing session yields `Err(Expired)`; the caller must leave the store
/// untouched in that case.
pub fn step(session: Option<Session>, data: &str) -> Result<Step, SessionError> {
    let session = session.ok_or(SessionError::Expired)?;
    let input = Interaction::parse(data);

    let step = match session {
        Session::LinkConfirm(picker) => link_confirm(picker, input, data),
        Session::LinkExec(target) => link_exec(target, input, data),
        Session::ChatPicker(picker) => chat_picker(picker, input, data),
        Session::CommandPending(pending) => match input {
            Interaction::Index(i) => match pending.commands.get(i) {
                Some(cmd) => Step::clear(Effect::InvokeCommand {
                    channel: pending.channel.clone(),
                    callable: cmd.callable.clone(),
                    args: cmd.args.clone(),
                    text: pending.text.clone(),
                }),
                None => Step::reject(SessionError::IndexOutOfBound(data.to_string())),
            },
            _ => Step::reject(SessionError::InvalidIndex(data.to_string())),
        },
    };
    Ok(step)
}

/// An offset must land on a candidate; an empty listing only has offset 0.
fn offset_in_range(picker: &ChatPicker, offset: usize) -> bool {
    offset == 0 || offset < picker.total()
}

fn paginate(flow: Flow, mut picker: ChatPicker, offset: usize) -> Step {
    picker.offset = offset;
    let next = match flow {
        Flow::Link => Session::LinkConfirm(picker.clone()),
        Flow::ChatHead => Session::ChatPicker(picker.clone()),
    };
    Step {
        next: Some(next),
        effect: Effect::ShowPage { flow, picker },
    }
}

fn link_confirm(picker: ChatPicker, input: Interaction, data: &str) -> Step {
    match input {
        Interaction::Offset(n) if offset_in_range(&picker, n) => paginate(Flow::Link, picker, n),
        Interaction::Cancel => Step::clear(Effect::Cancelled),
        Interaction::Chat(i) if i < picker.total() => {
            let target = LinkTarget {
                candidates: picker.candidates,
                selected: i,
            };
            Step {
                next: Some(Session::LinkExec(target.clone())),
                effect: Effect::ShowLinkExec(target),
            }
        }
        _ => Step::reject(SessionError::InvalidLinkParameter(data.to_string())),
    }
}

fn link_exec(target: LinkTarget, input: Interaction, data: &str) -> Step {
    match input {
        Interaction::Cancel => Step::clear(Effect::Cancelled),
        Interaction::Unlink(i) if i < target.candidates.len() => {
            Step::clear(Effect::Unlink(target.candidates[i].clone()))
        }
        _ => {
            let command = data.split_whitespace().next().unwrap_or_default();
            Step::reject(SessionError::UnrecognisedCommand {
                command: command.to_string(),
                data: data.to_string(),
            })
        }
    }
}

fn chat_picker(picker: ChatPicker, input: Interaction, data: &str) -> Step {
    match input {
        Interaction::Offset(n) if offset_in_range(&picker, n) => {
            paginate(Flow::ChatHead, picker, n)
        }
        Interaction::Cancel => Step::clear(Effect::Cancelled),
        Interaction::Chat(i) if i < picker.total() => {
            Step::clear(Effect::StartChat(picker.candidates[i].clone()))
        }
        _ => Step::reject(SessionError::InvalidChatParameter(data.to_string())),
    }
}
