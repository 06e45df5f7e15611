use anyhow::{anyhow, bail, Result};

use crate::providers::types::message::{Message, Role};
use crate::providers::types::tool::ToolCall;

/// Append-only message history for one session.
///
/// Starts with exactly one system message. Every tool message answers a call
/// made by the closest assistant message before it, with only tool messages
/// in between.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(system_prompt: &str) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
        }
    }

    pub fn push(&mut self, message: Message) -> Result<()> {
        match message.role {
            Role::System => bail!("conversation already has a system message"),
            Role::Tool => {
                let id = message
                    .tool_call_id
                    .as_deref()
                    .ok_or_else(|| anyhow!("tool message without tool_call_id"))?;
                let caller = self
                    .messages
                    .iter()
                    .rev()
                    .find(|m| m.role != Role::Tool)
                    .filter(|m| m.role == Role::Assistant)
                    .ok_or_else(|| anyhow!("tool message {} does not follow an assistant message", id))?;
                if !caller.tool_calls.iter().any(|call| call.id == id) {
                    bail!("tool message {} answers no pending tool call", id);
                }
            }
            Role::User | Role::Assistant => {}
        }
        self.messages.push(message);
        Ok(())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// Check the history invariants over a whole message list.
pub fn verify(messages: &[Message]) -> Result<()> {
    let (first, rest) = messages
        .split_first()
        .ok_or_else(|| anyhow!("history is empty"))?;
    if first.role != Role::System {
        bail!("history must start with a system message");
    }

    let mut pending: &[ToolCall] = &[];
    for (index, message) in rest.iter().enumerate() {
        match message.role {
            Role::System => bail!("extra system message at {}", index + 1),
            Role::Assistant => pending = &message.tool_calls,
            Role::Tool => {
                let id = message.tool_call_id.as_deref().unwrap_or_default();
                if !pending.iter().any(|call| call.id == id) {
                    bail!("tool message at {} answers unknown call '{}'", index + 1, id);
                }
            }
            Role::User => pending = &[],
        }
    }
    Ok(())
}
