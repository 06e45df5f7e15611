use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use super::tool::ToolCall;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Inline image data, base64 encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageContent {
    pub data: String,
    pub mime_type: String,
}

impl ImageContent {
    pub fn new<S: Into<String>, T: Into<String>>(data: S, mime_type: T) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// One entry of a conversation, shaped after the chat-completions message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageContent>,
}

impl Message {
    fn new(
        role: Role,
        content: Option<String>,
        tool_calls: Vec<ToolCall>,
        tool_call_id: Option<String>,
        name: Option<String>,
    ) -> Result<Self> {
        let msg = Self {
            role,
            content,
            tool_calls,
            tool_call_id,
            name,
            images: Vec::new(),
        };
        msg.validate()?;
        Ok(msg)
    }

    fn validate(&self) -> Result<()> {
        match self.role {
            Role::System | Role::User => {
                if self.content.is_none() {
                    return Err(anyhow!("{:?} message must include content", self.role));
                }
                if self.has_tool_calls() || self.tool_call_id.is_some() {
                    return Err(anyhow!("{:?} message does not support tool fields", self.role));
                }
            }
            Role::Assistant => {
                if self.content.is_none() && !self.has_tool_calls() {
                    return Err(anyhow!("Assistant message must include content or tool calls"));
                }
                if self.tool_call_id.is_some() {
                    return Err(anyhow!("Assistant message does not support tool_call_id"));
                }
            }
            Role::Tool => {
                if self.tool_call_id.is_none() || self.name.is_none() {
                    return Err(anyhow!("Tool message must include tool_call_id and name"));
                }
                if self.content.is_none() {
                    return Err(anyhow!("Tool message must include content"));
                }
                if self.has_tool_calls() {
                    return Err(anyhow!("Tool message does not support tool calls"));
                }
            }
        }
        Ok(())
    }

    pub fn system(text: &str) -> Self {
        Self::plain(Role::System, text)
    }

    pub fn user(text: &str) -> Self {
        Self::plain(Role::User, text)
    }

    pub fn assistant(text: &str) -> Self {
        Self::plain(Role::Assistant, text)
    }

    fn plain(role: Role, text: &str) -> Self {
        Self {
            role,
            content: Some(text.to_string()),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
            images: Vec::new(),
        }
    }

    /// User text sent together with an image.
    pub fn user_with_image(text: &str, image: ImageContent) -> Self {
        Self {
            images: vec![image],
            ..Self::plain(Role::User, text)
        }
    }

    /// Assistant message as returned by the backend, possibly requesting tools.
    pub fn assistant_with_tool_calls(
        content: Option<String>,
        tool_calls: Vec<ToolCall>,
    ) -> Result<Self> {
        Self::new(Role::Assistant, content, tool_calls, None, None)
    }

    /// Result of one tool call, linked back to the call by id.
    pub fn tool(tool_call_id: &str, name: &str, output: &str) -> Self {
        Self {
            role: Role::Tool,
            content: Some(output.to_string()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.to_string()),
            name: Some(name.to_string()),
            images: Vec::new(),
        }
    }

    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}
