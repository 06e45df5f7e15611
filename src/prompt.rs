use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

pub mod text;
pub mod voice;

/// Where user utterances come from and where replies go.
#[async_trait]
pub trait Prompt: Send {
    /// Next raw utterance. An error means the input source is gone, or
    /// [`Interrupted`] when the user cancelled the input itself.
    async fn get_input(&mut self) -> Result<String>;
    async fn render(&mut self, text: &str);
    fn show_busy(&mut self);
    fn hide_busy(&mut self);
    async fn ready(&mut self) {}
    fn close(&self) {}
}

/// The user pressed Ctrl-C while the input widget held the terminal.
#[derive(Debug, Error)]
#[error("input interrupted")]
pub struct Interrupted;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    pub input_type: InputType,
    pub content: Option<String>, // Only set for messages
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    AskAgain, // Nothing was said, ask again
    Message,  // User sent a message
    Exit,     // User wants to exit the session
}

impl Input {
    pub fn classify(raw: &str) -> Self {
        let text = raw.trim();
        let input_type = if text.is_empty() {
            InputType::AskAgain
        } else if text.eq_ignore_ascii_case("exit") || text.eq_ignore_ascii_case("quit") {
            InputType::Exit
        } else {
            InputType::Message
        };

        Self {
            content: (input_type == InputType::Message).then(|| text.to_string()),
            input_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, strum_macros::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Mode {
    Text,
    Voice,
}
