use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use super::Prompt;
use crate::tools::runner::CommandRunner;

const LISTEN_TIMEOUT: Duration = Duration::from_secs(120);
const SPEAK_TIMEOUT: Duration = Duration::from_secs(120);
const RETRY_PAUSE: Duration = Duration::from_secs(1);

/// Hands-free channel over the Termux speech APIs.
pub struct VoicePrompt {
    runner: Arc<dyn CommandRunner>,
    /// Wait after a recognizer fault so a missing binary does not spin the loop
    retry_pause: Duration,
}

impl VoicePrompt {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            retry_pause: RETRY_PAUSE,
        }
    }

    pub fn with_retry_pause(mut self, retry_pause: Duration) -> Self {
        self.retry_pause = retry_pause;
        self
    }
}

#[async_trait]
impl Prompt for VoicePrompt {
    /// Speech recognition faults print a message and yield an empty utterance.
    async fn get_input(&mut self) -> Result<String> {
        println!("Listening...");
        match self
            .runner
            .run("termux-speech-to-text", &[], LISTEN_TIMEOUT)
            .await
        {
            Ok(output) => {
                let text = output.stdout.trim().to_string();
                println!("You (Voice): {}", text);
                Ok(text)
            }
            Err(e) => {
                println!("Error: termux-speech-to-text unavailable ({})", e);
                tokio::time::sleep(self.retry_pause).await;
                Ok(String::new())
            }
        }
    }

    async fn render(&mut self, text: &str) {
        println!("Agent (Voice): {}", text);
        let args = [text.to_string()];
        if let Err(e) = self.runner.run("termux-tts-speak", &args, SPEAK_TIMEOUT).await {
            tracing::warn!(error = %e, "text to speech failed");
        }
    }

    fn show_busy(&mut self) {}

    fn hide_busy(&mut self) {}

    async fn ready(&mut self) {
        self.render("System online. I am listening.").await;
    }
}
