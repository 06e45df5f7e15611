use std::io::{self, Write};

use anyhow::Result;
use async_trait::async_trait;
use bat::WrappingMode;
use console::style;

use super::{Interrupted, Prompt};

/// Console chat: a cliclack input line in, Markdown rendered with bat out.
#[derive(Default)]
pub struct TextPrompt {
    spinner: Option<cliclack::ProgressBar>,
}

impl TextPrompt {
    pub fn new() -> Self {
        Self::default()
    }
}

fn print_markdown(content: &str) {
    let printed = bat::PrettyPrinter::new()
        .input(bat::Input::from_bytes(content.as_bytes()))
        .theme("zenburn")
        .language("Markdown")
        .wrapping_mode(WrappingMode::Character)
        .print();

    if let Err(e) = printed {
        tracing::debug!(error = %e, "markdown rendering failed, printing plain text");
        println!("{}", content);
    }
}

// In raw mode cliclack reports Ctrl-C as an interrupted read.
fn input_error(err: io::Error) -> anyhow::Error {
    match err.kind() {
        io::ErrorKind::Interrupted => Interrupted.into(),
        _ => err.into(),
    }
}

#[async_trait]
impl Prompt for TextPrompt {
    async fn get_input(&mut self) -> Result<String> {
        tokio::task::spawn_blocking(|| {
            cliclack::input("You").placeholder("").interact::<String>()
        })
        .await?
        .map_err(input_error)
    }

    async fn render(&mut self, text: &str) {
        println!("{}", style("Agent:").cyan().bold());
        print_markdown(text);
        println!();
        let _ = io::stdout().flush();
    }

    fn show_busy(&mut self) {
        let spinner = cliclack::spinner();
        spinner.start("awaiting reply");
        self.spinner = Some(spinner);
    }

    fn hide_busy(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop("");
        }
    }

    fn close(&self) {
        if let Some(spinner) = &self.spinner {
            spinner.stop("");
        }
        let _ = cliclack::outro("Goodbye");
    }
}
