use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use tracing_subscriber::EnvFilter;

use tna::agent::{Agent, StopReason};
use tna::configuration::Settings;
use tna::prompt::text::TextPrompt;
use tna::prompt::voice::VoicePrompt;
use tna::prompt::{Mode, Prompt};
use tna::providers::openai::OpenAiProvider;
use tna::tools::runner::{CommandRunner, SystemRunner};
use tna::tools::ToolRegistry;

#[derive(Parser)]
#[command(author, version, about = "Termux Native Agent", long_about = None)]
struct Cli {
    /// Interaction mode
    #[arg(long, value_enum, default_value_t = Mode::Text)]
    mode: Mode,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("TNA_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\n{} {:#}", style("Error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::new().context("Failed to load configuration")?;

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let provider = OpenAiProvider::new(settings.provider_config())?;
    let vision = OpenAiProvider::new(settings.provider_config())?;
    let registry =
        ToolRegistry::new(runner.clone(), settings.tool_settings()).with_vision(Arc::new(vision));
    let mut agent = Agent::new(Box::new(provider), registry, &settings.agent.system_prompt);

    let mut prompt: Box<dyn Prompt> = match cli.mode {
        Mode::Text => Box::new(TextPrompt::new()),
        Mode::Voice => Box::new(VoicePrompt::new(runner)),
    };

    tracing::info!(mode = %cli.mode, "starting session");
    println!("--- TNA Started in {} mode ---", cli.mode);
    println!(
        "{}",
        style("Type \"exit\" or \"quit\" to end the session").dim()
    );

    match agent.run(prompt.as_mut()).await? {
        StopReason::Interrupted => println!("\nStopping..."),
        StopReason::UserExit | StopReason::InputClosed => {}
    }
    Ok(())
}
