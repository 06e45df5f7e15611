pub mod apps;
pub mod memory;
pub mod phone;
pub mod runner;
pub mod shell;
pub mod vision;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::errors::{DispatchResult, ToolError};
use crate::providers::base::Provider;
use crate::providers::types::tool::ToolSpec;
use memory::MemoryStore;
use runner::CommandRunner;

/// Every action the model may invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ToolName {
    ExecuteShell,
    MakeCall,
    SendSms,
    LaunchApp,
    InspectSurroundings,
    RememberFact,
    RecallFact,
}

impl ToolName {
    pub fn spec(self) -> ToolSpec {
        match self {
            ToolName::ExecuteShell => shell::spec(),
            ToolName::MakeCall => phone::call_spec(),
            ToolName::SendSms => phone::sms_spec(),
            ToolName::LaunchApp => apps::spec(),
            ToolName::InspectSurroundings => vision::spec(),
            ToolName::RememberFact => memory::remember_spec(),
            ToolName::RecallFact => memory::recall_spec(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolSettings {
    pub shell_timeout: Duration,
    pub device_timeout: Duration,
    pub memory_file: PathBuf,
    /// Where camera captures are written before analysis
    pub capture_dir: PathBuf,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            shell_timeout: Duration::from_secs(10),
            device_timeout: Duration::from_secs(30),
            memory_file: PathBuf::from("agent_memory.json"),
            capture_dir: std::env::temp_dir(),
        }
    }
}

/// Fixed set of handlers, addressed by tool name.
pub struct ToolRegistry {
    runner: Arc<dyn CommandRunner>,
    memory: MemoryStore,
    vision: Option<Arc<dyn Provider>>,
    settings: ToolSettings,
    specs: Vec<ToolSpec>,
}

impl ToolRegistry {
    pub fn new(runner: Arc<dyn CommandRunner>, settings: ToolSettings) -> Self {
        Self {
            runner,
            memory: MemoryStore::new(settings.memory_file.clone()),
            vision: None,
            specs: ToolName::iter().map(ToolName::spec).collect(),
            settings,
        }
    }

    /// Backend used by `inspect_surroundings` to describe camera captures.
    pub fn with_vision(mut self, provider: Arc<dyn Provider>) -> Self {
        self.vision = Some(provider);
        self
    }

    /// Tool specs in declaration order.
    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    /// Run the named tool on a raw JSON argument payload.
    ///
    /// Handler faults come back as `Ok` text. Only an unknown name or
    /// arguments that do not fit the tool's shape are errors.
    pub async fn dispatch(&self, name: &str, raw_args: &str) -> DispatchResult<String> {
        let tool: ToolName = name
            .parse()
            .map_err(|_| ToolError::UnknownTool(name.to_string()))?;
        let runner = self.runner.as_ref();

        let output = match tool {
            ToolName::ExecuteShell => {
                let args: shell::ShellArgs = parse_args(raw_args)?;
                shell::execute_shell(runner, &args.command, self.settings.shell_timeout).await
            }
            ToolName::MakeCall => {
                let args: phone::CallArgs = parse_args(raw_args)?;
                phone::make_call(runner, &args.phone_number, self.settings.device_timeout).await
            }
            ToolName::SendSms => {
                let args: phone::SmsArgs = parse_args(raw_args)?;
                phone::send_sms(
                    runner,
                    &args.phone_number,
                    &args.message,
                    self.settings.device_timeout,
                )
                .await
            }
            ToolName::LaunchApp => {
                let args: apps::LaunchArgs = parse_args(raw_args)?;
                apps::launch_app(runner, &args, self.settings.device_timeout).await
            }
            ToolName::InspectSurroundings => {
                let args: vision::InspectArgs = parse_args(raw_args)?;
                vision::inspect_surroundings(
                    runner,
                    self.vision.as_deref(),
                    &self.settings.capture_dir,
                    &args.prompt,
                    self.settings.device_timeout,
                )
                .await
            }
            ToolName::RememberFact => {
                let args: memory::RememberArgs = parse_args(raw_args)?;
                self.memory.remember(&args.key, &args.value).await
            }
            ToolName::RecallFact => {
                let args: memory::RecallArgs = parse_args(raw_args)?;
                self.memory.recall(&args.key).await
            }
        };
        Ok(output)
    }
}

// Some backends send an empty string for tools called without arguments.
fn parse_args<T: DeserializeOwned>(raw_args: &str) -> DispatchResult<T> {
    let raw = if raw_args.trim().is_empty() { "{}" } else { raw_args };
    serde_json::from_str(raw).map_err(|e| ToolError::InvalidParameters(e.to_string()))
}
