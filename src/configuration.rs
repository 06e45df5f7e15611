use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;

use crate::providers::configs::{OpenAiProviderConfig, OPENAI_BASE_URL, OPENAI_MODEL};
use crate::tools::ToolSettings;

pub const ENV_PREFIX: &str = "TNA";
pub const CONFIG_PATH_VAR: &str = "TNA_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant running natively on \
    Android via Termux. You have access to device tools like phone calling, SMS, and the shell.";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting, set {env_var} or add it to the config file")]
    MissingEnvVar { env_var: String },

    #[error(transparent)]
    Other(#[from] config::ConfigError),
}

/// `llm_settings.api_key` becomes `TNA_LLM_SETTINGS__API_KEY`.
pub fn to_env_var(field: &str) -> String {
    format!(
        "{}_{}",
        ENV_PREFIX,
        field.replace('.', "__").to_uppercase()
    )
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    pub api_key: String,
    pub base_url: String,
    pub model_name: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<i32>,
    pub timeout_secs: u64,
    pub retries: u32,
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentSettings {
    pub system_prompt: String,
    pub shell_timeout_secs: u64,
    pub device_timeout_secs: u64,
    pub memory_file: PathBuf,
    #[serde(default = "default_capture_dir")]
    pub capture_dir: PathBuf,
}

fn default_capture_dir() -> PathBuf {
    std::env::temp_dir()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub llm_settings: LlmSettings,
    pub agent: AgentSettings,
}

impl Settings {
    /// Load from the file named by `TNA_CONFIG` (or `config.json`) and the environment.
    pub fn new() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(&path)
    }

    /// Defaults, then the optional JSON file at `path`, then `TNA_*` variables.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("llm_settings.base_url", OPENAI_BASE_URL)?
            .set_default("llm_settings.model_name", OPENAI_MODEL)?
            .set_default("llm_settings.timeout_secs", 600)?
            .set_default("llm_settings.retries", 0)?
            .set_default("llm_settings.retry_delay_ms", 500)?
            .set_default("agent.system_prompt", DEFAULT_SYSTEM_PROMPT)?
            .set_default("agent.shell_timeout_secs", 10)?
            .set_default("agent.device_timeout_secs", 30)?
            .set_default("agent.memory_file", "agent_memory.json")?
            .add_source(File::new(path, FileFormat::Json).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        match config.try_deserialize::<Self>() {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);
                Err(missing_setting(err))
            }
        }
    }

    pub fn provider_config(&self) -> OpenAiProviderConfig {
        let llm = &self.llm_settings;
        OpenAiProviderConfig {
            api_key: llm.api_key.clone(),
            host: llm.base_url.clone(),
            model: llm.model_name.clone(),
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
            timeout_secs: llm.timeout_secs,
            retries: llm.retries,
            retry_delay_ms: llm.retry_delay_ms,
        }
    }

    pub fn tool_settings(&self) -> ToolSettings {
        ToolSettings {
            shell_timeout: Duration::from_secs(self.agent.shell_timeout_secs),
            device_timeout: Duration::from_secs(self.agent.device_timeout_secs),
            memory_file: self.agent.memory_file.clone(),
            capture_dir: self.agent.capture_dir.clone(),
        }
    }
}

// Serde reports "missing field `api_key`" with the parent key in the origin.
fn missing_setting(err: config::ConfigError) -> ConfigError {
    let message = err.to_string();
    if let Some(rest) = message.strip_prefix("missing field `") {
        let field = rest.split('`').next().unwrap_or_default();
        let section = match field {
            "api_key" | "base_url" | "model_name" | "timeout_secs" | "retries"
            | "retry_delay_ms" => "llm_settings.",
            "llm_settings" | "agent" => "",
            _ => "agent.",
        };
        return ConfigError::MissingEnvVar {
            env_var: to_env_var(&format!("{}{}", section, field)),
        };
    }
    match err {
        config::ConfigError::NotFound(field) => ConfigError::MissingEnvVar {
            env_var: to_env_var(&field),
        },
        other => ConfigError::Other(other),
    }
}
