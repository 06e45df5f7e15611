use std::time::Duration;

use serde::Deserialize;

use super::runner::CommandRunner;
use crate::providers::types::tool::{ParamSpec, ToolSpec};

#[derive(Debug, Deserialize)]
pub struct ShellArgs {
    pub command: String,
}

pub fn spec() -> ToolSpec {
    ToolSpec::new(
        "execute_shell",
        "Execute a shell command on the Termux system. Use this to manage files, \
        check system status, or fetch data.",
        vec![ParamSpec::required("command", "The shell command to execute")],
    )
}

/// Run `command` through `sh -c`, reporting both output streams.
pub async fn execute_shell(runner: &dyn CommandRunner, command: &str, timeout: Duration) -> String {
    tracing::info!(command, "executing shell");
    let args = ["-c".to_string(), command.to_string()];

    match runner.run("sh", &args, timeout).await {
        Ok(output) => {
            let mut result = format!("STDOUT: {}\nSTDERR: {}", output.stdout, output.stderr);
            if let Some(code) = output.code.filter(|code| *code != 0) {
                result.push_str(&format!("\nEXIT CODE: {}", code));
            }
            result
        }
        Err(e) => format!("Error: {}", e),
    }
}
