use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::errors::{DispatchResult, ToolError};

/// Captured result of one finished OS command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Why the command failed, or `None` if it exited cleanly.
    pub fn failure_reason(&self) -> Option<String> {
        if self.success() {
            return None;
        }
        let stderr = self.stderr.trim();
        Some(match (stderr.is_empty(), self.code) {
            (false, _) => stderr.to_string(),
            (true, Some(code)) => format!("exit status {}", code),
            (true, None) => "terminated by signal".to_string(),
        })
    }
}

/// Runs an OS command to completion within a time bound.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> DispatchResult<CommandOutput>;
}

/// Spawns real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> DispatchResult<CommandOutput> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(timeout, command.output())
            .await
            .map_err(|_| {
                ToolError::ExecutionError(format!(
                    "'{}' timed out after {} seconds",
                    program,
                    timeout.as_secs_f32()
                ))
            })?
            .map_err(|e| ToolError::ExecutionError(format!("failed to run '{}': {}", program, e)))?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// One command as seen by a [`RecordingRunner`].
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

/// Records commands instead of running them and answers with a canned result.
#[derive(Clone)]
pub struct RecordingRunner {
    invocations: Arc<Mutex<Vec<Invocation>>>,
    result: DispatchResult<CommandOutput>,
}

impl RecordingRunner {
    pub fn succeeding() -> Self {
        Self::answering(Ok(CommandOutput {
            code: Some(0),
            ..CommandOutput::default()
        }))
    }

    pub fn answering(result: DispatchResult<CommandOutput>) -> Self {
        Self {
            invocations: Arc::default(),
            result,
        }
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> DispatchResult<CommandOutput> {
        self.invocations.lock().unwrap().push(Invocation {
            program: program.to_string(),
            args: args.to_vec(),
            timeout,
        });
        self.result.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_system_runner_captures_streams() {
        let output = SystemRunner
            .run(
                "sh",
                &["-c".to_string(), "echo out; echo err >&2".to_string()],
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        assert!(output.success());
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
    }

    #[tokio::test]
    async fn test_system_runner_times_out() {
        let err = SystemRunner
            .run("sleep", &["5".to_string()], Duration::from_millis(100))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_system_runner_missing_binary() {
        let err = SystemRunner
            .run("definitely-not-a-real-binary-tna", &[], Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::ExecutionError(_)));
        assert!(err.to_string().contains("failed to run"));
    }

    #[test]
    fn test_failure_reason() {
        let ok = CommandOutput {
            code: Some(0),
            ..Default::default()
        };
        assert_eq!(ok.failure_reason(), None);

        let with_stderr = CommandOutput {
            code: Some(1),
            stderr: "no permission\n".to_string(),
            ..Default::default()
        };
        assert_eq!(with_stderr.failure_reason().as_deref(), Some("no permission"));

        let bare = CommandOutput {
            code: Some(2),
            ..Default::default()
        };
        assert_eq!(bare.failure_reason().as_deref(), Some("exit status 2"));
    }

    #[tokio::test]
    async fn test_recording_runner_records() {
        let runner = RecordingRunner::succeeding();
        let output = runner
            .run("termux-telephony-call", &["123".to_string()], Duration::from_secs(1))
            .await
            .unwrap();

        assert!(output.success());
        let invocations = runner.invocations();
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].program, "termux-telephony-call");
        assert_eq!(invocations[0].args, vec!["123".to_string()]);
    }
}
