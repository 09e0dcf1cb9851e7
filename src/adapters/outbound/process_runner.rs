use crate::common::CommandError;
use crate::domains::platform::{CommandRunner, ProcessOutput};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Runs executables with `tokio::process`. The child is killed if the call
/// times out or the calling task is aborted.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProcessRunner;

#[async_trait]
impl CommandRunner for TokioProcessRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<ProcessOutput, CommandError> {
        let mut command = Command::new(program);
        command.args(args).stdin(Stdio::null()).kill_on_drop(true);

        let output = match tokio::time::timeout(timeout, command.output()).await {
            Err(_) => {
                return Err(CommandError::TimedOut {
                    seconds: timeout.as_secs(),
                })
            }
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => {
                return Err(CommandError::NotFound {
                    program: program.to_string(),
                })
            }
            Ok(Err(e)) => {
                return Err(CommandError::Io {
                    program: program.to_string(),
                    message: e.to_string(),
                })
            }
            Ok(Ok(output)) => output,
        };

        Ok(ProcessOutput {
            // Killed by a signal: no code, report like a failed launch.
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
