use core::time::Duration;
use std::io;
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::payload::UpdateAuthRequest;

pub const DEFAULT_CLIENT: &str = "proton";
pub const DEFAULT_CONTRACT: &str = "eosio";
pub const UPDATEAUTH_ACTION: &str = "updateauth";

/// A fully resolved client invocation: program plus argument vector.
///
/// Arguments are handed to the OS as-is, never through a shell, so account
/// names and keys cannot inject anything into the command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    /// `<client> [client args..] action <contract> updateauth <json> <account>@<auth>`
    pub fn updateauth(
        client: &str,
        client_args: &[String],
        contract: &str,
        request: &UpdateAuthRequest,
    ) -> Result<Self, InvocationError> {
        let payload = serde_json::to_string(&request.payload())?;

        let mut args = client_args.to_vec();
        args.extend([
            "action".to_owned(),
            contract.to_owned(),
            UPDATEAUTH_ACTION.to_owned(),
            payload,
            request.authorization(),
        ]);

        Ok(Self {
            program: client.to_owned(),
            args,
        })
    }

    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("failed to serialize the updateauth payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Command failed: {command} ({status})")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("`{program}` did not finish within {}s", .limit.as_secs())]
    Timeout { program: String, limit: Duration },
}

impl InvocationError {
    /// Captured client stderr, when the client got far enough to write any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Failed { stderr, .. } => {
                let stderr = stderr.trim_end();
                (!stderr.is_empty()).then_some(stderr)
            }
            Self::Payload(_) | Self::Spawn { .. } | Self::Timeout { .. } => None,
        }
    }
}

/// Runs the external client. The only side-effecting step of a rotation.
#[async_trait]
pub trait Invoker: Send + Sync {
    async fn invoke(&self, invocation: &Invocation) -> Result<CapturedOutput, InvocationError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessInvoker {
    timeout: Option<Duration>,
}

impl ProcessInvoker {
    pub const fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Invoker for ProcessInvoker {
    async fn invoke(&self, invocation: &Invocation) -> Result<CapturedOutput, InvocationError> {
        info!(program = %invocation.program, "Invoking external client");
        debug!("Running command: {}", invocation.command_line());

        let mut command = Command::new(&invocation.program);
        let _ = command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(limit) => timeout(limit, command.output())
                .await
                .map_err(|_| InvocationError::Timeout {
                    program: invocation.program.clone(),
                    limit,
                })?,
            None => command.output().await,
        }
        .map_err(|source| InvocationError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

        let captured = CapturedOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !output.status.success() {
            return Err(InvocationError::Failed {
                command: invocation.command_line(),
                status: output.status.to_string(),
                stderr: captured.stderr,
            });
        }

        debug!(
            stdout_len = captured.stdout.len(),
            stderr_len = captured.stderr.len(),
            "External client finished"
        );

        Ok(captured)
    }
}
