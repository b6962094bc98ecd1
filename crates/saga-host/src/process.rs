//! Actions carried out by running a local program.
//!
//! The program receives the serialized [`ActionRequest`] on stdin and reports
//! its result on stdout. Exit status zero is success; anything else is a
//! failure described by stderr.

use std::process::Stdio;

use async_trait::async_trait;
use indexmap::IndexMap;
use saga_engine::{Action, ActionError, ActionRequest, Outcome};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Environment variable holding the run ID.
pub const RUN_ID_VAR: &str = "SAGA_RUN_ID";
/// Environment variable holding the step name.
pub const STEP_VAR: &str = "SAGA_STEP";
/// Environment variable holding the configured store location, when set.
pub const STORE_LOCATION_VAR: &str = "SAGA_STORE_LOCATION";

/// Error code for a program that could not be started.
pub const SPAWN_CODE: &str = "spawn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessAction {
    program: String,
    args: Vec<String>,
    env: IndexMap<String, String>,
}

impl ProcessAction {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    #[must_use]
    pub fn env(&self) -> &IndexMap<String, String> {
        &self.env
    }

    fn command(&self, request: &ActionRequest) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(&self.env)
            .env(RUN_ID_VAR, request.run_id.to_string())
            .env(STEP_VAR, &request.step)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(location) = &request.store_location {
            command.env(STORE_LOCATION_VAR, location);
        }
        command
    }

    async fn run(&self, request: &ActionRequest) -> Result<Value, ActionError> {
        let payload = serde_json::to_vec(request).map_err(|e| {
            ActionError::new(format!("failed to encode request: {e}")).with_code("encode")
        })?;

        let mut child = self.command(request).spawn().map_err(|e| {
            ActionError::new(format!("failed to start '{}': {e}", self.program)).with_code(SPAWN_CODE)
        })?;
        debug!(program = %self.program, step = %request.step, pid = ?child.id(), "spawned action process");

        let stdin = child.stdin.take();
        let write = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(&payload).await?;
            }
            Ok::<_, std::io::Error>(())
        };
        let (written, output) = tokio::join!(write, child.wait_with_output());

        // Programs that ignore stdin may exit before reading it.
        if let Err(e) = written {
            debug!(program = %self.program, error = %e, "request not fully written to stdin");
        }

        let output = output.map_err(|e| {
            ActionError::new(format!("failed to wait for '{}': {e}", self.program)).with_code("io")
        })?;

        if output.status.success() {
            return Ok(parse_stdout(&output.stdout));
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            format!("'{}' exited with {}", self.program, output.status)
        } else {
            stderr
        };
        let code = output
            .status
            .code()
            .map_or_else(|| "signal".to_string(), |code| code.to_string());
        Err(ActionError::new(message).with_code(code))
    }
}

#[async_trait]
impl Action for ProcessAction {
    async fn invoke(&self, request: &ActionRequest) -> Outcome {
        self.run(request).await.into()
    }
}

fn parse_stdout(stdout: &[u8]) -> Value {
    let text = String::from_utf8_lossy(stdout);
    let text = text.trim();
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
