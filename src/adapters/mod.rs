//! Capability adapters: thin, stateless wrappers around one backend each.
//!
//! Every adapter method returns `Result<Envelope, AdapterError>`; the tool layer
//! folds the error side into an error envelope so nothing backend-specific
//! escapes an operation.

pub mod docker;
pub mod harbor;
pub mod helm;
pub mod kubernetes;
pub mod mysql;
pub mod prometheus;

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Backend failure inside an adapter operation.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("HTTP error: {status} - {body}")]
    Http { status: u16, body: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("command `{command}` failed")]
    Command { command: String, stderr: String },

    #[error("could not run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse backend output: {0}")]
    Parse(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Store(String),
}

impl AdapterError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Secondary diagnostic text, e.g. a command's stderr.
    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Command { stderr, .. } if !stderr.trim().is_empty() => Some(stderr.trim()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<anyhow::Error> for AdapterError {
    fn from(err: anyhow::Error) -> Self {
        Self::Store(format!("{err:#}"))
    }
}

/// One external program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            env: Vec::new(),
        }
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    /// Printable form for logs and error messages. Environment values are not shown.
    pub fn display(&self) -> String {
        let mut out = self.program.clone();
        for arg in &self.args {
            out.push(' ');
            out.push_str(arg);
        }
        out
    }
}

/// Captured output of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs external CLIs (helm, docker, mysqldump). A non-zero exit is an error.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput, AdapterError>;

    /// Run `command` with stdout written unmodified to `path`, returning the
    /// number of bytes written. On failure `path` is not left behind.
    async fn run_to_file(&self, command: &CommandSpec, path: &Path) -> Result<u64, AdapterError>;
}

/// [`CommandRunner`] backed by `tokio::process`.
#[derive(Debug, Default, Clone)]
pub struct ProcessRunner;

impl ProcessRunner {
    fn command(spec: &CommandSpec) -> tokio::process::Command {
        let mut command = tokio::process::Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .kill_on_drop(true);
        command
    }

    async fn stream_into(
        spec: &CommandSpec,
        shown: &str,
        path: &Path,
    ) -> Result<u64, AdapterError> {
        let mut child = Self::command(spec)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| AdapterError::Spawn {
                command: shown.to_string(),
                source,
            })?;

        let (Some(mut stdout), Some(mut stderr)) = (child.stdout.take(), child.stderr.take())
        else {
            return Err(AdapterError::Io(std::io::Error::other(
                "child process output was not captured",
            )));
        };

        let mut file = tokio::fs::File::create(path).await?;
        let mut errors = Vec::new();
        let (copied, read, status) = tokio::join!(
            tokio::io::copy(&mut stdout, &mut file),
            stderr.read_to_end(&mut errors),
            child.wait(),
        );

        if !status?.success() {
            return Err(AdapterError::Command {
                command: shown.to_string(),
                stderr: String::from_utf8_lossy(&errors).into_owned(),
            });
        }
        let bytes = copied?;
        read?;
        file.flush().await?;
        Ok(bytes)
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput, AdapterError> {
        let shown = command.display();
        tracing::debug!(command = %shown, "running command");

        let output = Self::command(command)
            .output()
            .await
            .map_err(|source| AdapterError::Spawn {
                command: shown.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(AdapterError::Command {
                command: shown,
                stderr,
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }

    async fn run_to_file(&self, command: &CommandSpec, path: &Path) -> Result<u64, AdapterError> {
        let shown = command.display();
        tracing::debug!(command = %shown, file = %path.display(), "running command into file");

        let result = Self::stream_into(command, &shown, path).await;
        if result.is_err() {
            if let Err(e) = tokio::fs::remove_file(path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(file = %path.display(), error = %e, "could not remove partial output");
                }
            }
        }
        result
    }
}

/// Read an error body for an unsuccessful HTTP response.
pub(crate) async fn http_error(response: reqwest::Response) -> AdapterError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    AdapterError::Http {
        status,
        body: truncate(body.trim(), 512),
    }
}

/// Parse a response body as JSON; an empty body becomes `Value::Null`.
pub(crate) async fn json_body(response: reqwest::Response) -> Result<Value, AdapterError> {
    let text = response.text().await?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text)?)
}

/// A value passed as a single CLI argument: non-empty, no whitespace, not a flag.
pub(crate) fn cli_arg(field: &str, value: &str) -> Result<(), AdapterError> {
    if value.is_empty() || value.starts_with('-') || value.contains(char::is_whitespace) {
        return Err(AdapterError::invalid(format!(
            "{field} '{value}' is not a valid argument"
        )));
    }
    Ok(())
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Follow a JSON pointer, returning `Null` when absent.
pub(crate) fn at<'a>(value: &'a Value, pointer: &str) -> &'a Value {
    value.pointer(pointer).unwrap_or(&Value::Null)
}

/// Array at a JSON pointer, or an empty slice.
pub(crate) fn items<'a>(value: &'a Value, pointer: &str) -> &'a [Value] {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
