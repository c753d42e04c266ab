use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Expected file missing from clone: {}", .0.display())]
    MissingTemplate(PathBuf),

    #[error("{context} failed with exit code {exit_code}{detail}")]
    CommandFailed {
        context: String,
        exit_code: i32,
        detail: String,
    },

    #[error("Failed to run {context}: {source}")]
    Spawn {
        context: String,
        source: std::io::Error,
    },

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Docker error: {0}")]
    Docker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a command failure. `detail` carries captured error text when the
    /// command's stderr was not already streamed to the terminal.
    pub fn command_failed(context: impl Into<String>, exit_code: i32, detail: &str) -> Self {
        let detail = if detail.trim().is_empty() {
            String::new()
        } else {
            format!(": {}", detail.trim())
        };
        Error::CommandFailed {
            context: context.into(),
            exit_code,
            detail,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Error::Config(_) => "CONFIG_ERROR",
            Error::MissingTemplate(_) => "TEMPLATE_MISSING",
            Error::CommandFailed { .. } => "COMMAND_FAILED",
            Error::Spawn { .. } => "SPAWN_ERROR",
            Error::Manifest(_) => "MANIFEST_ERROR",
            Error::Docker(_) => "DOCKER_ERROR",
            Error::Io(_) => "IO_ERROR",
            Error::Json(_) => "JSON_ERROR",
        }
    }

    /// Process exit code for this failure. External command failures
    /// propagate the child's own exit code; everything else is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::CommandFailed { exit_code, .. } if *exit_code > 0 => *exit_code,
            _ => 1,
        }
    }
}
