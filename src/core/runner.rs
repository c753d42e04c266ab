//! Injected command execution so the pipeline can be driven by a fake in tests.
//!
//! Every external command the orchestrator touches goes through a
//! [`CommandRunner`]. The real implementation echoes the command line to
//! stdout before executing it, so a run reads as a transcript of exactly
//! what was invoked.

use std::process::{Command, Stdio};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::utils::shell;

/// One external command: program plus argv. Everything positional; `git`
/// takes `-C` and the docker steps take the context dir as an argument, so
/// no working-directory or environment plumbing is carried here.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Full argv including the program, used by tests to assert exact
    /// command sequences.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        argv
    }

    /// The quoted command line echoed to the transcript.
    pub fn display_line(&self) -> String {
        shell::quote_argv(&self.argv())
    }
}

/// Result of a finished command. A non-zero exit is not an error at this
/// layer; callers decide whether failure is fatal or tolerated.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunOutput {
    pub exit_code: i32,
    pub success: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stdout: String,
}

impl RunOutput {
    pub fn new(exit_code: i32, stdout: String) -> Self {
        Self {
            exit_code,
            success: exit_code == 0,
            stdout,
        }
    }
}

pub trait CommandRunner {
    /// Run with inherited stdio so output streams live. Returns the exit
    /// status; `Err` only when the process could not be spawned.
    fn run(&self, invocation: &Invocation) -> Result<RunOutput>;

    /// Run with stdout captured (stderr still inherited).
    fn run_capture(&self, invocation: &Invocation) -> Result<RunOutput>;
}

/// Require a runner result to have succeeded, converting a non-zero exit
/// into a command failure that carries the child's exit code.
pub fn require_success(output: &RunOutput, context: &str) -> Result<()> {
    if output.success {
        Ok(())
    } else {
        Err(Error::command_failed(context, output.exit_code, ""))
    }
}

/// Executes commands with `std::process::Command`, echoing each one.
pub struct SystemRunner {
    echo: bool,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self { echo: true }
    }

    fn prepare(&self, invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        // BuildKit is required by the cache and buildx steps; forcing it
        // here keeps every child consistent with the build backend.
        cmd.env("DOCKER_BUILDKIT", "1");
        cmd
    }

    fn echo_line(&self, invocation: &Invocation) {
        if self.echo {
            println!("> {}", invocation.display_line());
        }
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<RunOutput> {
        self.echo_line(invocation);
        let status = self
            .prepare(invocation)
            .status()
            .map_err(|source| Error::Spawn {
                context: invocation.program.clone(),
                source,
            })?;
        Ok(RunOutput::new(status.code().unwrap_or(-1), String::new()))
    }

    fn run_capture(&self, invocation: &Invocation) -> Result<RunOutput> {
        self.echo_line(invocation);
        let output = self
            .prepare(invocation)
            .stderr(Stdio::inherit())
            .output()
            .map_err(|source| Error::Spawn {
                context: invocation.program.clone(),
                source,
            })?;
        Ok(RunOutput::new(
            output.status.code().unwrap_or(-1),
            String::from_utf8_lossy(&output.stdout).to_string(),
        ))
    }
}
