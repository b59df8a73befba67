//! Layout command execution
//!
//! Commands are plain strings from the configuration. They go through POSIX
//! shell word expansion (quoting, variables, command substitution and field
//! splitting), and the first word is executed directly (no shell) with the
//! rest as arguments. The caller waits for the command to finish before the
//! next key event is read.

use std::future::Future;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};

use nix::sys::signal::Signal;
use thiserror::Error;
use tokio::process::Command;

use crate::error::exit_code;
use crate::wordexp;

/// Ways a layout command can fail. All of them are fatal for the daemon.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Shell word expansion rejected the command (e.g. unbalanced quotes)
    #[error("word expansion failed: {message}")]
    Expansion { message: String },

    #[error("command expanded to no words")]
    Empty,

    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("abnormal command termination by {}", signal_name(.signal))]
    Signaled { signal: i32 },

    #[error("command failed, status {status}")]
    ExitStatus { status: i32 },
}

impl CommandError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CommandError::Expansion { .. } => exit_code::EXPANSION_FAILED,
            CommandError::Empty => exit_code::EMPTY_COMMAND,
            CommandError::Spawn { .. } => exit_code::SPAWN_FAILED,
            CommandError::Signaled { .. } => exit_code::ABNORMAL_TERMINATION,
            CommandError::ExitStatus { .. } => exit_code::NONZERO_EXIT,
        }
    }
}

fn signal_name(signal: &i32) -> String {
    match Signal::try_from(*signal) {
        Ok(sig) => sig.as_str().to_string(),
        Err(_) => format!("signal {}", signal),
    }
}

/// Runs a layout command to completion.
pub trait CommandRunner {
    fn run(&mut self, command: &str) -> impl Future<Output = Result<(), CommandError>>;
}

/// Runs commands as child processes of the daemon.
///
/// The child's stdin is `/dev/null` so it can never consume events when the
/// daemon itself reads from stdin. A child still running when the daemon
/// shuts down is killed.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    async fn run(&mut self, command: &str) -> Result<(), CommandError> {
        let words = expand_command(command)?;
        let (program, args) = words.split_first().ok_or(CommandError::Empty)?;

        tracing::debug!("Spawning {} {:?}", program, args);

        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|source| CommandError::Spawn {
                program: program.clone(),
                source,
            })?;

        check_status(status)
    }
}

/// Expand a command string into the program and its arguments.
///
/// Unset variables expand to the empty string.
pub fn expand_command(command: &str) -> Result<Vec<String>, CommandError> {
    let words = wordexp::expand(command)
        .map_err(|e| CommandError::Expansion { message: e.message })?;

    if words.is_empty() {
        return Err(CommandError::Empty);
    }

    Ok(words)
}

fn check_status(status: ExitStatus) -> Result<(), CommandError> {
    match status.code() {
        Some(0) => Ok(()),
        Some(code) => Err(CommandError::ExitStatus { status: code }),
        None => Err(CommandError::Signaled {
            signal: status.signal().unwrap_or_default(),
        }),
    }
}
