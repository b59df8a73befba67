//! Fatal daemon errors and their exit codes
//!
//! Nothing in the daemon recovers locally: every error below ends the
//! process, and each cause has its own exit status so wrapper scripts can
//! tell them apart.
//!
//! | code | cause |
//! |------|-------|
//! | 1    | usage or configuration error |
//! | 2    | input source cannot be opened |
//! | 3    | failed or short event read (EOF included) |
//! | 7    | command word expansion failed |
//! | 8    | command expanded to no words |
//! | 9    | command could not be spawned |
//! | 10   | command terminated abnormally |
//! | 11   | command exited with nonzero status |

use std::path::PathBuf;

use altshift_config::ConfigError;
use thiserror::Error;

use crate::runner::CommandError;

pub mod exit_code {
    pub const CONFIG: i32 = 1;
    pub const OPEN_INPUT: i32 = 2;
    pub const READ_EVENT: i32 = 3;
    pub const EXPANSION_FAILED: i32 = 7;
    pub const EMPTY_COMMAND: i32 = 8;
    pub const SPAWN_FAILED: i32 = 9;
    pub const ABNORMAL_TERMINATION: i32 = 10;
    pub const NONZERO_EXIT: i32 = 11;
}

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The input event device (or file) could not be opened
    #[error("Could not open input event device file '{path}': {source}")]
    OpenInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single read failed or did not return exactly one `input_event`
    /// (short read or end of input)
    #[error("Reading input event device failed (expected {expected} bytes): {source}")]
    ReadEvent {
        expected: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Error executing command '{command}': {source}")]
    Command {
        command: String,
        #[source]
        source: CommandError,
    },
}

impl DaemonError {
    pub fn exit_code(&self) -> i32 {
        match self {
            DaemonError::Config(_) => exit_code::CONFIG,
            DaemonError::OpenInput { .. } => exit_code::OPEN_INPUT,
            DaemonError::ReadEvent { .. } => exit_code::READ_EVENT,
            DaemonError::Command { source, .. } => source.exit_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let errors = [
            DaemonError::Config(ConfigError::Invalid {
                message: "bad".to_string(),
            }),
            DaemonError::OpenInput {
                path: PathBuf::from("/dev/input/event99"),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            },
            DaemonError::ReadEvent {
                expected: 24,
                source: std::io::Error::from(std::io::ErrorKind::UnexpectedEof),
            },
            DaemonError::Command {
                command: "'".to_string(),
                source: CommandError::Expansion {
                    message: "missing closing quote".to_string(),
                },
            },
            DaemonError::Command {
                command: "".to_string(),
                source: CommandError::Empty,
            },
            DaemonError::Command {
                command: "nope".to_string(),
                source: CommandError::Spawn {
                    program: "nope".to_string(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                },
            },
            DaemonError::Command {
                command: "sh".to_string(),
                source: CommandError::Signaled { signal: 9 },
            },
            DaemonError::Command {
                command: "false".to_string(),
                source: CommandError::ExitStatus { status: 1 },
            },
        ];

        let mut codes: Vec<i32> = errors.iter().map(DaemonError::exit_code).collect();
        assert!(codes.iter().all(|&c| c != 0));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}
