//! CLI command implementations
//!
//! Every command reports through the [`Ui`](crate::ui::Ui) it was built with
//! and returns a process exit code:
//! - `0` → success
//! - `1` → bad arguments, or the server rejected the operation
//! - `2` → the client could not be set up

use thiserror::Error;

pub mod seal;

/// A subcommand of the `vault` binary
pub trait Command {
    /// Long-form help text
    fn help(&self) -> String;

    /// One-line description for command listings
    fn synopsis(&self) -> &'static str;

    /// Run with the arguments following the command name
    async fn run(&self, args: Vec<String>) -> i32;
}

/// Why a command stopped, rendered to text only when reported
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{help}")]
    Usage { help: String },

    #[error("Error initializing client: {}", one_line(.0))]
    Initialization(anyhow::Error),

    #[error("Error {action}: {}", one_line(.cause))]
    Operation {
        action: &'static str,
        cause: anyhow::Error,
    },
}

impl CommandError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CommandError::Usage { .. } => 1,
            CommandError::Initialization(_) => 2,
            CommandError::Operation { .. } => 1,
        }
    }
}

/// Render a cause chain as a single line
fn one_line(cause: &anyhow::Error) -> String {
    format!("{:#}", cause)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_exit_codes() {
        let usage = CommandError::Usage {
            help: "Usage: vault seal".to_string(),
        };
        let init = CommandError::Initialization(anyhow::anyhow!("bad address"));
        let op = CommandError::Operation {
            action: "sealing",
            cause: anyhow::anyhow!("permission denied"),
        };

        assert_eq!(usage.exit_code(), 1);
        assert_eq!(init.exit_code(), 2);
        assert_eq!(op.exit_code(), 1);
    }

    #[test]
    fn test_cause_chain_on_one_line() {
        let cause = Err::<(), _>(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no such file",
        ))
        .context("failed to read CA certificate ca.pem")
        .unwrap_err();

        let err = CommandError::Initialization(cause);

        assert_eq!(
            err.to_string(),
            "Error initializing client: failed to read CA certificate ca.pem: no such file"
        );
    }

    #[test]
    fn test_multiline_cause_is_flattened() {
        let err = CommandError::Operation {
            action: "sealing",
            cause: anyhow::anyhow!("server said:\n  maintenance window\n"),
        };

        assert_eq!(err.to_string(), "Error sealing: server said: maintenance window");
    }
}
