//! Error type shared by the process runner, the tool wrappers and the file helpers.

use std::io;
use thiserror::Error;

/// Result type alias for library operations
pub type Result<T> = std::result::Result<T, MagError>;

#[derive(Error, Debug)]
pub enum MagError {
    /// The external program could not be started at all
    #[error("The subcommand {command} could not be launched: {source}")]
    Launch {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The external program ran but exited with a non-zero status
    #[error("The subcommand {command} experienced an error ({}), see the log for more info.", describe_status(.status))]
    CommandFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    /// Fetching a URL failed, either in transport or with an HTTP error status
    #[error("Something went wrong with the download of the url {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("File operation failed: {0}")]
    Io(#[from] io::Error),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_string(),
    }
}

impl MagError {
    /// Exit status of a failed command, if this error carries one
    pub fn exit_status(&self) -> Option<i32> {
        match self {
            MagError::CommandFailed { status, .. } => *status,
            _ => None,
        }
    }
}
