use crate::error::{MagError, Result};
use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, error};

/// How a subprocess call treats its output and its failures
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Return stdout to the caller
    pub capture_stdout: bool,
    /// Write stdout to this file once the process has finished
    pub save_output: Option<PathBuf>,
    /// Turn a launch failure or a non-zero exit into an error instead of logging and continuing
    pub stop_on_error: bool,
    /// Non-zero exit statuses that still count as success (grep exits 1 when nothing matched)
    pub accepted_statuses: Vec<i32>,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            capture_stdout: true,
            save_output: None,
            stop_on_error: true,
            accepted_statuses: Vec::new(),
        }
    }
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capture_stdout(mut self, capture: bool) -> Self {
        self.capture_stdout = capture;
        self
    }

    pub fn save_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_output = Some(path.into());
        self
    }

    pub fn stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }

    pub fn accept_status(mut self, code: i32) -> Self {
        self.accepted_statuses.push(code);
        self
    }

    fn is_accepted(&self, status: std::process::ExitStatus) -> bool {
        status.success()
            || status
                .code()
                .is_some_and(|code| self.accepted_statuses.contains(&code))
    }
}

/// Run `command[0]` with the remaining tokens as its arguments.
///
/// Returns `Some(stdout)` when `capture_stdout` is set. An empty command counts as a
/// launch failure.
pub fn run_process<S: AsRef<OsStr>>(command: &[S], options: &RunOptions) -> Result<Option<String>> {
    let command_line = command
        .iter()
        .map(|token| token.as_ref().to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ");

    let Some((program, args)) = command.split_first() else {
        let source = std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command");
        return launch_failed(command_line, source, options);
    };

    let mut cmd = Command::new(program);
    cmd.args(args);
    execute(cmd, command_line, options)
}

/// Run a command line through `sh -c`, with the shell doing all quoting and expansion.
pub fn run_shell(command: &str, options: &RunOptions) -> Result<Option<String>> {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    execute(cmd, command.to_string(), options)
}

fn execute(mut cmd: Command, command_line: String, options: &RunOptions) -> Result<Option<String>> {
    debug!(command = %command_line, "running subcommand");

    let output = match cmd.output() {
        Ok(output) => output,
        Err(e) => return launch_failed(command_line, e, options),
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();

    if !options.is_accepted(output.status) {
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        error!("The subcommand {command_line} experienced an error: {stderr}");
        debug!("{stdout}");
        if options.stop_on_error {
            return Err(MagError::CommandFailed {
                command: command_line,
                status: output.status.code(),
                stderr,
            });
        }
    }

    if let Some(ref path) = options.save_output {
        fs::write(path, &stdout)?;
    }

    Ok(options.capture_stdout.then_some(stdout))
}

fn launch_failed(
    command_line: String,
    source: std::io::Error,
    options: &RunOptions,
) -> Result<Option<String>> {
    error!("The subcommand {command_line} experienced an error: {source}");
    if options.stop_on_error {
        Err(MagError::Launch {
            command: command_line,
            source,
        })
    } else {
        Ok(None)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::logging::{build_dispatch, LogConfig};
    use tempfile::tempdir;

    #[test]
    fn test_run_process_captures_stdout() {
        let stdout = run_process(&["echo", "K00001"], &RunOptions::default()).unwrap();
        assert_eq!(stdout.as_deref(), Some("K00001\n"));
    }

    #[test]
    fn test_run_process_without_capture() {
        let options = RunOptions::new().capture_stdout(false);
        let stdout = run_process(&["echo", "K00001"], &options).unwrap();
        assert!(stdout.is_none());
    }

    #[test]
    fn test_nonzero_exit_is_fatal() {
        let err = run_shell("echo broken >&2; exit 3", &RunOptions::default()).unwrap_err();
        match err {
            MagError::CommandFailed {
                command,
                status,
                stderr,
            } => {
                assert!(command.contains("exit 3"));
                assert_eq!(status, Some(3));
                assert_eq!(stderr.trim(), "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_nonzero_exit_is_logged_with_stderr() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("run.log");
        let config = LogConfig::builder().console(false).log_file(&log).build();
        let dispatch = build_dispatch(&config).unwrap();

        let result = tracing::dispatcher::with_default(&dispatch, || {
            run_shell("echo boom >&2; exit 4", &RunOptions::default())
        });
        assert_eq!(result.unwrap_err().exit_status(), Some(4));

        let logged = std::fs::read_to_string(&log).unwrap();
        let line = logged
            .lines()
            .find(|line| line.contains("ERROR"))
            .expect("an error line is logged");
        assert!(line.contains("echo boom >&2; exit 4"));
        assert!(line.contains("boom"));
    }

    #[test]
    fn test_accepted_status_is_not_an_error() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("run.log");
        let config = LogConfig::builder().console(false).log_file(&log).build();
        let dispatch = build_dispatch(&config).unwrap();

        let options = RunOptions::new().accept_status(1);
        let stdout = tracing::dispatcher::with_default(&dispatch, || {
            run_shell("echo nothing found; exit 1", &options)
        })
        .unwrap();
        assert_eq!(stdout.as_deref(), Some("nothing found\n"));
        assert!(!std::fs::read_to_string(&log).unwrap().contains("ERROR"));

        let err = run_shell("exit 2", &options).unwrap_err();
        assert_eq!(err.exit_status(), Some(2));
    }

    #[test]
    fn test_nonzero_exit_can_be_suppressed() {
        let options = RunOptions::new().stop_on_error(false);
        let stdout = run_shell("echo partial; exit 1", &options).unwrap();
        assert_eq!(stdout.as_deref(), Some("partial\n"));
    }

    #[test]
    fn test_missing_program() {
        let err = run_process(&["definitely-not-a-real-tool-xyz"], &RunOptions::default())
            .unwrap_err();
        assert!(matches!(err, MagError::Launch { .. }));

        let options = RunOptions::new().stop_on_error(false);
        let stdout = run_process(&["definitely-not-a-real-tool-xyz"], &options).unwrap();
        assert!(stdout.is_none());
    }

    #[test]
    fn test_empty_command() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            run_process(&empty, &RunOptions::default()),
            Err(MagError::Launch { .. })
        ));
    }

    #[test]
    fn test_save_output() {
        let dir = tempdir().unwrap();
        let saved = dir.path().join("stdout.txt");
        let options = RunOptions::new().save_output(&saved);

        run_process(&["printf", "a\\nb\\n"], &options).unwrap();
        assert_eq!(std::fs::read_to_string(&saved).unwrap(), "a\nb\n");
    }
}
