//! Logging configuration.
//!
//! Every helper in this crate reports through `tracing` macros and never touches
//! a global handler list. Whoever drives the pipeline builds a [`Dispatch`] from
//! a [`LogConfig`] and decides how long it lives:
//!
//! ```no_run
//! use mag_utils::logging::{build_dispatch, LogConfig};
//!
//! let config = LogConfig::builder().log_file("annotate.log").build();
//! let dispatch = build_dispatch(&config).unwrap();
//! tracing::dispatcher::with_default(&dispatch, || {
//!     tracing::info!("scoped to this call site");
//! });
//! ```
//!
//! The command-line binary simply installs the dispatch globally with
//! [`init_logging`].

use crate::error::{MagError, Result};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing::{Dispatch, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

/// Minimum level of messages that get through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = MagError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            // no separate critical level in tracing
            "error" | "critical" => Ok(LogLevel::Error),
            _ => Err(MagError::Logging(format!("Invalid log level: {s}"))),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,

    /// Write to stderr as well as to the log files
    pub console: bool,

    /// Files that receive a copy of every message, next to the console output
    pub log_files: Vec<PathBuf>,

    /// Additional filter directives (e.g. "reqwest=warn")
    pub filter_directives: Option<String>,

    pub include_targets: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            console: true,
            log_files: Vec::new(),
            filter_directives: None,
            include_targets: false,
        }
    }
}

impl LogConfig {
    /// Load configuration from environment variables
    ///
    /// - `LOG_LEVEL`: trace, debug, info, warn, error
    /// - `LOG_FILTER`: additional filter directives
    /// - `LOG_FILES`: `:`-separated list of log file paths
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.level = level.parse()?;
        }

        if let Ok(filter) = std::env::var("LOG_FILTER") {
            config.filter_directives = Some(filter);
        }

        if let Ok(files) = std::env::var("LOG_FILES") {
            config.log_files = std::env::split_paths(&files)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
        }

        Ok(config)
    }

    pub fn builder() -> LogConfigBuilder {
        LogConfigBuilder::default()
    }
}

#[derive(Default)]
pub struct LogConfigBuilder {
    config: LogConfig,
}

impl LogConfigBuilder {
    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    pub fn console(mut self, console: bool) -> Self {
        self.config.console = console;
        self
    }

    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log_files.push(path.into());
        self
    }

    pub fn filter_directives(mut self, filter: impl Into<String>) -> Self {
        self.config.filter_directives = Some(filter.into());
        self
    }

    pub fn include_targets(mut self, include: bool) -> Self {
        self.config.include_targets = include;
        self
    }

    pub fn build(self) -> LogConfig {
        self.config
    }
}

fn build_filter(config: &LogConfig) -> Result<EnvFilter> {
    let level = LevelFilter::from_level(config.level.to_tracing_level());
    let mut filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy("");

    if let Some(ref directives) = config.filter_directives {
        for directive in directives.split(',').filter(|d| !d.trim().is_empty()) {
            let parsed = directive.trim().parse().map_err(|e| {
                MagError::Logging(format!("Failed to parse filter directive '{directive}': {e}"))
            })?;
            filter = filter.add_directive(parsed);
        }
    }

    Ok(filter)
}

/// Build a subscriber writing to stderr (unless disabled) and to each configured log file.
///
/// Log files are opened in append mode and created when missing.
pub fn build_dispatch(config: &LogConfig) -> Result<Dispatch> {
    let filter = build_filter(config)?;

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    if config.console {
        layers.push(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(config.include_targets)
                .boxed(),
        );
    }

    for path in &config.log_files {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        layers.push(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(config.include_targets)
                .boxed(),
        );
    }

    let subscriber = tracing_subscriber::registry().with(layers).with(filter);
    Ok(Dispatch::new(subscriber))
}

/// Install the subscriber for the whole process. Fails if one is already set.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let dispatch = build_dispatch(config)?;
    tracing::dispatcher::set_global_default(dispatch)
        .map_err(|e| MagError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("critical".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert!("loud".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Trace.to_string(), "trace");
    }

    #[test]
    fn test_scoped_dispatch_writes_every_log_file() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("first.log");
        let second = dir.path().join("second.log");

        let config = LogConfig::builder()
            .console(false)
            .log_file(&first)
            .log_file(&second)
            .build();
        let dispatch = build_dispatch(&config).unwrap();

        tracing::dispatcher::with_default(&dispatch, || {
            tracing::info!("merging 3 files");
            tracing::debug!("below the configured level");
        });

        for path in [&first, &second] {
            let contents = std::fs::read_to_string(path).unwrap();
            assert!(contents.contains("merging 3 files"));
            assert!(!contents.contains("below the configured level"));
        }
    }

    #[test]
    fn test_debug_level_with_targets() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("debug.log");

        let config = LogConfig::builder()
            .console(false)
            .level(LogLevel::Debug)
            .include_targets(true)
            .log_file(&log)
            .build();
        let dispatch = build_dispatch(&config).unwrap();

        tracing::dispatcher::with_default(&dispatch, || {
            tracing::debug!("running subcommand");
            tracing::trace!("too chatty");
        });

        let contents = std::fs::read_to_string(&log).unwrap();
        assert!(contents.contains("DEBUG"));
        assert!(contents.contains("mag_utils::logging::tests"));
        assert!(contents.contains("running subcommand"));
        assert!(!contents.contains("too chatty"));
    }

    #[test]
    fn test_bad_filter_directive() {
        let config = LogConfig::builder()
            .filter_directives("reqwest=notalevel")
            .build();
        assert!(build_dispatch(&config).is_err());
    }
}
