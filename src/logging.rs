//! Subscriber setup for binaries that drive the engine.
//!
//! The library itself only emits `tracing` events. Human-readable logs go to
//! stderr so a binary's stdout stays free for its JSON report; a daily file
//! under `LOG_DIR` is added when `BANDIT_SIM_FILE_LOGS` is set.

use std::path::PathBuf;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::EngineConfig;

const LOG_FILE_PREFIX: &str = "bandit-sim.log";
const DEFAULT_LOG_DIR: &str = "./logs";
const FALLBACK_DIRECTIVE: &str = "info";

/// Keeps the non-blocking file writer alive; hold it until exit.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

/// Where and how much to log
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogSettings {
    /// `EnvFilter` directive, e.g. `info` or `bandit_sim::simulation=debug`
    pub directive: String,
    pub file_logs: bool,
    pub dir: PathBuf,
}

impl LogSettings {
    pub fn from_env(directive: &str) -> Self {
        Self::from_lookup(directive, |name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(directive: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let directive = match directive.trim() {
            "" => FALLBACK_DIRECTIVE.to_string(),
            trimmed => trimmed.to_string(),
        };
        let file_logs = lookup("BANDIT_SIM_FILE_LOGS")
            .map(|value| value == "true" || value == "1")
            .unwrap_or(false);
        let dir = lookup("LOG_DIR")
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR));

        Self {
            directive,
            file_logs,
            dir,
        }
    }

    /// The filter for `directive`, or `info` when it does not parse.
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.directive).unwrap_or_else(|_| EnvFilter::new(FALLBACK_DIRECTIVE))
    }

    fn file_layer_writer(&self) -> Option<(NonBlocking, WorkerGuard)> {
        if !self.file_logs {
            return None;
        }
        if let Err(err) = std::fs::create_dir_all(&self.dir) {
            eprintln!("failed to create log directory {}: {err}", self.dir.display());
            return None;
        }
        let appender = RollingFileAppender::new(Rotation::DAILY, &self.dir, LOG_FILE_PREFIX);
        Some(tracing_appender::non_blocking(appender))
    }
}

/// Install the global subscriber for `engine` and log the settings it runs with.
pub fn init_tracing(engine: &EngineConfig) -> Option<FileLogGuard> {
    let settings = LogSettings::from_env(&engine.log_level);

    let (file_layer, guard) = match settings.file_layer_writer() {
        Some((writer, guard)) => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(FileLogGuard { _guard: guard }))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(settings.filter())
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(file_layer)
        .init();

    tracing::info!(
        parallel_trials = engine.parallel_trials,
        num_threads = ?engine.num_threads,
        filter = %settings.directive,
        file_logs = guard.is_some(),
        log_dir = %settings.dir.display(),
        "bandit-sim logging ready"
    );

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(directive: &str, vars: &[(&str, &str)]) -> LogSettings {
        LogSettings::from_lookup(directive, |name| {
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
        })
    }

    #[test]
    fn test_defaults() {
        let settings = settings("info", &[]);
        assert_eq!(settings.directive, "info");
        assert!(!settings.file_logs);
        assert_eq!(settings.dir, PathBuf::from("./logs"));
    }

    #[test]
    fn test_blank_directive_falls_back_to_info() {
        assert_eq!(settings("", &[]).directive, "info");
        assert_eq!(settings("  ", &[]).directive, "info");
        assert_eq!(settings(" debug ", &[]).directive, "debug");
    }

    #[test]
    fn test_file_logs_flag() {
        for on in ["true", "1"] {
            assert!(settings("info", &[("BANDIT_SIM_FILE_LOGS", on)]).file_logs);
        }
        for off in ["false", "0", "yes", ""] {
            assert!(!settings("info", &[("BANDIT_SIM_FILE_LOGS", off)]).file_logs);
        }
    }

    #[test]
    fn test_log_dir() {
        let custom = settings("info", &[("LOG_DIR", "/tmp/bandit")]);
        assert_eq!(custom.dir, PathBuf::from("/tmp/bandit"));
        let empty = settings("info", &[("LOG_DIR", "")]);
        assert_eq!(empty.dir, PathBuf::from("./logs"));
    }

    #[test]
    fn test_disabled_file_logs_create_no_writer() {
        assert!(settings("info", &[]).file_layer_writer().is_none());
    }
}
