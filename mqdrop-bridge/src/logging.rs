//! Tracing subscriber setup.

use std::fs::OpenOptions;
use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot open log file {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot install log subscriber: {0}")]
    Install(String),
}

/// Install the global subscriber. `RUST_LOG` takes precedence over
/// `config.level`. With `config.file` set, output is appended there
/// without ANSI colours.
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let installed = if config.file.is_empty() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
    } else {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.file)
            .map_err(|source| LoggingError::File {
                path: config.file.clone(),
                source,
            })?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Arc::new(file))
            .try_init()
    };

    installed.map_err(|e| LoggingError::Install(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwritable_log_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            level: "info".into(),
            file: dir
                .path()
                .join("missing")
                .join("bridge.log")
                .to_string_lossy()
                .into_owned(),
        };
        assert!(matches!(init(&config), Err(LoggingError::File { .. })));
    }
}
