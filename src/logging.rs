//! Logger setup.
//!
//! The TUI owns the terminal, so interactive runs log to a file in the temp
//! directory. CLI runs log to stderr. `RUST_LOG` overrides the `-v` level.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use env_logger::{Builder, Env, Target};
use log::LevelFilter;

/// Where log records go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSink {
    Stderr,
    /// A fresh file in the temp directory
    TempFile,
}

/// Maps the number of `-v` flags to a level.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// A log file name in `dir` that does not clash with concurrent runs.
pub fn log_file_path(dir: &Path) -> PathBuf {
    dir.join(format!("taxview-{:08x}.log", rand::random::<u32>()))
}

/// Installs the global logger. Returns the log file path for [`LogSink::TempFile`].
pub fn init(verbosity: u8, sink: LogSink) -> Result<Option<PathBuf>> {
    let mut builder = Builder::from_env(Env::default().default_filter_or(level_for(verbosity).as_str()));
    builder.format_timestamp_millis();

    let path = match sink {
        LogSink::Stderr => {
            builder.target(Target::Stderr);
            None
        }
        LogSink::TempFile => {
            let path = log_file_path(&std::env::temp_dir());
            let file = File::create(&path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            builder.target(Target::Pipe(Box::new(file)));
            Some(path)
        }
    };

    builder.try_init().context("Logger already initialized")?;
    Ok(path)
}
