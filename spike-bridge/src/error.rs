//! Error taxonomy for the bridge.
//!
//! ```text
//! BridgeError
//! ├── Core              (InvalidShape / ShapeMismatch from spike-core)
//! ├── Io                (artifact cannot be created, written or read)
//! ├── Format            (artifact content violates the layout)
//! ├── Launch            (simulator missing or unstartable)
//! ├── SimulationFailed  (simulator exited non-zero)
//! ├── SimulationTimeout (simulator killed after the configured timeout)
//! ├── Config
//! └── Dataset
//! ```

use std::path::PathBuf;
use std::time::Duration;

use spike_core::CoreError;
use thiserror::Error;

pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("I/O failure on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("format error in {} line {line}: {message}", .path.display())]
    Format {
        path: PathBuf,
        /// 1-based; 0 when the problem is not tied to a line.
        line: usize,
        message: String,
    },

    #[error("failed to launch simulator {}: {source}", .executable.display())]
    Launch {
        executable: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("simulator {} failed: {}", .executable.display(), describe_exit(.code))]
    SimulationFailed {
        executable: PathBuf,
        /// `None` when the process was terminated by a signal.
        code: Option<i32>,
    },

    #[error("simulator {} did not finish within {timeout:?} and was killed", .executable.display())]
    SimulationTimeout { executable: PathBuf, timeout: Duration },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("dataset error: {0}")]
    Dataset(#[from] DatasetError),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit status {}", c),
        None => "terminated by signal".to_string(),
    }
}

impl BridgeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BridgeError::Io { path: path.into(), source }
    }

    pub fn format(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        BridgeError::Format { path: path.into(), line, message: message.into() }
    }
}

/// Errors from loading or validating a [`BridgeConfig`](crate::config::BridgeConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue { field, reason: reason.into() }
    }
}

/// Errors from the dataset collaborator.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a valid IDX file: {reason}", .path.display())]
    Idx { path: PathBuf, reason: String },

    #[error("dataset has {images} images but {labels} labels")]
    LengthMismatch { images: usize, labels: usize },

    #[error("index {index} out of bounds for dataset of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("dataset has {available} samples, fewer than one batch of {batch_size}")]
    TooSmall { available: usize, batch_size: usize },
}
