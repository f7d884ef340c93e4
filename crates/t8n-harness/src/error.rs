//! Error types for the harness.
//!
//! Each concern gets its own enum so callers can match on the failure they
//! care about; [`HarnessError`] wraps them for `?` at the top level.

use std::fmt;
use std::io;

use thiserror::Error;

/// Which side of a golden comparison a problem belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Output captured from the application under test.
    Have,
    /// Contents of the golden file.
    Want,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Have => f.write_str("actual output"),
            Side::Want => f.write_str("expected output"),
        }
    }
}

/// Self-dispatch registration errors.
#[derive(Error, Debug)]
pub enum ReexecError {
    #[error("Entry point '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("Cannot register '{0}': dispatch has already been checked")]
    Sealed(String),

    #[error("No entry point is registered as '{0}'")]
    NotRegistered(String),

    #[error("Failed to resolve current executable: {0}")]
    CurrentExe(#[source] io::Error),
}

/// Subprocess launch and collection errors.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to wait for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read {stream} of '{program}': {source}")]
    Read {
        program: String,
        stream: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("Capture thread for {stream} of '{program}' panicked")]
    CaptureLost {
        program: String,
        stream: &'static str,
    },

    #[error(transparent)]
    Reexec(#[from] ReexecError),
}

/// JSON decode failure, tagged with the side that failed.
#[derive(Error, Debug)]
pub enum JsonCompareError {
    #[error("Malformed JSON in {side}: {source}")]
    Malformed {
        side: Side,
        #[source]
        source: serde_json::Error,
    },
}

impl JsonCompareError {
    pub fn side(&self) -> Side {
        match self {
            JsonCompareError::Malformed { side, .. } => *side,
        }
    }
}

/// Environment configuration errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be valid UTF-8")]
    NotUnicode { name: &'static str },

    #[error("{name} must not be empty")]
    Empty { name: &'static str },
}

/// Top-level harness error.
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error(transparent)]
    Reexec(#[from] ReexecError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Json(#[from] JsonCompareError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{failed} of {total} scenarios failed:\n{details}")]
    ScenariosFailed {
        failed: usize,
        total: usize,
        details: String,
    },
}
