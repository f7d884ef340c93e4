//! Environment-driven harness settings.

use std::ffi::OsString;
use std::path::Path;
use std::path::PathBuf;

use crate::error::ConfigError;

pub const TESTDATA_ENV: &str = "T8N_HARNESS_TESTDATA";
pub const PROGRAM_ENV: &str = "T8N_HARNESS_PROGRAM";
pub const LOG_LEVEL_ENV: &str = "T8N_HARNESS_LOG_LEVEL";
pub const LOG_FILE_ENV: &str = "T8N_HARNESS_LOG";

/// Identity the application under test is relaunched as.
pub const DEFAULT_PROGRAM: &str = "evm-test";
pub const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Overrides the directory that scenario base dirs are resolved against.
    pub testdata_root: Option<PathBuf>,
    pub program: String,
    /// Used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Logs are appended here instead of stderr.
    pub log_file: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            testdata_root: None,
            program: DEFAULT_PROGRAM.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_file: None,
        }
    }
}

impl HarnessConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var_os(name))
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let defaults = Self::default();
        let testdata_root = read_nonempty(&lookup, TESTDATA_ENV)?.map(PathBuf::from);
        let program = read_nonempty(&lookup, PROGRAM_ENV)?.unwrap_or(defaults.program);
        let log_level = read_nonempty(&lookup, LOG_LEVEL_ENV)?.unwrap_or(defaults.log_level);
        let log_file = read_nonempty(&lookup, LOG_FILE_ENV)?.map(PathBuf::from);
        Ok(Self {
            testdata_root,
            program,
            log_level,
            log_file,
        })
    }

    /// The testdata root, or `default` when no override is set.
    pub fn testdata_dir(&self, default: &Path) -> PathBuf {
        self.testdata_root
            .clone()
            .unwrap_or_else(|| default.to_path_buf())
    }
}

fn read_nonempty<F>(lookup: &F, name: &'static str) -> Result<Option<String>, ConfigError>
where
    F: Fn(&str) -> Option<OsString>,
{
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    let value = raw
        .into_string()
        .map_err(|_| ConfigError::NotUnicode { name })?;
    if value.trim().is_empty() {
        return Err(ConfigError::Empty { name });
    }
    Ok(Some(value))
}
