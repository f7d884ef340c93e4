//! Argument vectors for the `t8n` command line.
//!
//! Input flags are left out entirely when unset or empty, so the application
//! falls back to its own default. Output flags are always present; an empty
//! destination tells the application to suppress that channel.

use std::path::Path;

pub const T8N_SUBCOMMAND: &str = "t8n";

/// Destination token that routes an output channel to stdout.
pub const STDOUT_DEST: &str = "stdout";

pub const INPUT_ALLOC_FLAG: &str = "--input.alloc";
pub const INPUT_TXS_FLAG: &str = "--input.txs";
pub const INPUT_ENV_FLAG: &str = "--input.env";
pub const STATE_FORK_FLAG: &str = "--state.fork";
pub const STATE_REWARD_FLAG: &str = "--state.reward";
pub const OUTPUT_ALLOC_FLAG: &str = "--output.alloc";
pub const OUTPUT_RESULT_FLAG: &str = "--output.result";
pub const OUTPUT_BODY_FLAG: &str = "--output.body";

/// Input files and state parameters for one run.
///
/// File names are relative to the scenario's base directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSpec {
    pub alloc: Option<String>,
    pub txs: Option<String>,
    pub env: Option<String>,
    pub fork: Option<String>,
    pub reward: Option<String>,
}

impl InputSpec {
    /// The usual alloc/txs/env triple.
    pub fn files(alloc: &str, txs: &str, env: &str) -> Self {
        Self {
            alloc: Some(alloc.to_string()),
            txs: Some(txs.to_string()),
            env: Some(env.to_string()),
            ..Self::default()
        }
    }

    pub fn fork(mut self, fork: &str) -> Self {
        self.fork = Some(fork.to_string());
        self
    }

    pub fn reward(mut self, reward: &str) -> Self {
        self.reward = Some(reward.to_string());
        self
    }

    pub fn to_args(&self, base_dir: &Path) -> Vec<String> {
        let mut out = Vec::new();
        let files = [
            (INPUT_ALLOC_FLAG, &self.alloc),
            (INPUT_TXS_FLAG, &self.txs),
            (INPUT_ENV_FLAG, &self.env),
        ];
        for (flag, file) in files {
            if let Some(file) = present(file.as_deref()) {
                out.push(flag.to_string());
                out.push(format!("{}/{}", base_dir.display(), file));
            }
        }
        let state = [(STATE_FORK_FLAG, &self.fork), (STATE_REWARD_FLAG, &self.reward)];
        for (flag, value) in state {
            if let Some(value) = present(value.as_deref()) {
                out.push(flag.to_string());
                out.push(value.to_string());
            }
        }
        out
    }
}

/// `Some("")` counts as unset.
fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

/// Which output channels should reach stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputSpec {
    pub alloc: bool,
    pub result: bool,
    pub body: bool,
}

impl OutputSpec {
    pub fn alloc_and_result() -> Self {
        Self {
            alloc: true,
            result: true,
            body: false,
        }
    }

    pub fn result_only() -> Self {
        Self {
            result: true,
            ..Self::default()
        }
    }

    pub fn body_only() -> Self {
        Self {
            body: true,
            ..Self::default()
        }
    }

    /// Subcommand first, then body, result and alloc in that order.
    pub fn to_args(&self) -> Vec<String> {
        let mut out = vec![T8N_SUBCOMMAND.to_string()];
        let channels = [
            (OUTPUT_BODY_FLAG, self.body),
            (OUTPUT_RESULT_FLAG, self.result),
            (OUTPUT_ALLOC_FLAG, self.alloc),
        ];
        for (flag, enabled) in channels {
            out.push(flag.to_string());
            out.push(if enabled { STDOUT_DEST } else { "" }.to_string());
        }
        out
    }
}
