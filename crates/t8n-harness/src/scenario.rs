//! Table-driven golden scenarios.
//!
//! Every scenario runs to its first failure and the next one starts
//! regardless, so a report names every broken row of the table rather than
//! just the first.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::args::InputSpec;
use crate::args::OutputSpec;
use crate::command::Launcher;
use crate::command::RunningCommand;
use crate::error::CommandError;
use crate::error::HarnessError;
use crate::error::JsonCompareError;
use crate::json_cmp::compare_json;

/// One row of a scenario table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: Option<String>,
    pub base_dir: PathBuf,
    pub input: InputSpec,
    pub output: OutputSpec,
    pub expected_exit_code: i32,
    /// Golden file, relative to `base_dir`. Without one only the exit code
    /// is checked.
    pub expected_output: Option<String>,
}

impl Scenario {
    pub fn new(base_dir: impl Into<PathBuf>, input: InputSpec, output: OutputSpec) -> Self {
        Self {
            name: None,
            base_dir: base_dir.into(),
            input,
            output,
            expected_exit_code: 0,
            expected_output: None,
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn expect_exit_code(mut self, code: i32) -> Self {
        self.expected_exit_code = code;
        self
    }

    pub fn expect_output(mut self, file: &str) -> Self {
        self.expected_output = Some(file.to_string());
        self
    }

    /// Output flags first, then inputs.
    pub fn args(&self) -> Vec<String> {
        let mut args = self.output.to_args();
        args.extend(self.input.to_args(&self.base_dir));
        args
    }
}

#[derive(Error, Debug)]
pub enum ScenarioFailure {
    #[error("test {index}: could not start application: {source}")]
    Spawn {
        index: usize,
        #[source]
        source: CommandError,
    },

    #[error("test {index}: could not read expected output {}: {source}", path.display())]
    GoldenRead {
        index: usize,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("test {index}: json parsing failed: {source}")]
    MalformedJson {
        index: usize,
        #[source]
        source: JsonCompareError,
    },

    #[error("test {index}: output wrong, have\n{have}\nwant\n{want}")]
    OutputMismatch {
        index: usize,
        have: String,
        want: String,
    },

    #[error("test {index}: wrong exit code, have {have}, want {want}")]
    ExitCode { index: usize, have: i32, want: i32 },

    #[error("test {index}: lost track of the application: {source}")]
    Process {
        index: usize,
        #[source]
        source: CommandError,
    },
}

impl ScenarioFailure {
    pub fn index(&self) -> usize {
        match self {
            ScenarioFailure::Spawn { index, .. }
            | ScenarioFailure::GoldenRead { index, .. }
            | ScenarioFailure::MalformedJson { index, .. }
            | ScenarioFailure::OutputMismatch { index, .. }
            | ScenarioFailure::ExitCode { index, .. }
            | ScenarioFailure::Process { index, .. } => *index,
        }
    }
}

/// What happened to one scenario.
#[derive(Debug)]
pub struct ScenarioOutcome {
    pub index: usize,
    pub name: Option<String>,
    pub args: Vec<String>,
    pub failure: Option<ScenarioFailure>,
}

impl ScenarioOutcome {
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

impl fmt::Display for ScenarioOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name.as_deref().unwrap_or("unnamed");
        match &self.failure {
            None => write!(f, "test {} ({}) ... ok", self.index, name),
            Some(failure) => write!(f, "test {} ({}) ... FAILED\n{}", self.index, name, failure),
        }
    }
}

/// Outcomes in table order.
#[derive(Debug, Default)]
pub struct ScenarioReport {
    outcomes: Vec<ScenarioOutcome>,
}

impl ScenarioReport {
    pub fn outcomes(&self) -> &[ScenarioOutcome] {
        &self.outcomes
    }

    pub fn failures(&self) -> impl Iterator<Item = &ScenarioFailure> {
        self.outcomes.iter().filter_map(|o| o.failure.as_ref())
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(ScenarioOutcome::passed)
    }

    pub fn into_result(self) -> Result<(), HarnessError> {
        if self.is_success() {
            return Ok(());
        }
        let total = self.outcomes.len();
        let failures: Vec<String> = self.failures().map(ToString::to_string).collect();
        Err(HarnessError::ScenariosFailed {
            failed: failures.len(),
            total,
            details: failures.join("\n"),
        })
    }
}

/// Drives scenarios through a [`Launcher`], one child at a time.
pub struct ScenarioRunner<L> {
    launcher: L,
    program: String,
}

impl<L: Launcher> ScenarioRunner<L> {
    pub fn new(launcher: L, program: impl Into<String>) -> Self {
        Self {
            launcher,
            program: program.into(),
        }
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn run_all(&self, scenarios: &[Scenario]) -> ScenarioReport {
        let outcomes = scenarios
            .iter()
            .enumerate()
            .map(|(index, scenario)| {
                let failure = self.run_one(index, scenario).err();
                if let Some(failure) = &failure {
                    warn!(index, error = %failure, "scenario failed");
                }
                ScenarioOutcome {
                    index,
                    name: scenario.name.clone(),
                    args: scenario.args(),
                    failure,
                }
            })
            .collect();
        ScenarioReport { outcomes }
    }

    #[tracing::instrument(skip(self, scenario), fields(program = %self.program, name = ?scenario.name))]
    pub fn run_one(&self, index: usize, scenario: &Scenario) -> Result<(), ScenarioFailure> {
        let args = scenario.args();
        info!(args = %args.join(" "), "running scenario");

        let mut child = self
            .launcher
            .launch(&self.program, &args)
            .map_err(|source| ScenarioFailure::Spawn { index, source })?;

        if let Some(expected) = &scenario.expected_output {
            let path = scenario.base_dir.join(expected);
            let want = std::fs::read(&path)
                .map_err(|source| ScenarioFailure::GoldenRead { index, path, source })?;
            let have = child
                .output()
                .map_err(|source| ScenarioFailure::Process { index, source })?;
            match compare_json(&have, &want) {
                Err(source) => {
                    log_stderr(child.as_mut());
                    return Err(ScenarioFailure::MalformedJson { index, source });
                }
                Ok(false) => {
                    return Err(ScenarioFailure::OutputMismatch {
                        index,
                        have: String::from_utf8_lossy(&have).into_owned(),
                        want: String::from_utf8_lossy(&want).into_owned(),
                    });
                }
                Ok(true) => debug!("output matches golden file"),
            }
        }

        let have = child
            .wait()
            .map_err(|source| ScenarioFailure::Process { index, source })?;
        if have != scenario.expected_exit_code {
            log_stderr(child.as_mut());
            return Err(ScenarioFailure::ExitCode {
                index,
                have,
                want: scenario.expected_exit_code,
            });
        }
        Ok(())
    }
}

fn log_stderr(child: &mut dyn RunningCommand) {
    match child.stderr() {
        Ok(stderr) if !stderr.is_empty() => {
            warn!(
                program = child.program(),
                stderr = %String::from_utf8_lossy(&stderr).trim_end(),
                "application stderr"
            );
        }
        Ok(_) => {}
        Err(err) => debug!(error = %err, "stderr unavailable"),
    }
}
