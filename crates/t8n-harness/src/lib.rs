#![deny(clippy::all)]

pub mod args;
pub mod command;
pub mod config;
mod error;
pub mod json_cmp;
pub mod reexec;
pub mod scenario;

pub use args::InputSpec;
pub use args::OutputSpec;
pub use args::T8N_SUBCOMMAND;
pub use command::ExecutionResult;
pub use command::Launcher;
pub use command::ReexecLauncher;
pub use command::RunningCommand;
pub use config::HarnessConfig;
pub use error::CommandError;
pub use error::ConfigError;
pub use error::HarnessError;
pub use error::JsonCompareError;
pub use error::ReexecError;
pub use error::Side;
pub use json_cmp::JsonValue;
pub use json_cmp::compare_json;
pub use scenario::Scenario;
pub use scenario::ScenarioFailure;
pub use scenario::ScenarioOutcome;
pub use scenario::ScenarioReport;
pub use scenario::ScenarioRunner;

pub type Result<T> = std::result::Result<T, HarnessError>;
