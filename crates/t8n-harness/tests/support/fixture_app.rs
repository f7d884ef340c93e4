//! Stand-in for the state transition tool.
//!
//! Speaks the real `t8n` command line but computes nothing: the requested
//! output channels echo the inputs back, which is enough to drive the harness
//! against golden files.
//!
//! Exit codes: 3 for an unusable fork configuration, 4 when a transaction
//! reads a block hash (its `blockhash` field names a block number) that the
//! env's `blockHashes` table does not provide, 1 for anything else.

use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use t8n_harness::HarnessConfig;
use thiserror::Error;
use tracing::debug;

const SUPPORTED_FORKS: &[&str] = &[
    "Frontier",
    "Homestead",
    "EIP150",
    "EIP158",
    "Byzantium",
    "Constantinople",
    "ConstantinopleFix",
    "Istanbul",
    "Berlin",
    "London",
];

#[derive(Parser)]
#[command(name = "evm", about = "Stand-in state transition tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply transactions to a state snapshot.
    #[command(name = "t8n")]
    T8n(T8nArgs),
}

#[derive(Args)]
struct T8nArgs {
    #[arg(long = "input.alloc", default_value = "alloc.json")]
    input_alloc: PathBuf,

    #[arg(long = "input.txs", default_value = "txs.json")]
    input_txs: PathBuf,

    #[arg(long = "input.env", default_value = "env.json")]
    input_env: PathBuf,

    #[arg(long = "state.fork", default_value = "London")]
    fork: String,

    #[arg(long = "state.reward")]
    reward: Option<String>,

    #[arg(long = "output.alloc", default_value = "alloc.json")]
    output_alloc: String,

    #[arg(long = "output.result", default_value = "result.json")]
    output_result: String,

    /// Not written unless asked for.
    #[arg(long = "output.body")]
    output_body: Option<String>,
}

#[derive(Error, Debug)]
enum AppError {
    #[error("unsupported fork: {0}")]
    UnsupportedFork(String),

    #[error("missing blockhash for block {0}")]
    MissingBlockHash(String),

    #[error("failed reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed parsing {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}: signed transactions must be a 0x-prefixed hex string", path.display())]
    SignedTxs { path: PathBuf },

    #[error("failed writing {dest}: {source}")]
    Write {
        dest: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed encoding output: {0}")]
    Encode(#[from] serde_json::Error),
}

impl AppError {
    fn exit_code(&self) -> i32 {
        match self {
            AppError::UnsupportedFork(_) => 3,
            AppError::MissingBlockHash(_) => 4,
            _ => 1,
        }
    }
}

pub fn run(args: Vec<OsString>) -> i32 {
    let config = HarnessConfig::from_env().unwrap_or_default();
    let _telemetry = t8n_common::init_tracing(&config.log_level, config.log_file.as_deref());

    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return err.exit_code();
        }
    };

    let Commands::T8n(args) = cli.command;
    match transition(&args) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Error: {err}");
            err.exit_code()
        }
    }
}

fn transition(args: &T8nArgs) -> Result<(), AppError> {
    if !SUPPORTED_FORKS.contains(&args.fork.as_str()) {
        return Err(AppError::UnsupportedFork(args.fork.clone()));
    }

    let alloc = read_json(&args.input_alloc)?;
    let env = read_json(&args.input_env)?;
    let txs = read_txs(&args.input_txs)?;
    debug!(fork = %args.fork, "inputs loaded");
    check_block_hashes(&env, &txs)?;

    let result = json!({
        "fork": args.fork,
        "reward": args.reward,
        "env": env,
        "txs": txs,
    });

    let mut combined = Map::new();
    emit("alloc", &args.output_alloc, alloc, &mut combined)?;
    emit("result", &args.output_result, result, &mut combined)?;
    emit(
        "body",
        args.output_body.as_deref().unwrap_or(""),
        txs,
        &mut combined,
    )?;

    if !combined.is_empty() {
        println!("{}", serde_json::to_string_pretty(&Value::Object(combined))?);
    }
    Ok(())
}

fn read_json(path: &Path) -> Result<Value, AppError> {
    let bytes = fs::read(path).map_err(|source| AppError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| AppError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// A `.rlp` file holds already-signed transactions as one JSON hex string.
fn read_txs(path: &Path) -> Result<Value, AppError> {
    let txs = read_json(path)?;
    let is_rlp = path.extension().is_some_and(|ext| ext == "rlp");
    if is_rlp && !txs.as_str().is_some_and(|s| s.starts_with("0x")) {
        return Err(AppError::SignedTxs {
            path: path.to_path_buf(),
        });
    }
    Ok(txs)
}

fn check_block_hashes(env: &Value, txs: &Value) -> Result<(), AppError> {
    let Some(txs) = txs.as_array() else {
        return Ok(());
    };
    let known = env.get("blockHashes").and_then(Value::as_object);
    for number in txs.iter().filter_map(|tx| tx.get("blockhash")?.as_str()) {
        if !known.is_some_and(|hashes| hashes.contains_key(number)) {
            return Err(AppError::MissingBlockHash(number.to_string()));
        }
    }
    Ok(())
}

fn emit(
    channel: &str,
    dest: &str,
    document: Value,
    combined: &mut Map<String, Value>,
) -> Result<(), AppError> {
    match dest {
        "" => {}
        "stdout" => {
            combined.insert(channel.to_string(), document);
        }
        path => {
            let text = serde_json::to_string_pretty(&document)?;
            fs::write(path, text).map_err(|source| AppError::Write {
                dest: path.to_string(),
                source,
            })?;
        }
    }
    Ok(())
}
