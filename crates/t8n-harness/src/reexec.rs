//! Run the current executable as something else.
//!
//! A test binary registers one or more named entry points, then calls
//! [`init`] as the very first thing in `main`. When the binary was launched
//! through [`command`] under one of those names, `init` runs the entry point
//! with the process arguments and exits with its code. Otherwise `init`
//! returns and the test suite proceeds as usual.
//!
//! ```no_run
//! use std::ffi::OsString;
//!
//! fn app(_args: Vec<OsString>) -> i32 {
//!     0
//! }
//!
//! fn main() {
//!     t8n_harness::reexec::register("evm-test", app).unwrap();
//!     t8n_harness::reexec::init();
//!     // run tests, spawning `reexec::command("evm-test")` as needed
//! }
//! ```

use std::collections::HashMap;
use std::ffi::OsStr;
use std::ffi::OsString;
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;
use std::sync::RwLock;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use t8n_common::rwlock_read_or_recover;
use t8n_common::rwlock_write_or_recover;
use tracing::debug;

use crate::error::ReexecError;

/// Environment sentinel set on every relaunched child.
///
/// Consulted when `argv[0]` does not name a registered entry point, which is
/// the case on platforms where `argv[0]` cannot be overridden.
pub const ROLE_ENV: &str = "T8N_REEXEC_ROLE";

/// An application entry point. Receives the full argument list, `argv[0]`
/// included, and returns the process exit code.
pub type EntryPoint = fn(Vec<OsString>) -> i32;

/// Named entry points plus a seal that stops registration once dispatch has
/// been decided.
#[derive(Debug, Default)]
pub struct Registry {
    entries: HashMap<String, EntryPoint>,
    sealed: bool,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, entry: EntryPoint) -> Result<(), ReexecError> {
        if self.sealed {
            return Err(ReexecError::Sealed(name.to_string()));
        }
        if self.entries.contains_key(name) {
            return Err(ReexecError::AlreadyRegistered(name.to_string()));
        }
        self.entries.insert(name.to_string(), entry);
        Ok(())
    }

    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Picks the entry point for a process identity.
    ///
    /// The file name of `argv0` is tried first, then the `role` sentinel.
    pub fn resolve(
        &self,
        argv0: Option<&OsStr>,
        role: Option<&OsStr>,
    ) -> Option<(&str, EntryPoint)> {
        let from_argv0 = argv0
            .and_then(|arg| Path::new(arg).file_name())
            .and_then(OsStr::to_str);
        let from_role = role.and_then(OsStr::to_str);

        [from_argv0, from_role]
            .into_iter()
            .flatten()
            .find_map(|name| self.entries.get_key_value(name))
            .map(|(name, entry)| (name.as_str(), *entry))
    }
}

static REGISTRY: OnceLock<RwLock<Registry>> = OnceLock::new();
static INITIALIZED: AtomicBool = AtomicBool::new(false);

fn registry() -> &'static RwLock<Registry> {
    REGISTRY.get_or_init(|| RwLock::new(Registry::new()))
}

/// Registers a process-wide entry point under `name`.
///
/// Must happen before [`init`]; afterwards the registry is sealed.
pub fn register(name: &str, entry: EntryPoint) -> Result<(), ReexecError> {
    rwlock_write_or_recover(registry(), "reexec registry").register(name, entry)
}

/// Returns true when `name` has been registered in this process.
pub fn is_registered(name: &str) -> bool {
    rwlock_read_or_recover(registry(), "reexec registry").contains(name)
}

/// Checks whether this process was launched as a registered entry point.
///
/// On a match the entry point runs and the process exits with its code, so
/// this returns only when there is no match. Only the first call inspects the
/// process and seals the registry; later calls return immediately.
pub fn init() {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    let argv0 = std::env::args_os().next();
    let role = std::env::var_os(ROLE_ENV);

    let matched = {
        let mut registry = rwlock_write_or_recover(registry(), "reexec registry");
        registry.seal();
        registry
            .resolve(argv0.as_deref(), role.as_deref())
            .map(|(name, entry)| (name.to_string(), entry))
    };

    let Some((name, entry)) = matched else {
        return;
    };

    debug!(entry = %name, "dispatching to registered entry point");
    let code = entry(std::env::args_os().collect());
    std::process::exit(code);
}

/// Builds a command that relaunches the current executable as `name`.
pub fn command(name: &str) -> Result<Command, ReexecError> {
    let exe = std::env::current_exe().map_err(ReexecError::CurrentExe)?;
    let mut cmd = Command::new(exe);
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.arg0(name);
    }
    cmd.env(ROLE_ENV, name);
    Ok(cmd)
}
