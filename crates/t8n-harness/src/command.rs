use std::io::Read;
use std::process::Child;
use std::process::ExitStatus;
use std::process::Stdio;
use std::thread::JoinHandle;

use tracing::debug;
use tracing::warn;

use crate::error::CommandError;
use crate::error::ReexecError;
use crate::reexec;

/// Everything a finished child left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub output: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// A child process that has been started but not necessarily finished.
pub trait RunningCommand {
    fn program(&self) -> &str;

    /// Captured stdout. Blocks until the child closes its stdout.
    fn output(&mut self) -> Result<Vec<u8>, CommandError>;

    /// Captured stderr. Blocks until the child closes its stderr.
    fn stderr(&mut self) -> Result<Vec<u8>, CommandError>;

    /// Blocks until the child exits and returns its exit code.
    fn wait(&mut self) -> Result<i32, CommandError>;

    fn finish(mut self: Box<Self>) -> Result<ExecutionResult, CommandError> {
        let output = self.output()?;
        let stderr = self.stderr()?;
        let exit_code = self.wait()?;
        Ok(ExecutionResult {
            exit_code,
            output,
            stderr,
        })
    }
}

/// Starts programs by identity. Must not wait for the child.
pub trait Launcher {
    fn launch(
        &self,
        program: &str,
        args: &[String],
    ) -> Result<Box<dyn RunningCommand>, CommandError>;
}

/// Launches the current executable under a [`reexec`] identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReexecLauncher;

impl Launcher for ReexecLauncher {
    fn launch(
        &self,
        program: &str,
        args: &[String],
    ) -> Result<Box<dyn RunningCommand>, CommandError> {
        // An unknown identity would relaunch this binary as the test runner.
        if !reexec::is_registered(program) {
            warn!(program, "refusing to launch an unregistered identity");
            return Err(ReexecError::NotRegistered(program.to_string()).into());
        }

        let mut child = reexec::command(program)?
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CommandError::Spawn {
                program: program.to_string(),
                source,
            })?;

        debug!(program, pid = child.id(), "spawned child");

        let stdout = Capture::start(child.stdout.take(), "stdout");
        let stderr = Capture::start(child.stderr.take(), "stderr");

        Ok(Box::new(ReexecChild {
            program: program.to_string(),
            child,
            stdout,
            stderr,
            exit_code: None,
        }))
    }
}

/// Drains one pipe on its own thread so the child never blocks on a full pipe.
struct Capture {
    stream: &'static str,
    handle: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    bytes: Vec<u8>,
}

impl Capture {
    fn start<R>(pipe: Option<R>, stream: &'static str) -> Self
    where
        R: Read + Send + 'static,
    {
        let handle = pipe.map(|mut pipe| {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                pipe.read_to_end(&mut buf)?;
                Ok(buf)
            })
        });
        Self {
            stream,
            handle,
            bytes: Vec::new(),
        }
    }

    fn collect(&mut self, program: &str) -> Result<Vec<u8>, CommandError> {
        if let Some(handle) = self.handle.take() {
            self.bytes = handle
                .join()
                .map_err(|_| CommandError::CaptureLost {
                    program: program.to_string(),
                    stream: self.stream,
                })?
                .map_err(|source| CommandError::Read {
                    program: program.to_string(),
                    stream: self.stream,
                    source,
                })?;
        }
        Ok(self.bytes.clone())
    }
}

struct ReexecChild {
    program: String,
    child: Child,
    stdout: Capture,
    stderr: Capture,
    exit_code: Option<i32>,
}

impl RunningCommand for ReexecChild {
    fn program(&self) -> &str {
        &self.program
    }

    fn output(&mut self) -> Result<Vec<u8>, CommandError> {
        self.stdout.collect(&self.program)
    }

    fn stderr(&mut self) -> Result<Vec<u8>, CommandError> {
        self.stderr.collect(&self.program)
    }

    fn wait(&mut self) -> Result<i32, CommandError> {
        if let Some(code) = self.exit_code {
            return Ok(code);
        }
        let status = self.child.wait().map_err(|source| CommandError::Wait {
            program: self.program.clone(),
            source,
        })?;
        let code = exit_code(status);
        debug!(program = %self.program, code, "child exited");
        self.exit_code = Some(code);
        Ok(code)
    }
}

impl Drop for ReexecChild {
    fn drop(&mut self) {
        if self.exit_code.is_none() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Signal-terminated children report -1.
fn exit_code(status: ExitStatus) -> i32 {
    match status.code() {
        Some(code) => code,
        None => {
            warn!(%status, "child terminated without an exit code");
            -1
        }
    }
}
