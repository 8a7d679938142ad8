//! Helper Invoker: a thin shim over the (out-of-scope) subprocess
//! runner collaborator. Two entry points -- `run_and_capture(cmd,
//! timeout)` and a streaming `open_pipe(cmd, timeout)` -- are the only
//! interface this crate depends on. `HelperInvoker` is that interface,
//! injected at `Changer` construction; `ProcessHelperInvoker` is a
//! usable default built on `std::process::Command`.

use std::io::{BufRead, BufReader};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use crate::error::AutochangerFault;

/// Result of a non-streaming helper invocation: exit code plus the
/// full captured stdout+stderr text (the diagnostic payload on
/// failure).
pub struct HelperOutcome {
    pub exit_code: i32,
    pub output: String,
}

impl HelperOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// A streaming handle whose lines get forwarded to the operator as
/// they arrive.
pub trait HelperStream: Send {
    fn next_line(&mut self) -> Result<Option<String>>;
}

/// The subprocess runner collaborator. Out of scope beyond this
/// interface, but a crate that can't actually run anything isn't
/// usable, so a default implementation is supplied below.
pub trait HelperInvoker: Send + Sync {
    fn run_and_capture(&self, cmd: &str, timeout: Duration) -> Result<HelperOutcome>;
    fn open_pipe(&self, cmd: &str, timeout: Duration) -> Result<Box<dyn HelperStream>>;
}

/// Splits a command line into argv the way a literal
/// `Command::new(path).args(&[...])` call would already be split, just
/// parsed out of a single templated string instead. Handles simple
/// single/double quoting; good enough for changer helper scripts,
/// which don't embed shell metacharacters.
fn split_command_line(cmd: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = cmd.chars().peekable();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None => {
                if c == '\'' || c == '"' {
                    quote = Some(c);
                    in_word = true;
                } else if c.is_whitespace() {
                    if in_word {
                        words.push(std::mem::take(&mut current));
                        in_word = false;
                    }
                } else {
                    current.push(c);
                    in_word = true;
                }
            }
        }
    }
    if quote.is_some() {
        return Err(anyhow!(AutochangerFault::Config(format!(
            "unterminated quote in helper command: {}",
            cmd
        ))));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

fn build_command(cmd: &str) -> Result<Command> {
    let mut parts = split_command_line(cmd)?;
    if parts.is_empty() {
        return Err(anyhow!(AutochangerFault::Config("empty helper command".to_string())));
    }
    let program = parts.remove(0);
    let mut command = Command::new(program);
    command.args(parts);
    Ok(command)
}

/// Kills `child` if it's still running after `timeout`, signalling a
/// helper failure (non-zero exit) on the next read/wait.
fn kill_after_timeout(pid: u32, timeout: Duration, done: crossbeam_channel::Receiver<()>) {
    std::thread::spawn(move || {
        if done.recv_timeout(timeout).is_err() {
            #[cfg(unix)]
            {
                let _ = nix::sys::signal::kill(
                    nix::unistd::Pid::from_raw(pid as i32),
                    nix::sys::signal::Signal::SIGKILL,
                );
            }
            let _ = pid; // silence unused warning on non-unix
        }
    });
}

/// Default `HelperInvoker` backed by a real child process.
pub struct ProcessHelperInvoker;

impl HelperInvoker for ProcessHelperInvoker {
    fn run_and_capture(&self, cmd: &str, timeout: Duration) -> Result<HelperOutcome> {
        let mut command = build_command(cmd)?;
        command.stdout(Stdio::piped()).stderr(Stdio::piped());

        let child = command.spawn().map_err(|err| {
            anyhow!(AutochangerFault::Helper(format!("failed to execute '{}': {}", cmd, err)))
        })?;

        let (tx, rx) = crossbeam_channel::bounded(1);
        kill_after_timeout(child.id(), timeout, rx);

        let output = child.wait_with_output().map_err(|err| {
            anyhow!(AutochangerFault::Helper(format!("failed to wait on '{}': {}", cmd, err)))
        })?;
        let _ = tx.send(());

        let (exit_code, output) = crate::tools::command_output(output);
        Ok(HelperOutcome { exit_code, output })
    }

    fn open_pipe(&self, cmd: &str, timeout: Duration) -> Result<Box<dyn HelperStream>> {
        let mut command = build_command(cmd)?;
        command.stdout(Stdio::piped());

        let mut child = command.spawn().map_err(|err| {
            anyhow!(AutochangerFault::Helper(format!("failed to open pipe for '{}': {}", cmd, err)))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            anyhow!(AutochangerFault::Helper("helper produced no stdout handle".to_string()))
        })?;

        Ok(Box::new(ProcessHelperStream {
            child,
            reader: BufReader::new(stdout),
            deadline: Instant::now() + timeout,
        }))
    }
}

struct ProcessHelperStream {
    child: Child,
    reader: BufReader<ChildStdout>,
    deadline: Instant,
}

impl HelperStream for ProcessHelperStream {
    fn next_line(&mut self) -> Result<Option<String>> {
        if Instant::now() > self.deadline {
            let _ = self.child.kill();
            return Err(anyhow!(AutochangerFault::Helper("helper invocation timed out".to_string())));
        }
        let mut line = String::new();
        let n = self
            .reader
            .read_line(&mut line)
            .map_err(|err| anyhow!(AutochangerFault::Helper(format!("failed reading helper output: {}", err))))?;
        if n == 0 {
            let _ = self.child.wait();
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }
}
