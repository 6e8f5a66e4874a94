//! Spawning shell commands for `print | cmd` and `cmd | getline`.
//!
//! Every command gets all three standard streams piped. The streams the
//! evaluator doesn't use are pumped by background threads so a chatty
//! command can't fill a pipe nobody reads:
//!
//! - output pipes: command stdout -> primary output, stderr -> error sink
//! - input pipes: interpreter stdin -> command stdin, stderr -> error sink
//!
//! A forwarder starts with the process and finishes on its own when its
//! source reaches EOF. Output forwarders are joined after the process has
//! been reaped; the stdin forwarder is left detached since it may sit on a
//! terminal that never closes.

use std::io::{self, Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};

use crate::sink::{SharedReader, SharedWriter};

/// A running command and the forwarders that must finish with it
pub struct SubprocessHandle {
    command: String,
    child: Child,
    forwarders: Vec<JoinHandle<()>>,
}

impl SubprocessHandle {
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Reap the process and its output forwarders; returns the exit status
    pub fn wait(mut self) -> io::Result<i32> {
        let status = self.child.wait()?;
        for forwarder in self.forwarders.drain(..) {
            if forwarder.join().is_err() {
                tracing::warn!(command = %self.command, "pipe forwarder panicked");
            }
        }
        tracing::debug!(command = %self.command, %status, "reaped command");
        Ok(exit_code(status))
    }
}

#[cfg(unix)]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => 256 + signal,
        (None, None) => -1,
    }
}

#[cfg(not(unix))]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// Launches commands through a shell and wires up their streams
#[derive(Debug, Clone)]
pub struct SubprocessBridge {
    shell: String,
}

impl Default for SubprocessBridge {
    fn default() -> Self {
        Self::new("sh")
    }
}

impl SubprocessBridge {
    pub fn new(shell: &str) -> Self {
        Self {
            shell: shell.to_string(),
        }
    }

    fn start(&self, command: &str) -> io::Result<Child> {
        Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
    }

    /// Spawn `command` for `print | command`. On failure the error goes to
    /// `errors` and `None` comes back; the caller degrades to a discard sink.
    pub fn spawn_writer(
        &self,
        command: &str,
        output: &SharedWriter,
        errors: &SharedWriter,
    ) -> Option<(SubprocessHandle, ChildStdin)> {
        let mut child = match self.start(command) {
            Ok(child) => child,
            Err(e) => {
                report_spawn_failure(command, &e, errors);
                return None;
            }
        };
        let (Some(stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            report_spawn_failure(command, &io::Error::other("missing pipe"), errors);
            let _ = child.kill();
            let _ = child.wait();
            return None;
        };
        tracing::debug!(command, pid = child.id(), "spawned output command");

        let forwarders = [
            forward("stdout", stdout, output.clone()),
            forward("stderr", stderr, errors.clone()),
        ]
        .into_iter()
        .flatten()
        .collect();

        let handle = SubprocessHandle {
            command: command.to_string(),
            child,
            forwarders,
        };
        Some((handle, stdin))
    }

    /// Spawn `command` for `command | getline`. The interpreter's own stdin
    /// is fed to the command so it can read a document piped to the program.
    pub fn spawn_reader(
        &self,
        command: &str,
        stdin: &SharedReader,
        errors: &SharedWriter,
    ) -> Option<(SubprocessHandle, ChildStdout)> {
        let mut child = match self.start(command) {
            Ok(child) => child,
            Err(e) => {
                report_spawn_failure(command, &e, errors);
                return None;
            }
        };
        let (Some(command_stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            report_spawn_failure(command, &io::Error::other("missing pipe"), errors);
            let _ = child.kill();
            let _ = child.wait();
            return None;
        };
        tracing::debug!(command, pid = child.id(), "spawned input command");

        // Detached: finishes when stdin hits EOF or the command stops reading
        drop(forward("stdin", stdin.clone(), command_stdin));

        let forwarders = forward("stderr", stderr, errors.clone()).into_iter().collect();
        let handle = SubprocessHandle {
            command: command.to_string(),
            child,
            forwarders,
        };
        Some((handle, stdout))
    }
}

fn report_spawn_failure(command: &str, err: &io::Error, errors: &SharedWriter) {
    tracing::warn!(command, error = %err, "can't start command");
    let mut errors = errors.clone();
    let _ = writeln!(errors, "{}", err);
}

/// Copy `from` into `to` on a background thread until EOF; `to` is dropped
/// (closing it, for pipes) when the copy ends
fn forward<R, W>(label: &str, mut from: R, mut to: W) -> Option<JoinHandle<()>>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    let name = format!("pipe-{}", label);
    let spawned = thread::Builder::new().name(name).spawn(move || {
        if let Err(e) = io::copy(&mut from, &mut to) {
            tracing::debug!(error = %e, "pipe forwarder stopped");
        }
        let _ = to.flush();
    });
    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "can't start pipe forwarder");
            None
        }
    }
}
