use std::ffi::OsString;
use std::io;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use wait_timeout::ChildExt;

use crate::errors::MenuError;

/// Seam between command adapters (`virsh`, `ps`) and real processes.
pub trait CommandRunner {
    /// Run to completion and return captured output. Non-zero exit is an error.
    fn run(&self, request: ExecRequest) -> Result<ExecOutput, MenuError>;
}

/// Blocking command execution with a timeout and captured output.
#[derive(Debug, Clone)]
pub struct ExecService {
    default_timeout: Duration,
}

impl ExecService {
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }
}

impl Default for ExecService {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl CommandRunner for ExecService {
    fn run(&self, request: ExecRequest) -> Result<ExecOutput, MenuError> {
        let program = request.program_display();
        let mut cmd = Command::new(&request.program);
        cmd.args(&request.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in &request.env {
            cmd.env(key, value);
        }

        tracing::debug!(program = %program, args = ?request.args, "spawning");
        let mut child = cmd.spawn().map_err(|source| MenuError::Spawn {
            program: program.clone(),
            source,
        })?;

        // Drain pipes on helper threads so a chatty child cannot block on a full pipe
        // while we wait on it.
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let stdout_reader = std::thread::spawn(move || read_stream(stdout_pipe));
        let stderr_reader = std::thread::spawn(move || read_stream(stderr_pipe));

        let timeout = request.timeout.unwrap_or(self.default_timeout);
        let started = Instant::now();
        let status = match child.wait_timeout(timeout)? {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(MenuError::CommandTimeout {
                    program,
                    secs: timeout.as_secs(),
                });
            }
        };
        let duration = started.elapsed();

        let stdout = stdout_reader
            .join()
            .map_err(|_| io::Error::other("stdout reader panicked"))??;
        let stderr = stderr_reader
            .join()
            .map_err(|_| io::Error::other("stderr reader panicked"))??;

        tracing::debug!(program = %program, ?duration, code = ?status.code(), "finished");
        if !status.success() {
            return Err(MenuError::CommandFailed {
                program,
                code: status.code().unwrap_or(-1),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(ExecOutput {
            duration,
            stdout,
            stderr,
        })
    }
}

fn read_stream(stream: Option<impl io::Read>) -> io::Result<String> {
    let mut buf = Vec::new();
    if let Some(mut reader) = stream {
        reader.read_to_end(&mut buf)?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[derive(Debug, Default, Clone)]
pub struct ExecRequest {
    program: OsString,
    args: Vec<OsString>,
    env: Vec<(OsString, OsString)>,
    timeout: Option<Duration>,
}

impl ExecRequest {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn program_display(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// Program and arguments joined with spaces, for logs and test matching.
    pub fn command_line(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|s| s.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    pub duration: Duration,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn from_stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            ..Self::default()
        }
    }
}

/// Canned runner for adapter unit tests: maps a full command line to its result.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct ScriptedRunner {
    outputs: std::collections::HashMap<String, Result<String, (i32, String)>>,
}

#[cfg(test)]
impl ScriptedRunner {
    pub(crate) fn ok(mut self, command_line: &str, stdout: &str) -> Self {
        self.outputs
            .insert(command_line.to_string(), Ok(stdout.to_string()));
        self
    }

    pub(crate) fn fail(mut self, command_line: &str, code: i32, stderr: &str) -> Self {
        self.outputs
            .insert(command_line.to_string(), Err((code, stderr.to_string())));
        self
    }
}

#[cfg(test)]
impl CommandRunner for ScriptedRunner {
    fn run(&self, request: ExecRequest) -> Result<ExecOutput, MenuError> {
        match self.outputs.get(&request.command_line()) {
            Some(Ok(stdout)) => Ok(ExecOutput::from_stdout(stdout.clone())),
            Some(Err((code, stderr))) => Err(MenuError::CommandFailed {
                program: request.program_display(),
                code: *code,
                stderr: stderr.clone(),
            }),
            None => Err(MenuError::Spawn {
                program: request.program_display(),
                source: io::Error::new(io::ErrorKind::NotFound, "not scripted"),
            }),
        }
    }
}
