//! Subprocess execution utilities.
//!
//! Commands are spawned directly from an argument vector; nothing is ever
//! passed through a shell. Combined stdout/stderr is streamed line by line
//! into the log while also being collected for the caller.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;

/// Tokens longer than this are elided in displayed command lines.
pub const DISPLAY_TOKEN_LIMIT: usize = 45;

/// Characters kept on each side of an elided token.
const DISPLAY_KEEP: usize = 20;

/// Error raised while running an external command.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error while running `{command}`")]
    Io {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("command `{command}` failed with {}", describe_exit(.code))]
    Failed {
        command: String,
        code: Option<i32>,
        output: Vec<String>,
    },
}

impl ProcessError {
    /// Exit code, when the process ran and exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ProcessError::Failed { code, .. } => *code,
            _ => None,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "termination by signal".to_string(),
    }
}

/// Result of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code (always 0 for commands returned through `Ok`).
    pub code: i32,
    /// Combined stdout/stderr, one entry per line, trailing whitespace trimmed.
    pub lines: Vec<String>,
}

impl CommandOutput {
    /// First non-empty output line, trimmed.
    pub fn first_line(&self) -> Option<&str> {
        self.lines
            .iter()
            .map(|l| l.trim())
            .find(|l| !l.is_empty())
    }
}

/// Something that can run a [`ProcessBuilder`].
///
/// Every external invocation made during provisioning goes through this
/// trait so the whole run can be exercised against a recording double.
pub trait CommandRunner {
    fn run(&self, cmd: &ProcessBuilder) -> Result<CommandOutput, ProcessError>;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &ProcessBuilder) -> Result<CommandOutput, ProcessError> {
        cmd.exec_streaming()
    }
}

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    cwd: Option<PathBuf>,
    quiet: bool,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
            quiet: false,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable on top of the inherited environment.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Log output at debug level and skip replaying it on failure.
    ///
    /// Used for probes whose failure is an expected outcome.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Get the program path.
    pub fn get_program(&self) -> &Path {
        &self.program
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Get the extra environment variables.
    pub fn get_env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Get the working directory.
    pub fn get_cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Build the Command.
    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Run to completion, streaming combined output into the log.
    pub fn exec_streaming(&self) -> Result<CommandOutput, ProcessError> {
        let command = self.display_command();
        tracing::debug!("Running command {}", command);

        let io_err = |source: io::Error| ProcessError::Io {
            command: command.clone(),
            source,
        };

        let (reader, writer) = io::pipe().map_err(io_err)?;

        // The Command holds the write end; it must be dropped before reading
        // or the pipe never reaches EOF.
        let mut child = {
            let mut cmd = self.build_command();
            let stderr = writer.try_clone().map_err(io_err)?;
            cmd.stdin(Stdio::null()).stdout(writer).stderr(stderr);
            cmd.spawn().map_err(|source| ProcessError::Spawn {
                command: command.clone(),
                source,
            })?
        };

        let mut lines = Vec::new();
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).map_err(io_err)? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf).trim_end().to_string();
            if self.quiet {
                tracing::debug!("{}", line);
            } else {
                tracing::info!("{}", line);
            }
            lines.push(line);
        }

        let status = child.wait().map_err(io_err)?;

        if !status.success() {
            if !self.quiet {
                for line in &lines {
                    tracing::error!("{}", line);
                }
            }
            return Err(ProcessError::Failed {
                command,
                code: status.code(),
                output: lines,
            });
        }

        Ok(CommandOutput {
            code: status.code().unwrap_or(0),
            lines,
        })
    }

    /// Display the command for logs and error messages.
    ///
    /// Long tokens are elided and tokens with whitespace or quotes are
    /// quoted. The executed argument vector is never affected.
    pub fn display_command(&self) -> String {
        let program = self.program.display().to_string();
        std::iter::once(program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(display_token)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Format one command token for display.
pub fn display_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    let mut part = if chars.len() > DISPLAY_TOKEN_LIMIT {
        let head: String = chars[..DISPLAY_KEEP].iter().collect();
        let tail: String = chars[chars.len() - DISPLAY_KEEP..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        token.to_string()
    };

    if part.contains(|c: char| matches!(c, ' ' | '\n' | '"' | '\'')) {
        part = format!("\"{}\"", part.replace('"', "\\\""));
    }

    part
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}
