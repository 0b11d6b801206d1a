//! Test doubles for provisioning unit tests.
//!
//! Provisioning talks to the outside world through two seams: the
//! [`CommandRunner`] that runs configure/make/npm/bower, and the
//! [`Downloader`] that fetches tarballs. This module provides recording
//! mocks for both.
//!
//! # Example
//!
//! ```rust,ignore
//! use virtual_node::test_support::{MockRunner, MockProcessOutput};
//!
//! let runner = MockRunner::new();
//! runner.expect_suffix("bin/node --version", MockProcessOutput::success("v0.8.11"));
//! runner.set_default(MockProcessOutput::success(""));
//! ```

pub mod fixtures;

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{bail, Result};
use url::Url;

use crate::sources::Downloader;
use crate::util::process::{CommandOutput, CommandRunner, ProcessBuilder, ProcessError};

pub use fixtures::*;

/// Mock process output for testing command execution.
#[derive(Debug, Clone)]
pub struct MockProcessOutput {
    /// Exit status code (0 = success).
    pub status: i32,
    /// Combined output.
    pub stdout: String,
}

impl MockProcessOutput {
    /// Create a successful output with the given stdout.
    pub fn success(stdout: impl Into<String>) -> Self {
        MockProcessOutput {
            status: 0,
            stdout: stdout.into(),
        }
    }

    /// Create a failure output with the given output and status code.
    pub fn failure(status: i32, stdout: impl Into<String>) -> Self {
        MockProcessOutput {
            status,
            stdout: stdout.into(),
        }
    }

    fn lines(&self) -> Vec<String> {
        self.stdout.lines().map(str::to_string).collect()
    }
}

impl Default for MockProcessOutput {
    fn default() -> Self {
        MockProcessOutput::success("")
    }
}

/// Pattern for matching commands in MockRunner.
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Exact match on full command string.
    Exact(String),
    /// Match if command starts with prefix.
    StartsWith(String),
    /// Match if command ends with suffix.
    EndsWith(String),
    /// Match if command contains substring.
    Contains(String),
    /// Match using a regex pattern.
    Regex(String),
    /// Match any command.
    Any,
}

impl CommandPattern {
    /// Check if this pattern matches the given command.
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::Exact(s) => cmd == s,
            CommandPattern::StartsWith(s) => cmd.starts_with(s),
            CommandPattern::EndsWith(s) => cmd.ends_with(s),
            CommandPattern::Contains(s) => cmd.contains(s),
            CommandPattern::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(cmd))
                .unwrap_or(false),
            CommandPattern::Any => true,
        }
    }
}

/// Expectation for a command execution.
#[derive(Debug, Clone)]
pub struct CommandExpectation {
    pub pattern: CommandPattern,
    pub output: MockProcessOutput,
    /// Number of times this expectation can be used (None = unlimited).
    pub times: Option<usize>,
    pub used: usize,
}

impl CommandExpectation {
    pub fn new(pattern: CommandPattern, output: MockProcessOutput) -> Self {
        CommandExpectation {
            pattern,
            output,
            times: None,
            used: 0,
        }
    }

    /// Set the number of times this expectation can be used.
    pub fn times(mut self, n: usize) -> Self {
        self.times = Some(n);
        self
    }

    fn available(&self) -> bool {
        match self.times {
            Some(n) => self.used < n,
            None => true,
        }
    }
}

/// A command as the mock saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Program and arguments joined with single spaces.
    pub command: String,
    pub cwd: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
struct RunnerState {
    expectations: Vec<CommandExpectation>,
    calls: Vec<RecordedCall>,
    default_output: Option<MockProcessOutput>,
}

/// Recording [`CommandRunner`].
///
/// Commands are matched against expectations in registration order. A
/// command that matches nothing (and no default is set) fails as if the
/// program could not be spawned.
#[derive(Debug, Default)]
pub struct MockRunner {
    state: Mutex<RunnerState>,
}

impl MockRunner {
    pub fn new() -> Self {
        MockRunner::default()
    }

    /// Add a custom expectation.
    pub fn expect_pattern(&self, expectation: CommandExpectation) -> &Self {
        self.state.lock().unwrap().expectations.push(expectation);
        self
    }

    /// Add an expectation for an exact command match.
    pub fn expect(&self, cmd: &str, output: MockProcessOutput) -> &Self {
        self.expect_pattern(CommandExpectation::new(
            CommandPattern::Exact(cmd.to_string()),
            output,
        ))
    }

    /// Add an expectation for a command ending with a suffix.
    pub fn expect_suffix(&self, suffix: &str, output: MockProcessOutput) -> &Self {
        self.expect_pattern(CommandExpectation::new(
            CommandPattern::EndsWith(suffix.to_string()),
            output,
        ))
    }

    /// Set a default output for commands that don't match any expectation.
    pub fn set_default(&self, output: MockProcessOutput) -> &Self {
        self.state.lock().unwrap().default_output = Some(output);
        self
    }

    /// All calls, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Just the command strings of all calls.
    pub fn commands(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.command).collect()
    }

    /// Number of calls whose command contains `needle`.
    pub fn count_containing(&self, needle: &str) -> usize {
        self.commands().iter().filter(|c| c.contains(needle)).count()
    }

    /// Verify that all expectations with a specific count were satisfied.
    pub fn verify(&self) -> Result<()> {
        let state = self.state.lock().unwrap();
        for (i, exp) in state.expectations.iter().enumerate() {
            if let Some(expected) = exp.times {
                if exp.used != expected {
                    bail!(
                        "expectation {} was used {} times, expected {}",
                        i,
                        exp.used,
                        expected
                    );
                }
            }
        }
        Ok(())
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, cmd: &ProcessBuilder) -> Result<CommandOutput, ProcessError> {
        let full_cmd = std::iter::once(cmd.get_program().display().to_string())
            .chain(cmd.get_args().iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");

        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall {
            command: full_cmd.clone(),
            cwd: cmd.get_cwd().map(|p| p.to_path_buf()),
            env: cmd.get_env().clone(),
        });

        let mut matched = None;
        for exp in &mut state.expectations {
            if exp.pattern.matches(&full_cmd) && exp.available() {
                exp.used += 1;
                matched = Some(exp.output.clone());
                break;
            }
        }

        let output = match matched.or_else(|| state.default_output.clone()) {
            Some(output) => output,
            None => {
                return Err(ProcessError::Spawn {
                    command: cmd.display_command(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("unexpected command: {}", full_cmd),
                    ),
                })
            }
        };

        if output.status != 0 {
            return Err(ProcessError::Failed {
                command: cmd.display_command(),
                code: Some(output.status),
                output: output.lines(),
            });
        }

        Ok(CommandOutput {
            code: 0,
            lines: output.lines(),
        })
    }
}

/// Mock HTTP response for testing downloads.
#[derive(Debug, Clone)]
pub struct MockHttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl MockHttpResponse {
    /// Create a successful response with the given body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        MockHttpResponse {
            status: 200,
            body: body.into(),
        }
    }

    /// Create a not found response.
    pub fn not_found() -> Self {
        MockHttpResponse {
            status: 404,
            body: b"Not Found".to_vec(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Recording [`Downloader`] serving canned responses by URL.
#[derive(Debug, Default)]
pub struct MockDownloader {
    responses: Mutex<HashMap<String, MockHttpResponse>>,
    requests: Mutex<Vec<String>>,
    default_response: Mutex<Option<MockHttpResponse>>,
}

impl MockDownloader {
    pub fn new() -> Self {
        MockDownloader::default()
    }

    /// Add a response for a URL.
    pub fn mock_url(&self, url: &str, response: MockHttpResponse) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
        self
    }

    /// Set a default response for unmatched URLs.
    pub fn set_default(&self, response: MockHttpResponse) -> &Self {
        *self.default_response.lock().unwrap() = Some(response);
        self
    }

    /// Get all requested URLs.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Downloader for MockDownloader {
    fn download(&self, url: &Url, dest: &mut dyn Write) -> Result<u64> {
        self.requests.lock().unwrap().push(url.to_string());

        let response = self
            .responses
            .lock()
            .unwrap()
            .get(url.as_str())
            .cloned()
            .or_else(|| self.default_response.lock().unwrap().clone());

        let Some(response) = response else {
            bail!("no mock response for URL: {}", url);
        };
        if !response.is_success() {
            bail!("failed to download {}: HTTP {}", url, response.status);
        }

        dest.write_all(&response.body)?;
        Ok(response.body.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_runner_matches_in_order() {
        let runner = MockRunner::new();
        runner.expect_pattern(
            CommandExpectation::new(
                CommandPattern::StartsWith("make".into()),
                MockProcessOutput::failure(2, "boom"),
            )
            .times(1),
        );
        runner.set_default(MockProcessOutput::success("ok"));

        let first = runner.run(&ProcessBuilder::new("make")).unwrap_err();
        assert_eq!(first.exit_code(), Some(2));

        let second = runner.run(&ProcessBuilder::new("make")).unwrap();
        assert_eq!(second.lines, vec!["ok"]);

        assert_eq!(runner.commands(), vec!["make", "make"]);
        runner.verify().unwrap();
    }

    #[test]
    fn test_mock_runner_unexpected_command() {
        let runner = MockRunner::new();
        let err = runner
            .run(&ProcessBuilder::new("bower").arg("install"))
            .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }

    #[test]
    fn test_command_pattern_regex() {
        let pattern = CommandPattern::Regex(r"^make( -j \d+)?$".to_string());
        assert!(pattern.matches("make"));
        assert!(pattern.matches("make -j 4"));
        assert!(!pattern.matches("make install"));
    }

    #[test]
    fn test_mock_downloader() {
        let downloader = MockDownloader::new();
        downloader.mock_url("https://example.com/a.tar.gz", MockHttpResponse::ok(b"abc".to_vec()));

        let mut buf = Vec::new();
        let n = downloader
            .download(&Url::parse("https://example.com/a.tar.gz").unwrap(), &mut buf)
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(buf, b"abc");

        let missing = downloader.download(&Url::parse("https://example.com/b").unwrap(), &mut buf);
        assert!(missing.is_err());
        assert_eq!(downloader.requests().len(), 2);
    }
}
