//! User-facing status output and download progress.
//!
//! Diagnostics go through `tracing`; the shell is only for the handful of
//! milestone lines a user watches during a provision run:
//!
//! ```text
//!    Resolving node 0.8.11 (default)
//!     Fetching node 0.8.11 from https://nodejs.org/dist/
//!    Compiling node 0.8.11
//!     Finished node 0.8.11 in 4.1m
//! ```
//!
//! In JSON mode no human output is produced; callers emit events with
//! [`Shell::json_event`] instead.

use std::fmt::Display;
use std::io::{self, IsTerminal, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

/// Shell output mode - Human and Json are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellMode {
    /// Human-readable output with optional colors and progress bars.
    Human {
        verbosity: Verbosity,
        color: ColorChoice,
    },
    /// Machine-readable JSON output only.
    Json,
}

impl Default for ShellMode {
    fn default() -> Self {
        ShellMode::Human {
            verbosity: Verbosity::Normal,
            color: ColorChoice::Auto,
        }
    }
}

/// Output verbosity level (Human mode only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// --quiet: no status lines, no progress
    Quiet,
    #[default]
    Normal,
    /// --verbose: no progress bars, tool output is logged instead
    Verbose,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Detect TTY and use colors if available.
    #[default]
    Auto,
    Always,
    Never,
}

impl std::str::FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            _ => Err(format!(
                "invalid color choice '{}'; expected 'auto', 'always', or 'never'",
                s
            )),
        }
    }
}

/// Status types for output messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    // Success statuses (green)
    Finished,
    Installed,
    Removed,

    // In-progress statuses (cyan)
    Resolving,
    Fetching,
    Configuring,
    Compiling,
    Installing,

    Info,

    // Warning statuses (yellow)
    Skipped,
    Warning,
}

impl Status {
    fn as_str(&self) -> &'static str {
        match self {
            Status::Finished => "Finished",
            Status::Installed => "Installed",
            Status::Removed => "Removed",
            Status::Resolving => "Resolving",
            Status::Fetching => "Fetching",
            Status::Configuring => "Configuring",
            Status::Compiling => "Compiling",
            Status::Installing => "Installing",
            Status::Info => "Info",
            Status::Skipped => "Skipped",
            Status::Warning => "Warning",
        }
    }

    fn color_code(&self) -> &'static str {
        match self {
            Status::Finished | Status::Installed | Status::Removed => "\x1b[1;32m",
            Status::Resolving
            | Status::Fetching
            | Status::Configuring
            | Status::Compiling
            | Status::Installing => "\x1b[1;36m",
            Status::Info => "\x1b[1;34m",
            Status::Skipped | Status::Warning => "\x1b[1;33m",
        }
    }
}

/// Right-alignment width of the status column.
const STATUS_WIDTH: usize = 12;

/// Central shell for all CLI output.
#[derive(Debug)]
pub struct Shell {
    mode: ShellMode,
    use_color: bool,
}

impl Shell {
    pub fn new(mode: ShellMode) -> Self {
        let use_color = match &mode {
            ShellMode::Json => false,
            ShellMode::Human { color, .. } => match color {
                ColorChoice::Auto => io::stderr().is_terminal(),
                ColorChoice::Always => true,
                ColorChoice::Never => false,
            },
        };

        Shell { mode, use_color }
    }

    /// Create a shell from CLI flags.
    ///
    /// JSON mode takes precedence over quiet/verbose.
    pub fn from_flags(
        quiet: bool,
        verbose: bool,
        color: ColorChoice,
        message_format_json: bool,
    ) -> Self {
        let mode = if message_format_json {
            ShellMode::Json
        } else {
            let verbosity = if quiet {
                Verbosity::Quiet
            } else if verbose {
                Verbosity::Verbose
            } else {
                Verbosity::Normal
            };
            ShellMode::Human { verbosity, color }
        };

        Shell::new(mode)
    }

    /// A shell that prints nothing, for library callers and tests.
    pub fn silent() -> Self {
        Shell::new(ShellMode::Human {
            verbosity: Verbosity::Quiet,
            color: ColorChoice::Never,
        })
    }

    pub fn is_quiet(&self) -> bool {
        matches!(
            self.mode,
            ShellMode::Human {
                verbosity: Verbosity::Quiet,
                ..
            }
        )
    }

    pub fn is_verbose(&self) -> bool {
        matches!(
            self.mode,
            ShellMode::Human {
                verbosity: Verbosity::Verbose,
                ..
            }
        )
    }

    pub fn is_json(&self) -> bool {
        matches!(self.mode, ShellMode::Json)
    }

    /// Print a status line to stderr.
    ///
    /// Format: `{status:>12} {message}`. Nothing is printed in quiet or
    /// JSON mode; fatal errors are reported by the binary itself.
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.is_json() || self.is_quiet() {
            return;
        }

        eprintln!("{} {}", self.format_status(status), msg);
    }

    pub fn note(&self, msg: impl Display) {
        self.status(Status::Info, msg);
    }

    /// Warnings still print under `--quiet`.
    pub fn warn(&self, msg: impl Display) {
        if self.is_json() {
            return;
        }

        eprintln!("{} {}", self.format_status(Status::Warning), msg);
    }

    /// Print a JSON event to stdout. Ignored in human mode.
    pub fn json_event(&self, event: &serde_json::Value) {
        if !self.is_json() {
            return;
        }

        let json_str = serde_json::to_string(event).unwrap_or_default();
        println!("{}", json_str);
        let _ = io::stdout().flush();
    }

    fn format_status(&self, status: Status) -> String {
        let text = status.as_str();

        if self.use_color {
            format!(
                "{}{:>width$}\x1b[0m",
                status.color_code(),
                text,
                width = STATUS_WIDTH
            )
        } else {
            format!("{:>width$}", text, width = STATUS_WIDTH)
        }
    }

    /// Start a timed step.
    ///
    /// The start line is printed immediately; the `Finished` line with the
    /// elapsed time is printed by [`Span::finish`]. A span dropped without
    /// finishing prints nothing more.
    pub fn span(self: &Arc<Self>, status: Status, msg: impl Display) -> Span {
        let message = msg.to_string();
        self.status(status, &message);
        Span {
            shell: Arc::clone(self),
            message,
            start: Instant::now(),
        }
    }

    /// Create a byte-based progress bar for downloads.
    ///
    /// Quiet, verbose and JSON modes get no bar. JSON mode emits one
    /// `download-progress` event when the download finishes.
    pub fn bytes_progress(self: &Arc<Self>, msg: impl Display, total_bytes: u64) -> Progress {
        Progress::new(Arc::clone(self), total_bytes, msg.to_string())
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell::new(ShellMode::default())
    }
}

/// A timed step started with [`Shell::span`].
pub struct Span {
    shell: Arc<Shell>,
    message: String,
    start: Instant,
}

impl Span {
    /// Print the `Finished` line with the elapsed time.
    pub fn finish(self) {
        let elapsed = self.start.elapsed();
        self.shell.status(
            Status::Finished,
            format!("{} in {}", self.message, format_duration(elapsed)),
        );
    }
}

/// Progress bar wrapper that respects shell mode.
pub struct Progress {
    shell: Arc<Shell>,
    pb: Option<ProgressBar>,
    total: u64,
    current: u64,
    message: String,
}

impl Progress {
    fn new(shell: Arc<Shell>, total: u64, message: String) -> Self {
        let pb = if shell.is_quiet() || shell.is_verbose() || shell.is_json() {
            None
        } else if total > 1 {
            let pb = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes}")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb.set_message(message.clone());
            Some(pb)
        } else {
            // Unknown length
            let pb = ProgressBar::new_spinner();
            pb.set_message(message.clone());
            Some(pb)
        };

        Progress {
            shell,
            pb,
            total,
            current: 0,
            message,
        }
    }

    pub fn inc(&mut self, delta: u64) {
        self.current += delta;
        if let Some(pb) = &self.pb {
            pb.inc(delta);
        }
    }

    pub fn finish(&self) {
        if let Some(pb) = &self.pb {
            pb.finish_and_clear();
        }

        if self.shell.is_json() {
            let event = serde_json::json!({
                "reason": "download-progress",
                "current": self.current,
                "total": self.total,
                "unit": "bytes",
                "message": self.message
            });
            self.shell.json_event(&event);
        }
    }

    pub fn position(&self) -> u64 {
        self.current
    }
}

/// Format a duration in a human-readable way.
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 60.0 {
        format!("{:.2}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_modes() {
        let shell = Shell::new(ShellMode::Human {
            verbosity: Verbosity::Normal,
            color: ColorChoice::Never,
        });
        assert!(!shell.is_quiet());
        assert!(!shell.is_verbose());
        assert!(!shell.is_json());

        assert!(Shell::silent().is_quiet());
        assert!(Shell::new(ShellMode::Json).is_json());
    }

    #[test]
    fn test_color_choice_parse() {
        assert_eq!("auto".parse::<ColorChoice>().unwrap(), ColorChoice::Auto);
        assert_eq!("ALWAYS".parse::<ColorChoice>().unwrap(), ColorChoice::Always);
        assert_eq!("never".parse::<ColorChoice>().unwrap(), ColorChoice::Never);
        assert!("sometimes".parse::<ColorChoice>().is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(500)), "0.50s");
        assert_eq!(format_duration(Duration::from_secs(2)), "2.00s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.5m");
    }

    #[test]
    fn test_status_formatting() {
        let shell = Shell::new(ShellMode::Human {
            verbosity: Verbosity::Normal,
            color: ColorChoice::Never,
        });

        let formatted = shell.format_status(Status::Fetching);
        assert_eq!(formatted.trim(), "Fetching");
        assert_eq!(formatted.len(), STATUS_WIDTH);

        let colored = Shell::new(ShellMode::Human {
            verbosity: Verbosity::Normal,
            color: ColorChoice::Always,
        });
        assert!(colored.format_status(Status::Warning).starts_with("\x1b[1;33m"));
    }

    #[test]
    fn test_from_flags() {
        let shell = Shell::from_flags(true, false, ColorChoice::Auto, false);
        assert!(shell.is_quiet());

        let shell = Shell::from_flags(false, true, ColorChoice::Auto, false);
        assert!(shell.is_verbose());

        // JSON takes precedence
        let shell = Shell::from_flags(true, true, ColorChoice::Auto, true);
        assert!(shell.is_json());
        assert!(!shell.is_quiet());
    }

    #[test]
    fn test_progress_counts_without_bar() {
        let shell = Arc::new(Shell::silent());
        let mut progress = shell.bytes_progress("node-v0.8.11.tar.gz", 100);
        progress.inc(40);
        progress.inc(60);
        progress.finish();
        assert_eq!(progress.position(), 100);
    }
}
