//! External tool invocation
//!
//! Every subprocess (package manager, bundler) goes through the `ToolRunner`
//! trait so the install/build loop can be driven by a fake in tests.

mod process;

pub use process::ProcessRunner;

use crate::error::BundleCostResult;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

/// Max number of output lines to include in failure messages.
const ERROR_TAIL_LINES: usize = 50;

/// One subprocess call
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    /// Executable name or path
    pub program: String,
    /// Arguments, passed as-is (no shell)
    pub args: Vec<String>,
    /// Working directory
    pub cwd: Option<PathBuf>,
    /// Wall-clock limit; the process is killed when it elapses
    pub timeout: Duration,
}

impl ToolInvocation {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            timeout,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// `program arg1 arg2 ...`, for logs and error messages
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished subprocess
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Last lines of combined output, for failure messages
    pub fn tail(&self) -> String {
        tail_output(&self.stdout, &self.stderr)
    }
}

/// Subprocess collaborator
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run the invocation to completion (or until its timeout)
    ///
    /// A non-zero exit is not an error here: it is reported through
    /// `ToolOutput::code`. Errors are reserved for spawn failures and timeouts.
    async fn run(&self, invocation: &ToolInvocation) -> BundleCostResult<ToolOutput>;
}

/// Extract the useful tail of tool output for error diagnostics.
///
/// Combines stdout and stderr, then returns the last `ERROR_TAIL_LINES`
/// lines so error messages are actionable without being overwhelming.
pub(crate) fn tail_output(stdout: &str, stderr: &str) -> String {
    let lines: Vec<&str> = stdout.lines().chain(stderr.lines()).collect();
    let total = lines.len();
    let tail: Vec<&str> = if total > ERROR_TAIL_LINES {
        lines[total - ERROR_TAIL_LINES..].to_vec()
    } else {
        lines
    };
    tail.join("\n")
}
