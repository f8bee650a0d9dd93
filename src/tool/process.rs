//! Real subprocess execution on top of `tokio::process`

use crate::error::{BundleCostError, BundleCostResult};
use crate::tool::{ToolInvocation, ToolOutput, ToolRunner};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs tools as child processes, killing them when their timeout elapses
#[derive(Debug, Default, Clone)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, invocation: &ToolInvocation) -> BundleCostResult<ToolOutput> {
        debug!("Executing: {}", invocation.display());

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir);
        }

        let child = cmd
            .spawn()
            .map_err(|e| BundleCostError::command_failed(invocation.program.clone(), e))?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(invocation.timeout, child.wait_with_output()).await
        {
            Ok(result) => {
                result.map_err(|e| BundleCostError::command_failed(invocation.display(), e))?
            }
            Err(_elapsed) => {
                warn!(
                    "Killed after {}s: {}",
                    invocation.timeout.as_secs(),
                    invocation.display()
                );
                return Err(BundleCostError::ToolTimeout {
                    command: invocation.display(),
                    secs: invocation.timeout.as_secs(),
                });
            }
        };

        Ok(ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
