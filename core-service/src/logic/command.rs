//! External tool runner
//!
//! Discovery, firewall and privilege probes shell out to OS tools. Each call
//! runs on a throwaway current-thread tokio runtime under a hard timeout; a
//! tool that overruns is killed and the caller degrades to "no result".

use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {secs}s")]
    Timeout { program: String, secs: u64 },

    #[error("runtime error: {0}")]
    Runtime(std::io::Error),
}

#[derive(Debug, Clone, Copy)]
pub struct ToolRunner {
    timeout: Duration,
}

impl ToolRunner {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs.max(1)),
        }
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout.as_secs()
    }

    /// Run `program args..` and capture its output. Non-zero exit is not an
    /// error here; callers inspect `status`.
    pub fn run(&self, program: &str, args: &[&str]) -> Result<Output, CommandError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(CommandError::Runtime)?;

        let timeout = self.timeout;
        rt.block_on(async move {
            let child = Command::new(program)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(|source| CommandError::Spawn {
                    program: program.to_string(),
                    source,
                })?;

            match tokio::time::timeout(timeout, child.wait_with_output()).await {
                Ok(result) => result.map_err(|source| CommandError::Spawn {
                    program: program.to_string(),
                    source,
                }),
                Err(_) => Err(CommandError::Timeout {
                    program: program.to_string(),
                    secs: timeout.as_secs(),
                }),
            }
        })
    }

    /// Exit status only; any failure to run counts as `false`
    pub fn succeeds(&self, program: &str, args: &[&str]) -> bool {
        match self.run(program, args) {
            Ok(output) => output.status.success(),
            Err(e) => {
                log::debug!("{}", e);
                false
            }
        }
    }

    /// Stdout of a successful run
    pub fn stdout(&self, program: &str, args: &[&str]) -> Option<String> {
        match self.run(program, args) {
            Ok(output) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(output) => {
                log::debug!("{} exited with {}", program, output.status);
                None
            }
            Err(e) => {
                log::info!("{}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_is_spawn_error() {
        let runner = ToolRunner::new(5);
        let result = runner.run("hsp-definitely-not-a-real-tool", &[]);
        assert!(matches!(result, Err(CommandError::Spawn { .. })));
        assert!(!runner.succeeds("hsp-definitely-not-a-real-tool", &["-x"]));
        assert!(runner.stdout("hsp-definitely-not-a-real-tool", &[]).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_overrunning_tool_times_out() {
        let runner = ToolRunner::new(1);
        let result = runner.run("sleep", &["5"]);
        assert!(matches!(result, Err(CommandError::Timeout { secs: 1, .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_stdout_captured() {
        let runner = ToolRunner::new(5);
        assert_eq!(runner.stdout("echo", &["hello"]).as_deref(), Some("hello\n"));
    }
}
