//! External process collaborator for script statements.

use std::process::Command;

use tracing::{debug, warn};

/// Runs the command line of a script statement.
///
/// Fire-and-forget: nothing about the outcome reaches the evaluator.
pub trait ScriptRunner {
    fn run(&mut self, script: &str);
}

/// Runs scripts through `<shell> -c <script>` and waits for them.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
}

impl ShellRunner {
    pub fn new(shell: impl Into<String>) -> Self {
        ShellRunner { shell: shell.into() }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        ShellRunner::new(crate::config::DEFAULT_SHELL)
    }
}

impl ScriptRunner for ShellRunner {
    fn run(&mut self, script: &str) {
        debug!(shell = %self.shell, script, "running script");
        match Command::new(&self.shell).arg("-c").arg(script).status() {
            Ok(status) if !status.success() => {
                debug!(script, %status, "script exited unsuccessfully");
            }
            Ok(_) => {}
            Err(e) => warn!(shell = %self.shell, error = %e, "cannot launch script"),
        }
    }
}

/// Records scripts instead of running them.
#[derive(Debug, Clone, Default)]
pub struct RecordingRunner {
    pub scripts: Vec<String>,
}

impl ScriptRunner for RecordingRunner {
    fn run(&mut self, script: &str) {
        self.scripts.push(script.to_owned());
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
