//! External action invocation.
//!
//! The action is an opaque, time-bounded external program invoked once
//! per surviving path. Failures are reported as typed errors so callers
//! can log and continue; nothing here aborts a run.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, WatcherError};

/// Placeholder replaced with the changed path in an argument template.
pub const PATH_PLACEHOLDER: &str = "{path}";

/// Placeholder replaced with the inclusion pattern.
pub const PATTERN_PLACEHOLDER: &str = "{pattern}";

/// Placeholder replaced with the exclusion suffix.
pub const SUFFIX_PLACEHOLDER: &str = "{suffix}";

/// Wolfram code template for the stock notebook cleanup: re-save the
/// notebook in readable form next to the original, with the exclusion
/// suffix substituted for the matched pattern.
pub const NOTEBOOK_CODE_TEMPLATE: &str = "nb=$ScriptCommandLine[[-1]];If[FileExistsQ[nb],ResourceFunction[\"SaveReadableNotebook\"][nb, StringReplace[nb, RegularExpression[\"{pattern}\"] -> \"{suffix}\"]]];";

/// Action invoked for each surviving path.
///
/// Implementations must tolerate repeated invocation on the same path:
/// duplicate writes within one drain window dispatch more than once by
/// design.
#[async_trait]
pub trait ChangeAction: Send + Sync {
    /// Invoke the action for one changed path.
    async fn invoke(&self, path: &Path) -> Result<ActionOutcome>;
}

/// Diagnostics from a successful invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// Combined stdout and stderr of the invocation.
    pub output: String,

    /// Wall-clock time the invocation took, in milliseconds.
    pub duration_ms: u64,
}

/// Runs a configured external program for each changed path.
///
/// Arguments come from a template; `{path}`, `{pattern}` and `{suffix}`
/// are substituted per invocation. Each run is bounded by a deadline;
/// on expiry the child process is killed and the invocation reported as
/// a timeout.
pub struct CommandAction {
    program: String,
    arg_template: Vec<String>,
    include_pattern: String,
    exclude_suffix: String,
    timeout: Duration,
}

impl CommandAction {
    /// Create an action running `program` with `arg_template`, bounded
    /// by `timeout`.
    pub fn new(program: impl Into<String>, arg_template: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            arg_template,
            include_pattern: String::new(),
            exclude_suffix: String::new(),
            timeout,
        }
    }

    /// Supply values for the `{pattern}` and `{suffix}` placeholders.
    pub fn with_template_params(
        mut self,
        include_pattern: impl Into<String>,
        exclude_suffix: impl Into<String>,
    ) -> Self {
        self.include_pattern = include_pattern.into();
        self.exclude_suffix = exclude_suffix.into();
        self
    }

    /// Argument template reproducing the stock notebook cleanup call:
    /// `wolframscript -code <SaveReadableNotebook...> <path>`.
    pub fn notebook_template() -> Vec<String> {
        vec![
            "-code".to_string(),
            NOTEBOOK_CODE_TEMPLATE.to_string(),
            PATH_PLACEHOLDER.to_string(),
        ]
    }

    fn render_args(&self, path: &Path) -> Vec<String> {
        let path_str = path.to_string_lossy();
        self.arg_template
            .iter()
            .map(|arg| {
                arg.replace(PATH_PLACEHOLDER, &path_str)
                    .replace(PATTERN_PLACEHOLDER, &self.include_pattern)
                    .replace(SUFFIX_PLACEHOLDER, &self.exclude_suffix)
            })
            .collect()
    }
}

#[async_trait]
impl ChangeAction for CommandAction {
    async fn invoke(&self, path: &Path) -> Result<ActionOutcome> {
        let args = self.render_args(path);
        debug!(program = %self.program, ?args, "invoking action");

        let start = Instant::now();
        let child = tokio::process::Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // kill_on_drop reaps the child when the timeout wins the race.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| WatcherError::ActionTimeout {
                path: path.display().to_string(),
                timeout: self.timeout,
            })??;

        let duration_ms = start.elapsed().as_millis() as u64;
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(WatcherError::ActionFailed {
                path: path.display().to_string(),
                status: output.status.code(),
                output: combined,
            });
        }

        Ok(ActionOutcome {
            output: combined,
            duration_ms,
        })
    }
}
