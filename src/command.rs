// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Run a single remote command over its own session.
//!
//! The command string is passed to the remote shell verbatim. Callers that
//! embed paths or other untrusted text must quote it with [`shell_quote`].

use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::{Connection, RawOutput};

pub use crate::sync::path::shell_quote;

/// Knobs for [`run`].
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Append stderr to stdout in [`CommandOutput::output`].
    pub merge_stderr: bool,
    /// Give up on the command after this long.
    pub timeout: Option<Duration>,
}

impl ExecOptions {
    pub fn merged() -> Self {
        Self {
            merge_stderr: true,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// What a command printed, plus its exit status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_status: u32,
    merge_stderr: bool,
}

impl CommandOutput {
    fn new(raw: RawOutput, merge_stderr: bool) -> Self {
        Self {
            stdout: raw.stdout,
            stderr: raw.stderr,
            exit_status: raw.exit_status,
            merge_stderr,
        }
    }

    /// The combined output: stdout, followed by stderr when merging was requested.
    pub fn output(&self) -> Vec<u8> {
        if self.merge_stderr {
            let mut merged = Vec::with_capacity(self.stdout.len() + self.stderr.len());
            merged.extend_from_slice(&self.stdout);
            merged.extend_from_slice(&self.stderr);
            merged
        } else {
            self.stdout.clone()
        }
    }

    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    pub fn is_success(&self) -> bool {
        self.exit_status == 0
    }
}

/// Run `command` on a fresh session and wait for it to exit.
///
/// The session is released whether the command succeeds, fails or times out.
/// A non-zero exit status becomes [`Error::CommandFailed`], carrying the
/// captured output.
pub async fn run<C>(conn: &C, command: &str, options: &ExecOptions) -> Result<CommandOutput>
where
    C: Connection + ?Sized,
{
    let output = run_unchecked(conn, command, options).await?;
    if output.is_success() {
        Ok(output)
    } else {
        tracing::debug!(
            "Command exited with status {}: {}",
            output.exit_status,
            command
        );
        Err(Error::CommandFailed {
            exit_code: output.exit_status,
            output: output.output(),
            stderr: output.stderr,
        })
    }
}

/// Like [`run`] but a non-zero exit status is returned as output, not an error.
pub async fn run_unchecked<C>(
    conn: &C,
    command: &str,
    options: &ExecOptions,
) -> Result<CommandOutput>
where
    C: Connection + ?Sized,
{
    let mut session = conn.new_session().await?;
    tracing::trace!("Executing command: {}", command);

    let result = match options.timeout {
        Some(limit) => match tokio::time::timeout(limit, session.exec(command)).await {
            Ok(result) => result,
            Err(_) => {
                // Dropping the session abandons its channel.
                drop(session);
                return Err(Error::Timeout {
                    operation: "remote command",
                    after: limit,
                });
            }
        },
        None => session.exec(command).await,
    };

    if let Err(e) = session.close().await {
        tracing::debug!("Failed to close session: {}", e);
    }

    result.map(|raw| CommandOutput::new(raw, options.merge_stderr))
}
