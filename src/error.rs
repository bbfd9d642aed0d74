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

//! Library error type.
//!
//! # Error Categories
//!
//! - [`Error::Auth`]: credential or host key rejected. Fatal, never retried.
//! - [`Error::Network`] / [`Error::Transport`]: dial failure or a transport
//!   failure mid-operation. The caller may retry the whole operation.
//! - [`Error::CommandFailed`]: the remote command ran and exited non-zero.
//! - [`Error::LocalIo`] / [`Error::RemoteIo`]: filesystem failure on either side.
//! - [`Error::Cancelled`]: cooperative abort.
//!
//! Failures raised while executing a synchronization task are wrapped in
//! [`Error::Task`] so the caller can tell exactly which entry failed.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// The two kinds of synchronization work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    CreateDir,
    CopyFile,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::CreateDir => write!(f, "create directory"),
            TaskKind::CopyFile => write!(f, "copy file"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Authentication to {host} failed: {reason}")]
    Auth { host: String, reason: String },

    #[error("Could not connect to {host}: {reason}")]
    Network { host: String, reason: String },

    #[error("SSH transport error: {0}")]
    Transport(String),

    #[error("Remote command exited with status {exit_code}{}", describe_stderr(.stderr))]
    CommandFailed {
        exit_code: u32,
        output: Vec<u8>,
        stderr: Vec<u8>,
    },

    #[error("Local I/O error on {}: {source}", .path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Remote I/O error on {path}: {message}")]
    RemoteIo { path: String, message: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{operation} timed out after {}s", .after.as_secs())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Unsupported entry {}: {reason}", .path.display())]
    UnsupportedEntry { path: PathBuf, reason: &'static str },

    #[error("Invalid path {}: {reason}", .path.display())]
    InvalidPath { path: PathBuf, reason: &'static str },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Worker failed: {0}")]
    Worker(String),

    #[error("Failed to {kind} {} -> {remote}: {source}", .local.display())]
    Task {
        kind: TaskKind,
        local: PathBuf,
        remote: String,
        #[source]
        source: Box<Error>,
    },
}

fn describe_stderr(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.is_empty() {
        String::new()
    } else {
        format!(": {text}")
    }
}

impl Error {
    pub(crate) fn local_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::LocalIo {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn remote_io(path: impl Into<String>, message: impl fmt::Display) -> Self {
        Error::RemoteIo {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Attach the task that was running when this error occurred.
    ///
    /// Errors that already carry a task, and cancellations, are returned
    /// unchanged.
    pub fn for_task(self, kind: TaskKind, local: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
        match self {
            Error::Task { .. } | Error::Cancelled => self,
            other => Error::Task {
                kind,
                local: local.into(),
                remote: remote.into(),
                source: Box::new(other),
            },
        }
    }

    /// The underlying error with any task context peeled off.
    pub fn root(&self) -> &Error {
        match self {
            Error::Task { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Error::Cancelled)
    }

    /// Whether re-running the whole operation might succeed without any
    /// change on the caller's side.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.root(),
            Error::Network { .. } | Error::Transport(_) | Error::Timeout { .. }
        )
    }

    /// Local and remote paths of the failing task, if known.
    pub fn task_paths(&self) -> Option<(&std::path::Path, &str)> {
        match self {
            Error::Task { local, remote, .. } => Some((local.as_path(), remote.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_display_includes_stderr() {
        let err = Error::CommandFailed {
            exit_code: 1,
            output: Vec::new(),
            stderr: b"mkdir: cannot create directory: Permission denied\n".to_vec(),
        };
        let msg = err.to_string();
        assert!(msg.contains("status 1"));
        assert!(msg.contains("Permission denied"));
        assert!(!msg.ends_with('\n'));
    }

    #[test]
    fn test_command_failed_display_without_stderr() {
        let err = Error::CommandFailed {
            exit_code: 2,
            output: b"partial".to_vec(),
            stderr: Vec::new(),
        };
        assert_eq!(err.to_string(), "Remote command exited with status 2");
    }

    #[test]
    fn test_for_task_wraps_once() {
        let err = Error::remote_io("/tmp/dst/a", "no space left")
            .for_task(TaskKind::CopyFile, "/src/a", "/tmp/dst/a")
            .for_task(TaskKind::CreateDir, "/src", "/tmp/dst");

        let (local, remote) = err.task_paths().unwrap();
        assert_eq!(local, std::path::Path::new("/src/a"));
        assert_eq!(remote, "/tmp/dst/a");
        assert!(matches!(err.root(), Error::RemoteIo { .. }));
    }

    #[test]
    fn test_cancelled_is_never_wrapped() {
        let err = Error::Cancelled.for_task(TaskKind::CopyFile, "/src/a", "/dst/a");
        assert!(matches!(err, Error::Cancelled));
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(Error::Transport("channel closed".into()).is_retryable());
        assert!(Error::Network {
            host: "h".into(),
            reason: "refused".into()
        }
        .is_retryable());
        assert!(!Error::Auth {
            host: "h".into(),
            reason: "bad password".into()
        }
        .is_retryable());

        let wrapped = Error::Transport("reset".into()).for_task(TaskKind::CreateDir, "/l", "/r");
        assert!(wrapped.is_retryable());
    }
}
