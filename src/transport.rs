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

//! The transport seam between the synchronization engine and SSH.
//!
//! The command executor, the file transfer unit and the synchronizer only
//! ever talk to a [`Connection`]. [`crate::ssh::SshConnection`] implements it
//! on top of russh; tests substitute an in-memory implementation.
//!
//! Implementations must allow [`Connection::new_session`] and
//! [`Connection::open_file_for_write`] to be called concurrently from many
//! tasks, each call yielding an independent channel.

use async_trait::async_trait;
use tokio::io::AsyncWrite;

use crate::error::Result;

/// Everything a remote process produced before it exited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_status: u32,
}

/// A byte sink backed by a newly created remote file.
///
/// Shutting the sink down flushes and closes the remote handle; dropping it
/// releases the channel that carried it.
pub type RemoteFile = Box<dyn AsyncWrite + Send + Unpin>;

/// An authenticated connection to one remote host.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Open an independent session for exactly one command.
    async fn new_session(&self) -> Result<Box<dyn Session>>;

    /// Create or truncate `remote_path` and return a sink for its contents.
    async fn open_file_for_write(&self, remote_path: &str) -> Result<RemoteFile>;

    /// Close the connection. Sessions derived from it become unusable.
    async fn close(&self) -> Result<()>;

    /// Human readable `user@host:port` used in log lines.
    fn describe(&self) -> String {
        "remote".to_string()
    }
}

/// A single-use channel derived from a [`Connection`].
#[async_trait]
pub trait Session: Send {
    /// Run `command` and block until the remote process terminates.
    ///
    /// A non-zero exit status is not an error at this level.
    async fn exec(&mut self, command: &str) -> Result<RawOutput>;

    /// Release the channel.
    async fn close(self: Box<Self>) -> Result<()>;
}
