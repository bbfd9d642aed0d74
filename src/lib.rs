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

//! Run commands on a remote host and mirror local directory trees to it over SSH.
//!
//! The library is built around the [`transport::Connection`] trait. The
//! [`ssh::SshConnection`] implementation speaks SSH through russh; the
//! command executor ([`command::run`]), the file transfer unit
//! ([`transfer::copy_file`]) and the directory synchronizer
//! ([`sync::Synchronizer`]) work with any implementation.
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use sshsync::ssh::{AuthMethod, ConnectionConfig, SshConnection};
//! use sshsync::sync::{sync, SyncOptions};
//!
//! # async fn example() -> sshsync::Result<()> {
//! let config = ConnectionConfig::new(
//!     "web1.example.com",
//!     22,
//!     "deploy",
//!     AuthMethod::with_key_file("/home/deploy/.ssh/id_ed25519", None),
//! );
//! let conn = Arc::new(SshConnection::connect(&config).await?);
//! let report = sync(conn, Path::new("./site"), "/var/www/site", SyncOptions::default()).await?;
//! println!("copied {} files", report.files_copied);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod command;
pub mod commands;
pub mod config;
pub mod error;
pub mod node;
pub mod ssh;
pub mod sync;
pub mod transfer;
pub mod transport;
pub mod utils;

pub use cli::Cli;
pub use command::{run, shell_quote, CommandOutput, ExecOptions};
pub use config::Config;
pub use error::{Error, Result, TaskKind};
pub use node::Node;
pub use ssh::{ConnectionConfig, Credential, HostKeyPolicy, SshConnection};
pub use sync::{sync, SymlinkPolicy, SyncOptions, SyncProgress, SyncReport, Synchronizer};
pub use transfer::copy_file;
pub use transport::{Connection, RawOutput, RemoteFile, Session};
