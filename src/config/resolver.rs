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

//! Merging command line values with the configuration file.
//!
//! Every method takes the command line value first; `None` falls back to
//! the file, then to the built-in default.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::node::{Node, ResolvedNode, DEFAULT_SSH_PORT};
use crate::ssh::{HostKeyPolicy, HostKeyPolicyKind, DEFAULT_CONNECT_TIMEOUT};
use crate::sync::{SymlinkPolicy, SyncOptions, DEFAULT_WORKERS};

use super::types::Config;
use super::utils::{expand_env_vars, expand_path, expand_tilde, get_current_username};

impl Config {
    /// Parse a `[user@]host[:port]` target and fill in the defaults.
    pub fn resolve_node(&self, spec: &str) -> Result<ResolvedNode> {
        let node = Node::parse(&expand_env_vars(spec))
            .with_context(|| format!("Invalid host specification '{spec}'"))?;

        let default_user = self
            .defaults
            .user
            .as_deref()
            .map(expand_env_vars)
            .unwrap_or_else(get_current_username);
        let default_port = self.defaults.port.unwrap_or(DEFAULT_SSH_PORT);

        Ok(node.resolve(&default_user, default_port))
    }

    pub fn ssh_key(&self, cli: Option<&Path>) -> Option<PathBuf> {
        cli.map(expand_tilde)
            .or_else(|| self.defaults.ssh_key.as_deref().map(expand_path))
    }

    pub fn connect_timeout(&self, cli: Option<u64>) -> Result<Duration> {
        match cli.or(self.defaults.connect_timeout) {
            Some(0) => bail!("Connect timeout must be greater than 0"),
            Some(secs) => Ok(Duration::from_secs(secs)),
            None => Ok(DEFAULT_CONNECT_TIMEOUT),
        }
    }

    /// `None` means the command may run forever.
    pub fn command_timeout(&self, cli: Option<u64>) -> Option<Duration> {
        match cli.or(self.defaults.command_timeout) {
            Some(0) | None => None,
            Some(secs) => Some(Duration::from_secs(secs)),
        }
    }

    pub fn host_key_policy(
        &self,
        kind: Option<HostKeyPolicyKind>,
        host_key: Option<String>,
        known_hosts_file: Option<PathBuf>,
    ) -> Result<HostKeyPolicy> {
        let kind = match (kind, self.defaults.host_key_policy.as_deref()) {
            (Some(kind), _) => kind,
            (None, Some(name)) => HostKeyPolicyKind::from_str(name)?,
            (None, None) => HostKeyPolicyKind::default(),
        };
        let host_key = host_key.or_else(|| self.defaults.host_key.clone());
        let known_hosts_file = known_hosts_file
            .map(|path| expand_tilde(&path))
            .or_else(|| self.defaults.known_hosts_file.as_deref().map(expand_path));

        Ok(HostKeyPolicy::from_parts(kind, host_key, known_hosts_file)?)
    }

    pub fn sync_options(
        &self,
        workers: Option<usize>,
        symlinks: Option<SymlinkPolicy>,
    ) -> Result<SyncOptions> {
        let workers = workers.or(self.sync.workers).unwrap_or(DEFAULT_WORKERS);
        if workers == 0 {
            bail!("Number of workers must be greater than 0");
        }
        let symlinks = match (symlinks, self.sync.symlinks.as_deref()) {
            (Some(policy), _) => policy,
            (None, Some(name)) => SymlinkPolicy::from_str(name)?,
            (None, None) => SymlinkPolicy::default(),
        };
        Ok(SyncOptions::default()
            .with_workers(workers)
            .with_symlink_policy(symlinks))
    }
}
