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

//! Turning command line flags and config into a live connection.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::config::Config;
use crate::ssh::{AuthContext, ConnectionConfig, HostKeyPolicyKind, SshConnection};

/// Connection-related flags, as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConnectParams {
    pub host: String,
    pub identity: Option<PathBuf>,
    pub use_agent: bool,
    pub use_password: bool,
    pub host_key_policy: Option<HostKeyPolicyKind>,
    pub known_hosts: Option<PathBuf>,
    pub host_key: Option<String>,
    pub connect_timeout: Option<u64>,
}

/// Merge flags with the config file. Prompts for secrets when needed.
pub fn build_connection_config(params: &ConnectParams, config: &Config) -> Result<ConnectionConfig> {
    let node = config.resolve_node(&params.host)?;
    let host_key_policy = config.host_key_policy(
        params.host_key_policy,
        params.host_key.clone(),
        params.known_hosts.clone(),
    )?;
    let connect_timeout = config.connect_timeout(params.connect_timeout)?;

    let credential = AuthContext::new(node.username.clone(), node.host.clone())
        .with_key_path(config.ssh_key(params.identity.as_deref()))
        .with_agent(params.use_agent)
        .with_password(params.use_password)
        .determine_method()?;

    tracing::debug!(
        "Connecting to {} using {} authentication, host key policy {}",
        node,
        credential.kind(),
        host_key_policy.kind()
    );

    Ok(ConnectionConfig::new(node.host, node.port, node.username, credential)
        .with_host_key_policy(host_key_policy)
        .with_connect_timeout(connect_timeout))
}

pub async fn connect(params: &ConnectParams, config: &Config) -> Result<SshConnection> {
    let connection_config = build_connection_config(params, config)?;
    let target = format!(
        "{}@{}:{}",
        connection_config.username, connection_config.host, connection_config.port
    );
    SshConnection::connect(&connection_config)
        .await
        .with_context(|| format!("Failed to connect to {target}"))
}
