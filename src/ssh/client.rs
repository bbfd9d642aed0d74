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

//! russh-backed implementation of [`crate::transport::Connection`].

use async_trait::async_trait;
use russh::client::Msg;
use russh::Channel;
use std::time::Duration;

use super::known_hosts::{get_check_method, HostKeyPolicy};
use super::tokio_client::{self, execute_on_channel, AuthMethod, Client};
use crate::error::{Error, Result};
use crate::transport::{Connection, RawOutput, RemoteFile, Session};

/// Dial timeout used when the caller does not set one.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything needed to open one authenticated connection.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub credential: AuthMethod,
    pub host_key_policy: HostKeyPolicy,
    pub connect_timeout: Duration,
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>, port: u16, username: impl Into<String>, credential: AuthMethod) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            credential,
            host_key_policy: HostKeyPolicy::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_host_key_policy(mut self, policy: HostKeyPolicy) -> Self {
        self.host_key_policy = policy;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    fn label(&self) -> String {
        format!("{}@{}:{}", self.username, self.host, self.port)
    }

    fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("host cannot be empty".to_string()));
        }
        if self.username.trim().is_empty() {
            return Err(Error::Config("username cannot be empty".to_string()));
        }
        if self.port == 0 {
            return Err(Error::Config("port cannot be 0".to_string()));
        }
        if self.connect_timeout.is_zero() {
            return Err(Error::Config("connect timeout must be positive".to_string()));
        }
        Ok(())
    }
}

/// An open SSH connection usable by the executor and the synchronizer.
#[derive(Debug, Clone)]
pub struct SshConnection {
    client: Client,
    label: String,
}

impl SshConnection {
    /// Dial, verify the host key and authenticate.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        config.validate()?;
        let label = config.label();
        let check_method = get_check_method(&config.host_key_policy)?;

        tracing::debug!("Connecting to {}", label);

        let client = match tokio::time::timeout(
            config.connect_timeout,
            Client::connect(
                (config.host.as_str(), config.port),
                &config.username,
                config.credential.clone(),
                check_method,
            ),
        )
        .await
        {
            Ok(Ok(client)) => client,
            Ok(Err(e)) if e.is_auth_failure() => {
                return Err(Error::Auth {
                    host: label,
                    reason: e.to_string(),
                })
            }
            Ok(Err(e)) => {
                return Err(Error::Network {
                    host: label,
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(Error::Network {
                    host: label,
                    reason: format!(
                        "connection timed out after {} seconds",
                        config.connect_timeout.as_secs_f64()
                    ),
                })
            }
        };

        tracing::info!("Connected to {}", label);
        Ok(Self { client, label })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

fn transport_error(e: tokio_client::Error) -> Error {
    Error::Transport(e.to_string())
}

#[async_trait]
impl Connection for SshConnection {
    async fn new_session(&self) -> Result<Box<dyn Session>> {
        let channel = self.client.get_channel().await.map_err(transport_error)?;
        Ok(Box::new(SshSession { channel }))
    }

    async fn open_file_for_write(&self, remote_path: &str) -> Result<RemoteFile> {
        match self.client.create_remote_file(remote_path).await {
            Ok(writer) => Ok(Box::new(writer)),
            // The subsystem answered, so the path itself was the problem.
            Err(tokio_client::Error::SftpError(e)) => Err(Error::remote_io(remote_path, e)),
            Err(e) => Err(transport_error(e)),
        }
    }

    async fn close(&self) -> Result<()> {
        if self.client.is_closed() {
            return Ok(());
        }
        tracing::debug!("Disconnecting from {}", self.label);
        self.client.disconnect().await.map_err(transport_error)
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

/// One session channel, used for a single command.
struct SshSession {
    channel: Channel<Msg>,
}

#[async_trait]
impl Session for SshSession {
    async fn exec(&mut self, command: &str) -> Result<RawOutput> {
        let result = execute_on_channel(&mut self.channel, command)
            .await
            .map_err(transport_error)?;
        Ok(RawOutput {
            stdout: result.stdout,
            stderr: result.stderr,
            exit_status: result.exit_status,
        })
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.channel.close().await.map_err(|e| Error::Transport(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ConnectionConfig {
        ConnectionConfig::new("example.com", 22, "deploy", AuthMethod::with_password("pw"))
    }

    #[test]
    fn test_defaults_are_secure() {
        let config = config();
        assert_eq!(config.host_key_policy, HostKeyPolicy::KnownHostsFile(None));
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(config.label(), "deploy@example.com:22");
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        assert!(config().validate().is_ok());

        let mut bad = config();
        bad.host = " ".to_string();
        assert!(matches!(bad.validate(), Err(Error::Config(_))));

        let bad = config().with_connect_timeout(Duration::ZERO);
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.port = 0;
        assert!(bad.validate().is_err());
    }

    #[tokio::test]
    async fn test_connect_refused_is_network_error() {
        // Bind and drop a listener to find a port nobody is listening on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = ConnectionConfig::new("127.0.0.1", port, "deploy", AuthMethod::with_password("pw"))
            .with_host_key_policy(HostKeyPolicy::InsecureIgnore)
            .with_connect_timeout(Duration::from_secs(2));

        let err = SshConnection::connect(&config).await.unwrap_err();
        assert!(matches!(err, Error::Network { .. }), "got {err:?}");
        assert!(err.is_retryable());
    }
}
