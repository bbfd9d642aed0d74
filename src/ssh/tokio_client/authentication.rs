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

//! Credentials and server key verification for the russh client.
//!
//! - [`AuthMethod`] is the credential presented after the handshake.
//! - [`ServerCheckMethod`] decides whether the server's host key is trusted.

use russh::client::{Handle, Handler};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zeroize::Zeroizing;

/// A credential used to authenticate one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthMethod {
    Password(Zeroizing<String>),
    PrivateKey {
        /// entire contents of private key file
        key_data: Zeroizing<String>,
        key_pass: Option<Zeroizing<String>>,
    },
    PrivateKeyFile {
        key_file_path: PathBuf,
        key_pass: Option<Zeroizing<String>>,
    },
    #[cfg(not(target_os = "windows"))]
    Agent,
}

impl AuthMethod {
    pub fn with_password(password: &str) -> Self {
        Self::Password(Zeroizing::new(password.to_string()))
    }

    pub fn with_key(key: &str, passphrase: Option<&str>) -> Self {
        Self::PrivateKey {
            key_data: Zeroizing::new(key.to_string()),
            key_pass: passphrase.map(|p| Zeroizing::new(p.to_string())),
        }
    }

    pub fn with_key_file<T: AsRef<Path>>(key_file_path: T, passphrase: Option<&str>) -> Self {
        Self::PrivateKeyFile {
            key_file_path: key_file_path.as_ref().to_path_buf(),
            key_pass: passphrase.map(|p| Zeroizing::new(p.to_string())),
        }
    }

    /// Authenticate with every identity the running SSH agent offers.
    ///
    /// Requires `SSH_AUTH_SOCK`. Not available on Windows.
    #[cfg(not(target_os = "windows"))]
    pub fn with_agent() -> Self {
        Self::Agent
    }

    /// Short label for logs; never includes secret material.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Password(_) => "password",
            Self::PrivateKey { .. } => "private-key",
            Self::PrivateKeyFile { .. } => "private-key-file",
            #[cfg(not(target_os = "windows"))]
            Self::Agent => "agent",
        }
    }
}

/// Server host key verification methods.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ServerCheckMethod {
    /// Accept any host key.
    NoCheck,
    /// base64 encoded key without the type prefix or hostname suffix
    PublicKey(String),
    /// Use a specific known_hosts file path
    KnownHostsFile(String),
}

impl ServerCheckMethod {
    pub fn with_public_key(key: &str) -> Self {
        Self::PublicKey(key.to_string())
    }

    pub fn with_known_hosts_file(known_hosts_file: &str) -> Self {
        Self::KnownHostsFile(known_hosts_file.to_string())
    }
}

/// Runs the authentication exchange on a freshly connected handle.
pub(super) async fn authenticate<H: Handler>(
    handle: &mut Handle<H>,
    username: &str,
    auth: AuthMethod,
) -> Result<(), super::Error> {
    tracing::debug!("Authenticating {} with {}", username, auth.kind());

    match auth {
        AuthMethod::Password(password) => {
            let result = handle.authenticate_password(username, &**password).await?;
            if !result.success() {
                return Err(super::Error::PasswordWrong);
            }
        }
        AuthMethod::PrivateKey { key_data, key_pass } => {
            let key = russh::keys::decode_secret_key(&key_data, key_pass.as_ref().map(|p| &***p))
                .map_err(super::Error::KeyInvalid)?;
            authenticate_with_key(handle, username, key).await?;
        }
        AuthMethod::PrivateKeyFile {
            key_file_path,
            key_pass,
        } => {
            let key = russh::keys::load_secret_key(key_file_path, key_pass.as_ref().map(|p| &***p))
                .map_err(super::Error::KeyInvalid)?;
            authenticate_with_key(handle, username, key).await?;
        }
        #[cfg(not(target_os = "windows"))]
        AuthMethod::Agent => {
            let mut agent = russh::keys::agent::client::AgentClient::connect_env()
                .await
                .map_err(|_| super::Error::AgentConnectionFailed)?;

            let identities = agent
                .request_identities()
                .await
                .map_err(|_| super::Error::AgentRequestIdentitiesFailed)?;

            if identities.is_empty() {
                return Err(super::Error::AgentNoIdentities);
            }

            let mut auth_success = false;
            for identity in identities {
                let result = handle
                    .authenticate_publickey_with(
                        username,
                        identity.clone(),
                        handle.best_supported_rsa_hash().await?.flatten(),
                        &mut agent,
                    )
                    .await;

                if let Ok(auth_result) = result {
                    if auth_result.success() {
                        auth_success = true;
                        break;
                    }
                }
            }

            if !auth_success {
                return Err(super::Error::AgentAuthenticationFailed);
            }
        }
    };
    Ok(())
}

async fn authenticate_with_key<H: Handler>(
    handle: &mut Handle<H>,
    username: &str,
    key: russh::keys::PrivateKey,
) -> Result<(), super::Error> {
    let result = handle
        .authenticate_publickey(
            username,
            russh::keys::PrivateKeyWithHashAlg::new(
                Arc::new(key),
                handle.best_supported_rsa_hash().await?.flatten(),
            ),
        )
        .await?;
    if !result.success() {
        return Err(super::Error::KeyAuthFailed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_kind_never_leaks_secret() {
        let auth = AuthMethod::with_password("hunter2");
        assert_eq!(auth.kind(), "password");

        let auth = AuthMethod::with_key_file("/home/user/.ssh/id_ed25519", Some("pass"));
        assert_eq!(auth.kind(), "private-key-file");
    }

    #[test]
    fn test_server_check_constructors() {
        assert_eq!(
            ServerCheckMethod::with_public_key("AAAAC3Nza"),
            ServerCheckMethod::PublicKey("AAAAC3Nza".to_string())
        );
        assert_eq!(
            ServerCheckMethod::with_known_hosts_file("/tmp/known_hosts"),
            ServerCheckMethod::KnownHostsFile("/tmp/known_hosts".to_string())
        );
    }
}
