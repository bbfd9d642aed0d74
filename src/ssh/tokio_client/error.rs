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

use std::io;

/// Errors raised by the russh-backed client.
///
/// These stay close to the wire. The transport adapter in
/// [`crate::ssh::client`] folds them into the library-wide [`crate::Error`].
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Key authentication failed")]
    KeyAuthFailed,
    #[error("Unable to load key, bad format or passphrase: {0}")]
    KeyInvalid(russh::keys::Error),
    #[error("Password authentication failed")]
    PasswordWrong,
    #[error("Invalid address was provided: {0}")]
    AddressInvalid(io::Error),
    #[error("The executed command didn't send an exit code")]
    CommandDidntExit,
    #[error("Server check failed")]
    ServerCheckFailed,
    #[error("SSH agent connection failed")]
    AgentConnectionFailed,
    #[error("SSH agent has no identities")]
    AgentNoIdentities,
    #[error("SSH agent failed to list identities")]
    AgentRequestIdentitiesFailed,
    #[error("SSH agent authentication failed")]
    AgentAuthenticationFailed,
    #[error("Ssh error occured: {0}")]
    SshError(#[from] russh::Error),
    #[error("Sftp error occured: {0}")]
    SftpError(#[from] russh_sftp::client::error::Error),
    #[error("I/O error")]
    IoError(#[from] io::Error),
}

impl Error {
    /// True when the remote side refused the presented credential or host key.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Error::KeyAuthFailed
                | Error::KeyInvalid(_)
                | Error::PasswordWrong
                | Error::ServerCheckFailed
                | Error::AgentConnectionFailed
                | Error::AgentNoIdentities
                | Error::AgentRequestIdentitiesFailed
                | Error::AgentAuthenticationFailed
                | Error::SshError(russh::Error::UnknownKey)
                | Error::SshError(russh::Error::NotAuthenticated)
        )
    }
}
