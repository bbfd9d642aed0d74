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

use super::tokio_client::ServerCheckMethod;
use crate::error::{Error, Result};
use directories::BaseDirs;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Get the default known_hosts file path
pub fn get_default_known_hosts_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().join(".ssh").join("known_hosts"))
}

/// How the server's host key is verified.
///
/// Accepting any key is available only as an explicit opt-in; the default
/// checks the user's known_hosts file and refuses to connect without one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostKeyPolicy {
    /// Accept whatever key the server presents.
    InsecureIgnore,
    /// Accept exactly this key, given as `ssh-ed25519 AAAA...` or bare base64.
    Pinned(String),
    /// Check a known_hosts file, `~/.ssh/known_hosts` when `None`.
    KnownHostsFile(Option<PathBuf>),
}

impl Default for HostKeyPolicy {
    fn default() -> Self {
        Self::KnownHostsFile(None)
    }
}

/// Names accepted on the command line and in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostKeyPolicyKind {
    #[default]
    KnownHosts,
    Pinned,
    InsecureIgnore,
}

impl FromStr for HostKeyPolicyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "known-hosts" | "known_hosts" | "yes" => Ok(Self::KnownHosts),
            "pinned" => Ok(Self::Pinned),
            "insecure-ignore" | "insecure_ignore" | "no" => Ok(Self::InsecureIgnore),
            other => Err(Error::Config(format!(
                "unknown host key policy '{other}' (expected known-hosts, pinned or insecure-ignore)"
            ))),
        }
    }
}

impl fmt::Display for HostKeyPolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KnownHosts => write!(f, "known-hosts"),
            Self::Pinned => write!(f, "pinned"),
            Self::InsecureIgnore => write!(f, "insecure-ignore"),
        }
    }
}

impl HostKeyPolicy {
    /// Build a policy from its name plus the settings that go with it.
    pub fn from_parts(
        kind: HostKeyPolicyKind,
        host_key: Option<String>,
        known_hosts_file: Option<PathBuf>,
    ) -> Result<Self> {
        match kind {
            HostKeyPolicyKind::KnownHosts => Ok(Self::KnownHostsFile(known_hosts_file)),
            HostKeyPolicyKind::Pinned => host_key.map(Self::Pinned).ok_or_else(|| {
                Error::Config("the pinned host key policy needs a host key".to_string())
            }),
            HostKeyPolicyKind::InsecureIgnore => Ok(Self::InsecureIgnore),
        }
    }

    pub fn kind(&self) -> HostKeyPolicyKind {
        match self {
            Self::InsecureIgnore => HostKeyPolicyKind::InsecureIgnore,
            Self::Pinned(_) => HostKeyPolicyKind::Pinned,
            Self::KnownHostsFile(_) => HostKeyPolicyKind::KnownHosts,
        }
    }
}

/// Strip the key type and comment from an OpenSSH public key line.
fn pinned_key_base64(key: &str) -> Option<&str> {
    let mut parts = key.split_whitespace();
    let first = parts.next()?;
    match parts.next() {
        // "ssh-ed25519 AAAA... comment"
        Some(second) if !first.starts_with("AAAA") => Some(second),
        _ => Some(first),
    }
}

/// Translate a [`HostKeyPolicy`] into the check the russh handler performs.
pub fn get_check_method(policy: &HostKeyPolicy) -> Result<ServerCheckMethod> {
    match policy {
        HostKeyPolicy::InsecureIgnore => {
            tracing::warn!("Host key verification disabled (insecure-ignore)");
            Ok(ServerCheckMethod::NoCheck)
        }
        HostKeyPolicy::Pinned(key) => {
            let base64 = pinned_key_base64(key)
                .ok_or_else(|| Error::Config("pinned host key is empty".to_string()))?;
            tracing::debug!("Verifying host key against pinned key");
            Ok(ServerCheckMethod::with_public_key(base64))
        }
        HostKeyPolicy::KnownHostsFile(path) => {
            let path = match path {
                Some(path) => path.clone(),
                None => get_default_known_hosts_path().ok_or_else(|| {
                    Error::Config("could not determine the home directory".to_string())
                })?,
            };
            if !path.exists() {
                return Err(Error::Config(format!(
                    "known_hosts file not found at {}; pass --known-hosts, pin a key with \
                     --host-key-policy pinned, or opt out with --host-key-policy insecure-ignore",
                    path.display()
                )));
            }
            tracing::debug!("Using known_hosts file: {:?}", path);
            Ok(ServerCheckMethod::with_known_hosts_file(
                &path.to_string_lossy(),
            ))
        }
    }
}
