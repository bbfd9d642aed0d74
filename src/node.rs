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

use anyhow::{bail, Context, Result};
use std::fmt;

pub const DEFAULT_SSH_PORT: u16 = 22;

/// A remote endpoint as written on the command line.
///
/// User and port are optional here; [`Node::resolve`] fills them in from
/// configured defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub host: String,
    pub port: Option<u16>,
    pub username: Option<String>,
}

impl Node {
    /// Parse `host`, `host:port`, `user@host`, `user@host:port` or
    /// `[v6addr]:port`.
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        let (username, host_part) = match spec.rsplit_once('@') {
            Some((user, rest)) => {
                if user.is_empty() {
                    bail!("Empty user name in '{spec}'");
                }
                (Some(user.to_string()), rest)
            }
            None => (None, spec),
        };

        let (host, port) = if let Some(bracketed) = host_part.strip_prefix('[') {
            let (host, tail) = bracketed
                .split_once(']')
                .with_context(|| format!("Unclosed '[' in '{spec}'"))?;
            let port = match tail.strip_prefix(':') {
                Some(port) => Some(parse_port(port)?),
                None if tail.is_empty() => None,
                None => bail!("Unexpected '{tail}' after address in '{spec}'"),
            };
            (host, port)
        } else if host_part.matches(':').count() == 1 {
            let (host, port) = host_part.split_once(':').unwrap_or((host_part, ""));
            (host, Some(parse_port(port)?))
        } else {
            // Bare IPv6 addresses have several colons and no port.
            (host_part, None)
        };

        if host.is_empty() {
            bail!("Missing host name in '{spec}'");
        }

        Ok(Self {
            host: host.to_string(),
            port,
            username,
        })
    }

    /// Fill in the user and port from defaults.
    pub fn resolve(self, default_user: &str, default_port: u16) -> ResolvedNode {
        ResolvedNode {
            host: self.host,
            port: self.port.unwrap_or(default_port),
            username: self.username.unwrap_or_else(|| default_user.to_string()),
        }
    }
}

fn parse_port(port: &str) -> Result<u16> {
    let port = port
        .parse::<u16>()
        .with_context(|| format!("Invalid port number '{port}'"))?;
    if port == 0 {
        bail!("Port 0 is not allowed");
    }
    Ok(port)
}

/// A node with every field known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNode {
    pub host: String,
    pub port: u16,
    pub username: String,
}

impl fmt::Display for ResolvedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "{}@[{}]:{}", self.username, self.host, self.port)
        } else {
            write!(f, "{}@{}:{}", self.username, self.host, self.port)
        }
    }
}
