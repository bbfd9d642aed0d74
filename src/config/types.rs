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

//! Configuration type definitions.

use serde::{Deserialize, Serialize};

/// Main configuration structure.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub sync: SyncDefaults,
}

/// Connection defaults, overridden by command line flags.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    pub user: Option<String>,
    pub port: Option<u16>,
    pub ssh_key: Option<String>,
    /// Seconds allowed for dial, handshake and authentication.
    pub connect_timeout: Option<u64>,
    /// Seconds allowed for a single `exec` command. Unset or 0 means no limit.
    pub command_timeout: Option<u64>,
    /// `known-hosts`, `pinned` or `insecure-ignore`.
    pub host_key_policy: Option<String>,
    pub known_hosts_file: Option<String>,
    /// Public key accepted by the `pinned` policy.
    pub host_key: Option<String>,
}

/// Defaults for the `sync` subcommand.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SyncDefaults {
    pub workers: Option<usize>,
    /// `skip`, `follow` or `reject`.
    pub symlinks: Option<String>,
}
