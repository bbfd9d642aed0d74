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

//! Configuration loading.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::types::Config;
use super::utils::expand_tilde;

impl Config {
    /// Load configuration from a file. A missing file yields the defaults.
    pub async fn load(path: &Path) -> Result<Self> {
        let expanded_path = expand_tilde(path);

        if !expanded_path.exists() {
            tracing::debug!(
                "Config file not found at {:?}, using defaults",
                expanded_path
            );
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&expanded_path).await.with_context(|| {
            format!(
                "Failed to read configuration file at {}",
                expanded_path.display()
            )
        })?;

        Self::from_yaml(&content).with_context(|| {
            format!(
                "Failed to parse YAML configuration file at {}",
                expanded_path.display()
            )
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty file is a valid, empty configuration.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Where the configuration lives when `--config` is not given.
    ///
    /// `$XDG_CONFIG_HOME/sshsync/config.yaml` when set, otherwise the
    /// platform config directory (`~/.config/sshsync/config.yaml` on Linux).
    pub fn default_path() -> PathBuf {
        if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg_config_home)
                .join("sshsync")
                .join("config.yaml");
        }
        if let Some(proj_dirs) = ProjectDirs::from("", "", "sshsync") {
            return proj_dirs.config_dir().join("config.yaml");
        }
        PathBuf::from("~/.config/sshsync/config.yaml")
    }

    /// Load from an explicit path, or from [`Config::default_path`].
    pub async fn load_with_priority(cli_config_path: Option<&Path>) -> Result<Self> {
        match cli_config_path {
            Some(path) => {
                let expanded = expand_tilde(path);
                if !expanded.exists() {
                    tracing::warn!(
                        "Configuration file {} not found, using defaults",
                        expanded.display()
                    );
                }
                tracing::debug!("Using explicitly specified config file: {:?}", expanded);
                Self::load(&expanded).await
            }
            None => Self::load(&Self::default_path()).await,
        }
    }
}
