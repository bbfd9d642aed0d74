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

use anyhow::Result;
use clap::Parser;
use owo_colors::OwoColorize;
use std::process::ExitCode;
use std::sync::Arc;

use sshsync::{
    cli::{Cli, Commands},
    command::ExecOptions,
    commands::{
        connect::{connect, ConnectParams},
        exec::{execute_command, exit_code},
        sync::sync_directory,
    },
    config::Config,
    transport::Connection,
    utils::init_logging,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{} {e:#}", "Error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<u8> {
    let config = Config::load_with_priority(cli.config.as_deref()).await?;

    let params = ConnectParams {
        host: cli.host.clone(),
        identity: cli.identity.clone(),
        use_agent: cli.use_agent,
        use_password: cli.password,
        host_key_policy: cli.host_key_policy.map(Into::into),
        known_hosts: cli.known_hosts.clone(),
        host_key: cli.host_key.clone(),
        connect_timeout: cli.connect_timeout,
    };
    let conn = Arc::new(connect(&params, &config).await?);

    let result = match &cli.command {
        Commands::Exec {
            merge_stderr,
            timeout,
            command,
        } => {
            let options = ExecOptions {
                merge_stderr: *merge_stderr,
                timeout: config.command_timeout(*timeout),
            };
            execute_command(conn.as_ref(), &command.join(" "), &options)
                .await
                .map(|status| exit_code(status) as u8)
        }
        Commands::Sync {
            local,
            remote,
            workers,
            symlinks,
            no_progress,
        } => {
            let options = config.sync_options(*workers, symlinks.map(Into::into))?;
            sync_directory(Arc::clone(&conn), local, remote, options, !no_progress)
                .await
                .map(|_| 0)
        }
    };

    if let Err(e) = conn.close().await {
        tracing::debug!("Failed to close connection: {}", e);
    }
    result
}
