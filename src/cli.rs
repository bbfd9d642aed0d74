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

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::ssh::HostKeyPolicyKind;
use crate::sync::SymlinkPolicy;

#[derive(Parser, Debug)]
#[command(
    name = "sshsync",
    version,
    about = "Run commands on a remote host and mirror local directory trees to it over SSH",
    long_about = "sshsync connects to one remote host over SSH and either runs a command there or\ncopies a local directory tree to a remote path. Directories are created with\n'mkdir -p' before anything is copied into them, files are streamed over SFTP by a\nbounded pool of workers, and the run stops at the first failure.",
    after_help = "EXAMPLES:\n  Run a command:             sshsync -H deploy@web1 exec uptime\n  Mirror a directory:        sshsync -H deploy@web1 sync ./site /var/www/site\n  Eight parallel transfers:  sshsync -H web1 sync -j 8 ./build /opt/app\n  Pinned host key:           sshsync -H web1 --host-key-policy pinned --host-key 'ssh-ed25519 AAAA...' exec id"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short = 'H',
        long,
        env = "SSHSYNC_HOST",
        help = "Remote host in [user@]hostname[:port] format\nDefault user and port come from the config file or the current environment"
    )]
    pub host: String,

    #[arg(
        long,
        help = "Configuration file path [default: ~/.config/sshsync/config.yaml]"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        short = 'i',
        long,
        help = "SSH private key file path (prompts for passphrase if encrypted)"
    )]
    pub identity: Option<PathBuf>,

    #[arg(
        short = 'A',
        long,
        help = "Use SSH agent for authentication (Unix/Linux/macOS only)"
    )]
    pub use_agent: bool,

    #[arg(
        short = 'P',
        long,
        help = "Use password authentication (will prompt for password)"
    )]
    pub password: bool,

    #[arg(
        long,
        value_enum,
        help = "Host key verification [default: known-hosts]\n  known-hosts     - Check ~/.ssh/known_hosts or --known-hosts (fails if missing)\n  pinned          - Accept only the key given with --host-key\n  insecure-ignore - Accept any host key (testing only)"
    )]
    pub host_key_policy: Option<HostKeyPolicyArg>,

    #[arg(long, value_name = "PATH", help = "known_hosts file to verify against")]
    pub known_hosts: Option<PathBuf>,

    #[arg(
        long,
        value_name = "KEY",
        help = "Expected host key for --host-key-policy pinned ('ssh-ed25519 AAAA...')"
    )]
    pub host_key: Option<String>,

    #[arg(
        long,
        value_name = "SECS",
        help = "Connection timeout in seconds [default: 5]"
    )]
    pub connect_timeout: Option<u64>,

    #[arg(
        short = 'v',
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Execute a command on the remote host",
        long_about = "Runs the command through the remote user's shell and prints its output.\nThe exit code of sshsync is the exit code of the remote command.",
        after_help = "Examples:\n  sshsync -H web1 exec uptime\n  sshsync -H web1 exec --merge-stderr -- ls -la /missing"
    )]
    Exec {
        #[arg(long, help = "Print stderr after stdout on standard output")]
        merge_stderr: bool,

        #[arg(
            long,
            value_name = "SECS",
            help = "Command timeout in seconds (0 for unlimited)"
        )]
        timeout: Option<u64>,

        #[arg(required = true, trailing_var_arg = true, help = "Command to execute")]
        command: Vec<String>,
    },

    #[command(
        about = "Mirror a local directory tree to a remote path",
        long_about = "Creates every directory of LOCAL under REMOTE with 'mkdir -p' and copies every\nregular file over SFTP, overwriting existing remote files. Nothing is ever deleted\non the remote side, so running it again after a failure is safe.",
        after_help = "Examples:\n  sshsync -H web1 sync ./site /var/www/site\n  sshsync -H web1 sync -j 1 --symlinks follow ./conf /etc/app"
    )]
    Sync {
        #[arg(help = "Local directory to copy")]
        local: PathBuf,

        #[arg(help = "Remote destination directory (created if missing)")]
        remote: String,

        #[arg(short = 'j', long, help = "Number of parallel transfers [default: 4]")]
        workers: Option<usize>,

        #[arg(long, value_enum, help = "What to do with symbolic links [default: skip]")]
        symlinks: Option<SymlinkArg>,

        #[arg(long, help = "Do not draw a progress bar")]
        no_progress: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostKeyPolicyArg {
    KnownHosts,
    Pinned,
    InsecureIgnore,
}

impl From<HostKeyPolicyArg> for HostKeyPolicyKind {
    fn from(arg: HostKeyPolicyArg) -> Self {
        match arg {
            HostKeyPolicyArg::KnownHosts => HostKeyPolicyKind::KnownHosts,
            HostKeyPolicyArg::Pinned => HostKeyPolicyKind::Pinned,
            HostKeyPolicyArg::InsecureIgnore => HostKeyPolicyKind::InsecureIgnore,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymlinkArg {
    Skip,
    Follow,
    Reject,
}

impl From<SymlinkArg> for SymlinkPolicy {
    fn from(arg: SymlinkArg) -> Self {
        match arg {
            SymlinkArg::Skip => SymlinkPolicy::Skip,
            SymlinkArg::Follow => SymlinkPolicy::Follow,
            SymlinkArg::Reject => SymlinkPolicy::Reject,
        }
    }
}

impl Cli {
    /// The command line of `exec`, joined the way a shell would receive it.
    pub fn exec_command(&self) -> Option<String> {
        match &self.command {
            Commands::Exec { command, .. } => Some(command.join(" ")),
            Commands::Sync { .. } => None,
        }
    }
}
