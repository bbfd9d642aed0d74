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

//! Session channels and command execution.

use russh::client::Msg;
use russh::{Channel, Sig};

use super::connection::Client;

/// Buffer size for SSH command stdout
/// - 8KB matches typical SSH channel window sizes
const SSH_CMD_BUFFER_SIZE: usize = 8192;

/// Buffer size for stderr, which is usually short
const SSH_RESPONSE_BUFFER_SIZE: usize = 1024;

/// Result of a command execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandExecutedResult {
    /// Raw stdout bytes of the command.
    pub stdout: Vec<u8>,
    /// Raw stderr bytes of the command.
    pub stderr: Vec<u8>,
    /// The unix exit status (`$?` in bash).
    pub exit_status: u32,
}

impl Client {
    /// Open a new session channel.
    pub async fn get_channel(&self) -> Result<Channel<Msg>, super::Error> {
        self.connection_handle
            .channel_open_session()
            .await
            .map_err(super::Error::SshError)
    }
}

/// Run `command` on an already opened session channel and wait for it to exit.
///
/// stdout and stderr are collected separately. The channel is left open;
/// closing it is the caller's job.
pub async fn execute_on_channel(
    channel: &mut Channel<Msg>,
    command: &str,
) -> Result<CommandExecutedResult, super::Error> {
    let mut stdout_buffer = Vec::with_capacity(SSH_CMD_BUFFER_SIZE);
    let mut stderr_buffer = Vec::with_capacity(SSH_RESPONSE_BUFFER_SIZE);
    channel.exec(true, command).await?;

    let mut result: Option<u32> = None;
    let mut signal: Option<(Sig, String)> = None;

    while let Some(msg) = channel.wait().await {
        match msg {
            russh::ChannelMsg::Data { ref data } => stdout_buffer.extend_from_slice(data),
            russh::ChannelMsg::ExtendedData { ref data, ext } => {
                if ext == 1 {
                    stderr_buffer.extend_from_slice(data)
                }
            }

            // The exit status may arrive before the remaining data, so keep
            // reading until the channel closes.
            russh::ChannelMsg::ExitStatus { exit_status } => result = Some(exit_status),

            // A process killed by a signal reports no exit status.
            russh::ChannelMsg::ExitSignal {
                signal_name,
                error_message,
                ..
            } => signal = Some((signal_name, error_message)),

            // RFC 4254 5.3 lets the channel close without EOF, and EOF may
            // precede the last Data message, so it is not a stop signal.
            _ => {}
        }
    }

    if result.is_none() {
        if let Some((sig, message)) = signal {
            tracing::debug!("Remote command killed by signal {:?}", sig);
            let note = if message.is_empty() {
                format!("killed by signal {sig:?}\n")
            } else {
                format!("killed by signal {sig:?}: {message}\n")
            };
            stderr_buffer.extend_from_slice(note.as_bytes());
            result = Some(signal_exit_status(&sig));
        }
    }

    match result {
        Some(exit_status) => Ok(CommandExecutedResult {
            stdout: stdout_buffer,
            stderr: stderr_buffer,
            exit_status,
        }),
        None => Err(super::Error::CommandDidntExit),
    }
}

/// Shell-style status for a process killed by `sig`: 128 plus the signal
/// number, 255 when the number is unknown.
pub fn signal_exit_status(sig: &Sig) -> u32 {
    let number = match sig {
        Sig::HUP => 1,
        Sig::INT => 2,
        Sig::QUIT => 3,
        Sig::ILL => 4,
        Sig::ABRT => 6,
        Sig::FPE => 8,
        Sig::KILL => 9,
        Sig::USR1 => 10,
        Sig::SEGV => 11,
        Sig::PIPE => 13,
        Sig::ALRM => 14,
        Sig::TERM => 15,
        _ => return 255,
    };
    128 + number
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_exit_status() {
        assert_eq!(signal_exit_status(&Sig::TERM), 143);
        assert_eq!(signal_exit_status(&Sig::KILL), 137);
        assert_eq!(signal_exit_status(&Sig::SEGV), 139);
        assert_eq!(signal_exit_status(&Sig::Custom("XCPU".to_string())), 255);
    }
}
