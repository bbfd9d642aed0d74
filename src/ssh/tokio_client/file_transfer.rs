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

//! SFTP write streams.
//!
//! Each [`SftpWriter`] owns a dedicated channel running the `sftp`
//! subsystem, so concurrent writers never share a session. Some sshd
//! configurations disable sftp; a line such as `Subsystem sftp internal-sftp`
//! is needed on the remote side.

use russh_sftp::client::fs::File;
use russh_sftp::{client::SftpSession, protocol::OpenFlags};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;

use super::connection::Client;

impl Client {
    /// Start an sftp session on a fresh channel.
    pub async fn open_sftp(&self) -> Result<SftpSession, super::Error> {
        let channel = self.get_channel().await?;
        channel.request_subsystem(true, "sftp").await?;
        let sftp = SftpSession::new(channel.into_stream()).await?;
        Ok(sftp)
    }

    /// Create (or truncate) `dest_file_path` on the remote host for writing.
    ///
    /// The returned writer must be shut down to flush and close the remote
    /// handle. Dropping it releases the underlying channel either way.
    pub async fn create_remote_file<U: Into<String>>(
        &self,
        dest_file_path: U,
    ) -> Result<SftpWriter, super::Error> {
        let sftp = self.open_sftp().await?;
        let file = sftp
            .open_with_flags(
                dest_file_path,
                OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE,
            )
            .await?;
        Ok(SftpWriter { file, _sftp: sftp })
    }
}

/// A remote file opened for writing together with the sftp session that
/// carries it.
pub struct SftpWriter {
    file: File,
    // Keeps the subsystem channel alive for as long as the file is open.
    _sftp: SftpSession,
}

impl AsyncWrite for SftpWriter {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize, io::Error>> {
        Pin::new(&mut self.file).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        Pin::new(&mut self.file).poll_flush(cx)
    }

    fn poll_shutdown(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<(), io::Error>> {
        Pin::new(&mut self.file).poll_shutdown(cx)
    }
}
