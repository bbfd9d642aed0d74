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

//! Stream one local file into a newly created remote file.

use std::io;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::transport::Connection;

/// Size of each chunk moved from the local file to the remote one.
pub const COPY_CHUNK_SIZE: usize = 64 * 1024;

/// Copy `local_path` to `remote_path`, creating or truncating the remote file.
///
/// The remote parent directory must already exist. On failure the remote
/// file may be left truncated; nothing is retried. Returns the number of
/// bytes written.
pub async fn copy_file<C>(conn: &C, local_path: &Path, remote_path: &str) -> Result<u64>
where
    C: Connection + ?Sized,
{
    let mut source = File::open(local_path)
        .await
        .map_err(|e| Error::local_io(local_path, e))?;

    let mut sink = conn.open_file_for_write(remote_path).await?;

    let mut buffer = vec![0u8; COPY_CHUNK_SIZE];
    let mut total: u64 = 0;
    loop {
        let n = source
            .read(&mut buffer)
            .await
            .map_err(|e| Error::local_io(local_path, e))?;
        if n == 0 {
            break;
        }
        sink.write_all(&buffer[..n])
            .await
            .map_err(|e| write_error(remote_path, e))?;
        total += n as u64;
    }

    sink.shutdown()
        .await
        .map_err(|e| write_error(remote_path, e))?;

    tracing::debug!(
        "Copied {} -> {} ({} bytes)",
        local_path.display(),
        remote_path,
        total
    );
    Ok(total)
}

/// A dead channel is a transport failure; anything else is the remote file's fault.
fn write_error(remote_path: &str, e: io::Error) -> Error {
    match e.kind() {
        io::ErrorKind::BrokenPipe
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::UnexpectedEof => Error::Transport(format!("{remote_path}: {e}")),
        _ => Error::remote_io(remote_path, e),
    }
}
