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

use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use super::path::mkdir_command;
use crate::command::{self, ExecOptions};
use crate::error::{Error, Result, TaskKind};
use crate::transfer;
use crate::transport::Connection;

/// One unit of synchronization work with both ends resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTask {
    pub kind: TaskKind,
    pub local: PathBuf,
    pub remote: String,
}

impl TransferTask {
    pub fn create_dir(local: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
        Self {
            kind: TaskKind::CreateDir,
            local: local.into(),
            remote: remote.into(),
        }
    }

    pub fn copy_file(local: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
        Self {
            kind: TaskKind::CopyFile,
            local: local.into(),
            remote: remote.into(),
        }
    }

    /// Run the task, racing `cancel`.
    ///
    /// Returns the number of bytes copied (zero for directories). Any error
    /// comes back wrapped with this task's paths.
    pub async fn execute<C>(&self, conn: &C, cancel: &CancellationToken) -> Result<u64>
    where
        C: Connection + ?Sized,
    {
        let work = async {
            match self.kind {
                TaskKind::CreateDir => {
                    command::run(conn, &mkdir_command(&self.remote), &ExecOptions::default())
                        .await
                        .map(|_| 0)
                }
                TaskKind::CopyFile => transfer::copy_file(conn, &self.local, &self.remote).await,
            }
        };

        // Losing the race drops `work`, and the session it holds with it.
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = work => result,
        };

        result.map_err(|e| e.for_task(self.kind, &self.local, &self.remote))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_set_kind() {
        let dir = TransferTask::create_dir("/l/a", "/r/a");
        assert_eq!(dir.kind, TaskKind::CreateDir);
        let file = TransferTask::copy_file("/l/a/f", "/r/a/f");
        assert_eq!(file.kind, TaskKind::CopyFile);
        assert_eq!(file.remote, "/r/a/f");
    }
}
