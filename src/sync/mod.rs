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

//! Mirror a local directory tree onto a remote path.
//!
//! The tree is walked one depth at a time. For every directory of the
//! current depth its files are dispatched first (their remote parent already
//! exists), then its subdirectories. Once the whole depth has been
//! dispatched, the synchronizer waits for every directory creation of that
//! depth before listing the next one, so no task ever targets a remote
//! directory that has not been created yet.
//!
//! The first failure stops dispatch; tasks already running are allowed to
//! finish and the failure is returned with the paths of the task that caused
//! it. Nothing already transferred is rolled back, and re-running over the
//! same tree is safe.

pub mod path;
mod pool;
pub mod progress;
pub mod task;
mod walker;

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::transport::Connection;
use pool::WorkerPool;
use walker::Walker;

pub use progress::{NoProgress, SyncProgress};
pub use task::TransferTask;

/// Worker pool size used when none is configured.
pub const DEFAULT_WORKERS: usize = 4;

/// What to do with symbolic links found in the local tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymlinkPolicy {
    /// Leave them out and log a warning.
    #[default]
    Skip,
    /// Synchronize the target as if it were a regular file or directory.
    Follow,
    /// Abort the synchronization.
    Reject,
}

impl FromStr for SymlinkPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "follow" => Ok(Self::Follow),
            "reject" => Ok(Self::Reject),
            other => Err(Error::Config(format!(
                "unknown symlink policy '{other}' (expected skip, follow or reject)"
            ))),
        }
    }
}

impl fmt::Display for SymlinkPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::Follow => write!(f, "follow"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub worker_pool_size: usize,
    pub symlink_policy: SymlinkPolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            worker_pool_size: DEFAULT_WORKERS,
            symlink_policy: SymlinkPolicy::default(),
        }
    }
}

impl SyncOptions {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.worker_pool_size = workers;
        self
    }

    pub fn with_symlink_policy(mut self, policy: SymlinkPolicy) -> Self {
        self.symlink_policy = policy;
        self
    }
}

/// Summary of a completed synchronization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Includes the remote root itself.
    pub directories_created: u64,
    pub files_copied: u64,
    pub bytes_copied: u64,
    pub entries_skipped: u64,
    pub elapsed: Duration,
}

pub struct Synchronizer<C: Connection + ?Sized + 'static> {
    conn: Arc<C>,
    options: SyncOptions,
    progress: Arc<dyn SyncProgress>,
}

impl<C: Connection + ?Sized + 'static> Synchronizer<C> {
    pub fn new(conn: Arc<C>, options: SyncOptions) -> Self {
        Self {
            conn,
            options,
            progress: Arc::new(NoProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn SyncProgress>) -> Self {
        self.progress = progress;
        self
    }

    /// Copy the tree under `local_root` to `remote_root`.
    ///
    /// Cancelling `cancel` aborts in-flight tasks and makes the call return
    /// [`Error::Cancelled`].
    pub async fn sync(
        &self,
        local_root: &Path,
        remote_root: &str,
        cancel: &CancellationToken,
    ) -> Result<SyncReport> {
        if self.options.worker_pool_size == 0 {
            return Err(Error::Config(
                "worker pool size must be greater than 0".to_string(),
            ));
        }
        if remote_root.trim().is_empty() {
            return Err(Error::Config("remote root cannot be empty".to_string()));
        }

        let started = Instant::now();
        let walker = Walker::new(self.options.symlink_policy);
        let root = walker.root(local_root, remote_root).await?;

        tracing::info!(
            "Synchronizing {} -> {}:{} with {} workers",
            local_root.display(),
            self.conn.describe(),
            root.remote,
            self.options.worker_pool_size
        );

        let mut pool = WorkerPool::new(
            Arc::clone(&self.conn),
            self.options.worker_pool_size,
            Arc::clone(&self.progress),
            cancel,
        );
        let mut skipped: u64 = 0;

        // Depth 0: the remote root itself.
        self.progress.entries_discovered(1);
        let mut level = JoinSet::new();
        if pool
            .dispatch_dir(&mut level, TransferTask::create_dir(&root.local, &root.remote))
            .await
        {
            pool.barrier(level).await;
        }

        let mut frontier = vec![root];
        let mut depth = 0usize;
        while !frontier.is_empty() && !pool.is_stopped() {
            depth += 1;
            tracing::debug!("Walking depth {} ({} directories)", depth, frontier.len());

            let mut level = JoinSet::new();
            let mut next = Vec::new();
            for dir in &frontier {
                if pool.is_stopped() {
                    break;
                }
                let listing = match walker.list(dir).await {
                    Ok(listing) => listing,
                    Err(e) => {
                        pool.fail(e);
                        break;
                    }
                };
                self.progress.entries_discovered(listing.len() as u64);

                for entry in &listing.skipped {
                    skipped += 1;
                    self.progress.entry_skipped(&entry.local, entry.reason);
                }
                for task in listing.files.iter().cloned() {
                    if !pool.dispatch_file(task).await {
                        break;
                    }
                }
                for task in listing.dir_tasks() {
                    if !pool.dispatch_dir(&mut level, task).await {
                        break;
                    }
                }
                next.extend(listing.dirs);
            }

            pool.barrier(level).await;
            frontier = next;
        }

        let totals = pool.finish().await?;
        let report = SyncReport {
            directories_created: totals.directories_created,
            files_copied: totals.files_copied,
            bytes_copied: totals.bytes_copied,
            entries_skipped: skipped,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            "Synchronized {} directories and {} files ({} bytes) in {:.2?}",
            report.directories_created,
            report.files_copied,
            report.bytes_copied,
            report.elapsed
        );
        Ok(report)
    }
}

/// Synchronize `local_root` to `remote_root` without external cancellation.
pub async fn sync<C>(
    conn: Arc<C>,
    local_root: &Path,
    remote_root: &str,
    options: SyncOptions,
) -> Result<SyncReport>
where
    C: Connection + ?Sized + 'static,
{
    Synchronizer::new(conn, options)
        .sync(local_root, remote_root, &CancellationToken::new())
        .await
}
