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

//! Bounded worker pool for transfer tasks.
//!
//! A permit is taken from the semaphore *before* a task is spawned, so tasks
//! start in the order they are dispatched and a pool of one runs strictly
//! sequentially. File copies go to a set that is only drained at the end;
//! directory creations of one depth go to a separate set that the caller
//! waits on as a barrier.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use super::progress::SyncProgress;
use super::task::TransferTask;
use crate::error::{Error, Result, TaskKind};
use crate::transport::Connection;

/// Totals accumulated by the workers.
#[derive(Debug, Default)]
struct Counters {
    directories_created: AtomicU64,
    files_copied: AtomicU64,
    bytes_copied: AtomicU64,
}

/// What the workers got done, read once every task has been joined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Totals {
    pub directories_created: u64,
    pub files_copied: u64,
    pub bytes_copied: u64,
}

/// Shared between the dispatcher and every worker.
struct Shared<C: ?Sized> {
    conn: Arc<C>,
    progress: Arc<dyn SyncProgress>,
    counters: Counters,
    failure: Mutex<Option<Error>>,
    /// The caller's token. In-flight tasks abort when it fires.
    cancel: CancellationToken,
    /// Child of `cancel`, also fired by the first failure. Stops dispatch.
    stop: CancellationToken,
}

impl<C: ?Sized> Shared<C> {
    fn fail(&self, error: Error) {
        if error.is_cancelled() {
            self.stop.cancel();
            return;
        }
        if let Ok(mut slot) = self.failure.lock() {
            if slot.is_none() {
                tracing::error!("Stopping synchronization: {}", error);
                *slot = Some(error);
            } else {
                tracing::debug!("Additional failure after stop: {}", error);
            }
        }
        self.stop.cancel();
    }
}

pub(crate) struct WorkerPool<C: Connection + ?Sized + 'static> {
    shared: Arc<Shared<C>>,
    semaphore: Arc<Semaphore>,
    files: JoinSet<()>,
}

impl<C: Connection + ?Sized + 'static> WorkerPool<C> {
    pub fn new(
        conn: Arc<C>,
        workers: usize,
        progress: Arc<dyn SyncProgress>,
        cancel: &CancellationToken,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                conn,
                progress,
                counters: Counters::default(),
                failure: Mutex::new(None),
                cancel: cancel.clone(),
                stop: cancel.child_token(),
            }),
            semaphore: Arc::new(Semaphore::new(workers)),
            files: JoinSet::new(),
        }
    }

    /// Whether dispatch has stopped, through cancellation or a failure.
    pub fn is_stopped(&self) -> bool {
        self.shared.stop.is_cancelled()
    }

    /// Record a failure found outside a worker, such as an unreadable directory.
    pub fn fail(&self, error: Error) {
        self.shared.fail(error);
    }

    /// Wait for a free worker. `None` once dispatch has stopped.
    async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        if self.is_stopped() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.shared.stop.cancelled() => None,
            permit = Arc::clone(&self.semaphore).acquire_owned() => permit.ok(),
        }
    }

    fn spawn_into(
        shared: &Arc<Shared<C>>,
        set: &mut JoinSet<()>,
        task: TransferTask,
        permit: OwnedSemaphorePermit,
    ) {
        let shared = Arc::clone(shared);
        set.spawn(async move {
            let _permit = permit;
            match task.execute(shared.conn.as_ref(), &shared.cancel).await {
                Ok(bytes) => match task.kind {
                    TaskKind::CreateDir => {
                        shared
                            .counters
                            .directories_created
                            .fetch_add(1, Ordering::Relaxed);
                        shared.progress.directory_created(&task.remote);
                    }
                    TaskKind::CopyFile => {
                        shared.counters.files_copied.fetch_add(1, Ordering::Relaxed);
                        shared
                            .counters
                            .bytes_copied
                            .fetch_add(bytes, Ordering::Relaxed);
                        shared.progress.file_copied(&task.local, &task.remote, bytes);
                    }
                },
                Err(e) => shared.fail(e),
            }
        });
    }

    /// Queue a file copy. Returns `false` once dispatch has stopped.
    pub async fn dispatch_file(&mut self, task: TransferTask) -> bool {
        let Some(permit) = self.acquire().await else {
            return false;
        };
        Self::spawn_into(&self.shared, &mut self.files, task, permit);
        self.reap_files();
        true
    }

    /// Queue a directory creation into `level`. Returns `false` once dispatch
    /// has stopped.
    pub async fn dispatch_dir(&self, level: &mut JoinSet<()>, task: TransferTask) -> bool {
        let Some(permit) = self.acquire().await else {
            return false;
        };
        Self::spawn_into(&self.shared, level, task, permit);
        true
    }

    /// Wait for every task in `level`. This is the per-depth barrier.
    pub async fn barrier(&self, mut level: JoinSet<()>) {
        while let Some(joined) = level.join_next().await {
            self.check_join(joined);
        }
    }

    /// Collect file copies that already finished, without waiting.
    fn reap_files(&mut self) {
        while let Some(joined) = self.files.try_join_next() {
            self.check_join(joined);
        }
    }

    fn check_join(&self, joined: std::result::Result<(), JoinError>) {
        if let Err(e) = joined {
            self.shared.fail(Error::Worker(e.to_string()));
        }
    }

    /// Drain all outstanding work and produce the overall outcome.
    ///
    /// Caller cancellation wins over any recorded failure.
    pub async fn finish(mut self) -> Result<Totals> {
        while let Some(joined) = self.files.join_next().await {
            self.check_join(joined);
        }

        if self.shared.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let failure = match self.shared.failure.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(error) = failure {
            return Err(error);
        }

        let counters = &self.shared.counters;
        Ok(Totals {
            directories_created: counters.directories_created.load(Ordering::Relaxed),
            files_copied: counters.files_copied.load(Ordering::Relaxed),
            bytes_copied: counters.bytes_copied.load(Ordering::Relaxed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_failure_wins() {
        let cancel = CancellationToken::new();
        let shared: Shared<()> = Shared {
            conn: Arc::new(()),
            progress: Arc::new(super::super::progress::NoProgress),
            counters: Counters::default(),
            failure: Mutex::new(None),
            cancel: cancel.clone(),
            stop: cancel.child_token(),
        };

        shared.fail(Error::Transport("first".into()));
        shared.fail(Error::Transport("second".into()));

        assert!(shared.stop.is_cancelled());
        assert!(!cancel.is_cancelled());
        let stored = shared.failure.lock().unwrap().take().unwrap();
        assert_eq!(stored.to_string(), "SSH transport error: first");
    }

    #[test]
    fn test_cancelled_is_not_recorded_as_failure() {
        let cancel = CancellationToken::new();
        let shared: Shared<()> = Shared {
            conn: Arc::new(()),
            progress: Arc::new(super::super::progress::NoProgress),
            counters: Counters::default(),
            failure: Mutex::new(None),
            cancel: cancel.clone(),
            stop: cancel.child_token(),
        };

        shared.fail(Error::Cancelled);
        assert!(shared.stop.is_cancelled());
        assert!(shared.failure.lock().unwrap().is_none());
    }
}
