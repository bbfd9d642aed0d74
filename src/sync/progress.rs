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

use std::path::Path;

/// Observer for a running synchronization.
///
/// Callbacks run on worker tasks, possibly concurrently, so implementations
/// must be cheap and thread-safe.
pub trait SyncProgress: Send + Sync {
    /// Entries discovered while walking one directory.
    fn entries_discovered(&self, _count: u64) {}

    fn directory_created(&self, _remote: &str) {}

    fn file_copied(&self, _local: &Path, _remote: &str, _bytes: u64) {}

    /// An entry was left out (symlink, special file or cycle).
    fn entry_skipped(&self, _local: &Path, _reason: &str) {}
}

/// Ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl SyncProgress for NoProgress {}
