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

//! Breadth-first enumeration of the local tree.
//!
//! The walker lists one directory at a time. Entries are sorted by file name
//! so that two runs over the same tree produce tasks in the same order.

use std::fs::FileType;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::path::{join_remote, normalize_remote_root};
use super::task::TransferTask;
use super::SymlinkPolicy;
use crate::error::{Error, Result};

/// Canonical paths from the root down to one directory.
///
/// Only tracked when symlinks are followed.
#[derive(Debug)]
struct Ancestry {
    path: PathBuf,
    parent: Option<Arc<Ancestry>>,
}

impl Ancestry {
    fn contains(&self, path: &Path) -> bool {
        let mut current = Some(self);
        while let Some(node) = current {
            if node.path == path {
                return true;
            }
            current = node.parent.as_deref();
        }
        false
    }
}

/// A local directory whose remote counterpart exists (or is being created).
#[derive(Debug, Clone)]
pub struct FrontierDir {
    pub local: PathBuf,
    pub remote: String,
    ancestry: Option<Arc<Ancestry>>,
}

/// An entry the walker left out, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub local: PathBuf,
    pub reason: &'static str,
}

/// Everything found directly inside one directory.
#[derive(Debug, Default)]
pub struct Listing {
    pub files: Vec<TransferTask>,
    pub dirs: Vec<FrontierDir>,
    pub skipped: Vec<Skipped>,
}

impl Listing {
    pub fn dir_tasks(&self) -> impl Iterator<Item = TransferTask> + '_ {
        self.dirs
            .iter()
            .map(|dir| TransferTask::create_dir(&dir.local, &dir.remote))
    }

    pub fn len(&self) -> usize {
        self.files.len() + self.dirs.len() + self.skipped.len()
    }
}

pub struct Walker {
    symlinks: SymlinkPolicy,
}

impl Walker {
    pub fn new(symlinks: SymlinkPolicy) -> Self {
        Self { symlinks }
    }

    /// The depth-0 directory. `local_root` must be an existing directory.
    pub async fn root(&self, local_root: &Path, remote_root: &str) -> Result<FrontierDir> {
        let metadata = tokio::fs::metadata(local_root)
            .await
            .map_err(|e| Error::local_io(local_root, e))?;
        if !metadata.is_dir() {
            return Err(Error::local_io(
                local_root,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
            ));
        }

        let ancestry = if self.symlinks == SymlinkPolicy::Follow {
            let canonical = tokio::fs::canonicalize(local_root)
                .await
                .map_err(|e| Error::local_io(local_root, e))?;
            Some(Arc::new(Ancestry {
                path: canonical,
                parent: None,
            }))
        } else {
            None
        };

        Ok(FrontierDir {
            local: local_root.to_path_buf(),
            remote: normalize_remote_root(remote_root),
            ancestry,
        })
    }

    /// List `dir`, sorted by file name.
    pub async fn list(&self, dir: &FrontierDir) -> Result<Listing> {
        let mut reader = tokio::fs::read_dir(&dir.local)
            .await
            .map_err(|e| Error::local_io(&dir.local, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| Error::local_io(&dir.local, e))?
        {
            entries.push(entry);
        }
        entries.sort_by_key(|entry| entry.file_name());

        let mut listing = Listing::default();
        for entry in entries {
            let local = entry.path();
            let name = entry.file_name();
            let name = name.to_str().ok_or_else(|| Error::InvalidPath {
                path: local.clone(),
                reason: "file name is not valid UTF-8",
            })?;
            let remote = join_remote(&dir.remote, name);
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| Error::local_io(&local, e))?;

            if file_type.is_symlink() {
                match self.symlinks {
                    SymlinkPolicy::Skip => skip(&mut listing, local, "symbolic link"),
                    SymlinkPolicy::Reject => {
                        return Err(Error::UnsupportedEntry {
                            path: local,
                            reason: "symbolic link",
                        })
                    }
                    SymlinkPolicy::Follow => match tokio::fs::metadata(&local).await {
                        Ok(target) => {
                            self.classify(dir, &mut listing, local, remote, target.file_type())
                                .await?
                        }
                        Err(_) => skip(&mut listing, local, "dangling symbolic link"),
                    },
                }
            } else {
                self.classify(dir, &mut listing, local, remote, file_type)
                    .await?;
            }
        }

        Ok(listing)
    }

    async fn classify(
        &self,
        parent: &FrontierDir,
        listing: &mut Listing,
        local: PathBuf,
        remote: String,
        file_type: FileType,
    ) -> Result<()> {
        if file_type.is_file() {
            listing.files.push(TransferTask::copy_file(local, remote));
        } else if file_type.is_dir() {
            let ancestry = match &parent.ancestry {
                Some(parent_ancestry) => {
                    let canonical = tokio::fs::canonicalize(&local)
                        .await
                        .map_err(|e| Error::local_io(&local, e))?;
                    if parent_ancestry.contains(&canonical) {
                        skip(listing, local, "directory cycle");
                        return Ok(());
                    }
                    Some(Arc::new(Ancestry {
                        path: canonical,
                        parent: Some(Arc::clone(parent_ancestry)),
                    }))
                }
                None => None,
            };
            listing.dirs.push(FrontierDir {
                local,
                remote,
                ancestry,
            });
        } else {
            skip(listing, local, "special file");
        }
        Ok(())
    }
}

fn skip(listing: &mut Listing, local: PathBuf, reason: &'static str) {
    tracing::warn!("Skipping {} ({})", local.display(), reason);
    listing.skipped.push(Skipped { local, reason });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn names(tasks: &[TransferTask]) -> Vec<String> {
        tasks.iter().map(|t| t.remote.clone()).collect()
    }

    #[tokio::test]
    async fn test_list_is_sorted_and_mapped() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("b.txt"), "b").unwrap();
        fs::write(temp.path().join("a.txt"), "a").unwrap();
        fs::create_dir(temp.path().join("zdir")).unwrap();
        fs::create_dir(temp.path().join("adir")).unwrap();

        let walker = Walker::new(SymlinkPolicy::Skip);
        let root = walker.root(temp.path(), "/r/").await.unwrap();
        assert_eq!(root.remote, "/r");

        let listing = walker.list(&root).await.unwrap();
        assert_eq!(names(&listing.files), vec!["/r/a.txt", "/r/b.txt"]);
        let dirs: Vec<_> = listing.dir_tasks().collect();
        assert_eq!(names(&dirs), vec!["/r/adir", "/r/zdir"]);
        assert_eq!(dirs[0].local, temp.path().join("adir"));
        assert!(listing.skipped.is_empty());
        assert_eq!(listing.len(), 4);
    }

    #[tokio::test]
    async fn test_root_must_be_directory() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("plain");
        fs::write(&file, "x").unwrap();

        let walker = Walker::new(SymlinkPolicy::Skip);
        let err = walker.root(&file, "/r").await.unwrap_err();
        assert!(matches!(err, Error::LocalIo { .. }));

        let err = walker.root(&temp.path().join("missing"), "/r").await.unwrap_err();
        assert!(matches!(err, Error::LocalIo { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_policies() {
        use std::os::unix::fs::symlink;

        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("target.txt"), "t").unwrap();
        symlink(temp.path().join("target.txt"), temp.path().join("link.txt")).unwrap();

        let walker = Walker::new(SymlinkPolicy::Skip);
        let root = walker.root(temp.path(), "/r").await.unwrap();
        let listing = walker.list(&root).await.unwrap();
        assert_eq!(names(&listing.files), vec!["/r/target.txt"]);
        assert_eq!(listing.skipped[0].reason, "symbolic link");

        let walker = Walker::new(SymlinkPolicy::Follow);
        let root = walker.root(temp.path(), "/r").await.unwrap();
        let listing = walker.list(&root).await.unwrap();
        assert_eq!(names(&listing.files), vec!["/r/link.txt", "/r/target.txt"]);

        let walker = Walker::new(SymlinkPolicy::Reject);
        let root = walker.root(temp.path(), "/r").await.unwrap();
        let err = walker.list(&root).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedEntry { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_follow_detects_cycles() {
        use std::os::unix::fs::symlink;

        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("a")).unwrap();
        symlink(temp.path(), temp.path().join("a").join("up")).unwrap();
        symlink(temp.path().join("gone"), temp.path().join("dangling")).unwrap();

        let walker = Walker::new(SymlinkPolicy::Follow);
        let root = walker.root(temp.path(), "/r").await.unwrap();
        let listing = walker.list(&root).await.unwrap();
        assert_eq!(listing.dirs.len(), 1);
        assert_eq!(listing.skipped[0].reason, "dangling symbolic link");

        let nested = walker.list(&listing.dirs[0]).await.unwrap();
        assert!(nested.dirs.is_empty());
        assert_eq!(nested.skipped[0].reason, "directory cycle");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sibling_symlink_is_not_a_cycle() {
        use std::os::unix::fs::symlink;

        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("b")).unwrap();
        symlink(temp.path().join("b"), temp.path().join("a")).unwrap();

        let walker = Walker::new(SymlinkPolicy::Follow);
        let root = walker.root(temp.path(), "/r").await.unwrap();
        let listing = walker.list(&root).await.unwrap();
        let dirs: Vec<_> = listing.dir_tasks().collect();
        assert_eq!(names(&dirs), vec!["/r/a", "/r/b"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_special_files_are_skipped() {
        let temp = TempDir::new().unwrap();
        let _listener =
            std::os::unix::net::UnixListener::bind(temp.path().join("sock")).unwrap();

        let walker = Walker::new(SymlinkPolicy::Skip);
        let root = walker.root(temp.path(), "/r").await.unwrap();
        let listing = walker.list(&root).await.unwrap();
        assert!(listing.files.is_empty());
        assert_eq!(
            listing.skipped,
            vec![Skipped {
                local: temp.path().join("sock"),
                reason: "special file"
            }]
        );
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_non_utf8_name_is_rejected() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(OsStr::from_bytes(b"bad\xff")), "x").unwrap();

        let walker = Walker::new(SymlinkPolicy::Skip);
        let root = walker.root(temp.path(), "/r").await.unwrap();
        let err = walker.list(&root).await.unwrap_err();
        assert!(matches!(err, Error::InvalidPath { .. }));
    }
}
