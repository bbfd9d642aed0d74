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

//! In-memory stand-in for an SSH connection.
//!
//! Commands of the form `mkdir -p -- <words>` are interpreted against an
//! in-memory directory set; every other command succeeds with empty output
//! unless a response was scripted. Every call is recorded in order.

#![allow(dead_code)]

use async_trait::async_trait;
use sshsync::{Connection, Error, RawOutput, RemoteFile, Result, Session};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::AsyncWrite;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Exec(String),
    OpenFile(String),
    CloseFile(String),
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    dirs: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
    responses: HashMap<String, RawOutput>,
    fail_mkdir: HashSet<String>,
    fail_open: HashSet<String>,
    fail_write: HashSet<String>,
    exec_delay: Option<Duration>,
    open_delay: Option<Duration>,
    open_delays: HashMap<String, Duration>,
    strict_parents: bool,
    closed: bool,
    live_sessions: usize,
    active: usize,
    max_active: usize,
}

#[derive(Clone, Default)]
pub struct MockConnection {
    state: Arc<Mutex<State>>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn respond(&self, command: &str, output: RawOutput) {
        self.state().responses.insert(command.to_string(), output);
    }

    /// `mkdir -p` of exactly this path exits 1.
    pub fn fail_mkdir(&self, remote: &str) {
        self.state().fail_mkdir.insert(remote.to_string());
    }

    pub fn fail_open(&self, remote: &str) {
        self.state().fail_open.insert(remote.to_string());
    }

    pub fn fail_write(&self, remote: &str) {
        self.state().fail_write.insert(remote.to_string());
    }

    pub fn set_exec_delay(&self, delay: Duration) {
        self.state().exec_delay = Some(delay);
    }

    pub fn set_open_delay(&self, delay: Duration) {
        self.state().open_delay = Some(delay);
    }

    /// Make `mkdir -p` fail unless the parent already exists, so that a
    /// directory created before its parent shows up as an error.
    pub fn set_strict_parents(&self, strict: bool) {
        self.state().strict_parents = strict;
    }

    /// Delay opening one particular file.
    pub fn delay_open(&self, remote: &str, delay: Duration) {
        self.state().open_delays.insert(remote.to_string(), delay);
    }

    pub fn add_dir(&self, remote: &str) {
        insert_with_parents(&mut self.state().dirs, remote);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Exec(command) => Some(command),
                _ => None,
            })
            .collect()
    }

    pub fn opened_files(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::OpenFile(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn dirs(&self) -> BTreeSet<String> {
        self.state().dirs.clone()
    }

    pub fn files(&self) -> BTreeMap<String, Vec<u8>> {
        self.state().files.clone()
    }

    pub fn file(&self, remote: &str) -> Option<Vec<u8>> {
        self.state().files.get(remote).cloned()
    }

    /// Sessions and file handles not yet released.
    pub fn live_sessions(&self) -> usize {
        self.state().live_sessions
    }

    /// Highest number of operations observed running at once.
    pub fn max_active(&self) -> usize {
        self.state().max_active
    }

    fn begin(&self) {
        let mut state = self.state();
        state.live_sessions += 1;
        state.active += 1;
        state.max_active = state.max_active.max(state.active);
    }
}

fn insert_with_parents(dirs: &mut BTreeSet<String>, path: &str) {
    let mut current = String::new();
    for part in path.split('/') {
        if part.is_empty() {
            if current.is_empty() {
                current.push('/');
            }
            continue;
        }
        if !current.is_empty() && !current.ends_with('/') {
            current.push('/');
        }
        current.push_str(part);
        dirs.insert(current.clone());
    }
}

fn parent_of(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some(("", _)) => "/",
        Some((parent, _)) => parent,
        None => ".",
    }
}

/// Split a command line into words the way a POSIX shell would, for the
/// subset of syntax produced by single-quoting.
pub fn shell_words(line: &str) -> std::result::Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(inner) => word.push(inner),
                        None => return Err("unterminated quoted string".to_string()),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(escaped) => word.push(escaped),
                    None => return Err("trailing backslash".to_string()),
                }
            }
            ' ' | '\t' => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            '"' | '$' | '`' | ';' | '&' | '|' | '<' | '>' | '(' | ')' => {
                return Err(format!("unexpected shell metacharacter '{c}'"));
            }
            other => {
                in_word = true;
                word.push(other);
            }
        }
    }
    if in_word {
        words.push(word);
    }
    Ok(words)
}

#[async_trait]
impl Connection for MockConnection {
    async fn new_session(&self) -> Result<Box<dyn Session>> {
        if self.state().closed {
            return Err(Error::Transport("connection closed".to_string()));
        }
        self.state().live_sessions += 1;
        Ok(Box::new(MockSession {
            conn: self.clone(),
            running: false,
        }))
    }

    async fn open_file_for_write(&self, remote_path: &str) -> Result<RemoteFile> {
        let delay = {
            let mut state = self.state();
            if state.closed {
                return Err(Error::Transport("connection closed".to_string()));
            }
            state.calls.push(Call::OpenFile(remote_path.to_string()));
            state
                .open_delays
                .get(remote_path)
                .copied()
                .or(state.open_delay)
        };
        self.begin();
        let handle = MockFile {
            conn: self.clone(),
            path: remote_path.to_string(),
            released: false,
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        if state.fail_open.contains(remote_path) {
            return Err(Error::RemoteIo {
                path: remote_path.to_string(),
                message: "Permission denied".to_string(),
            });
        }
        if !state.dirs.contains(parent_of(remote_path)) {
            return Err(Error::RemoteIo {
                path: remote_path.to_string(),
                message: "No such file".to_string(),
            });
        }
        state.files.insert(remote_path.to_string(), Vec::new());
        drop(state);
        Ok(Box::new(handle))
    }

    async fn close(&self) -> Result<()> {
        self.state().closed = true;
        Ok(())
    }

    fn describe(&self) -> String {
        "mock@remote:22".to_string()
    }
}

struct MockSession {
    conn: MockConnection,
    running: bool,
}

impl MockSession {
    fn finish(&mut self) {
        if self.running {
            self.conn.state().active -= 1;
            self.running = false;
        }
    }
}

#[async_trait]
impl Session for MockSession {
    async fn exec(&mut self, command: &str) -> Result<RawOutput> {
        let delay = {
            let mut state = self.conn.state();
            if state.closed {
                return Err(Error::Transport("connection closed".to_string()));
            }
            state.calls.push(Call::Exec(command.to_string()));
            state.active += 1;
            state.max_active = state.max_active.max(state.active);
            state.exec_delay
        };
        self.running = true;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let output = {
            let mut state = self.conn.state();
            if let Some(output) = state.responses.get(command) {
                output.clone()
            } else if let Some(rest) = command.strip_prefix("mkdir -p -- ") {
                match shell_words(rest) {
                    Ok(paths) => {
                        let denied = paths.iter().find(|p| state.fail_mkdir.contains(*p)).cloned();
                        let orphan = paths
                            .iter()
                            .find(|p| state.strict_parents && !state.dirs.contains(parent_of(p)))
                            .cloned();
                        match (denied, orphan) {
                            (Some(path), _) => RawOutput {
                                stdout: Vec::new(),
                                stderr: format!(
                                    "mkdir: cannot create directory '{path}': Permission denied\n"
                                )
                                .into_bytes(),
                                exit_status: 1,
                            },
                            (None, Some(path)) => RawOutput {
                                stdout: Vec::new(),
                                stderr: format!(
                                    "mkdir: cannot create directory '{path}': No such file or directory\n"
                                )
                                .into_bytes(),
                                exit_status: 1,
                            },
                            (None, None) => {
                                for path in &paths {
                                    insert_with_parents(&mut state.dirs, path);
                                }
                                RawOutput::default()
                            }
                        }
                    }
                    Err(message) => RawOutput {
                        stdout: Vec::new(),
                        stderr: format!("sh: syntax error: {message}\n").into_bytes(),
                        exit_status: 2,
                    },
                }
            } else {
                RawOutput::default()
            }
        };
        self.finish();
        Ok(output)
    }

    async fn close(mut self: Box<Self>) -> Result<()> {
        self.finish();
        Ok(())
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.finish();
        self.conn.state().live_sessions -= 1;
    }
}

struct MockFile {
    conn: MockConnection,
    path: String,
    released: bool,
}

impl MockFile {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            let mut state = self.conn.state();
            state.active -= 1;
            state.live_sessions -= 1;
        }
    }
}

impl AsyncWrite for MockFile {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut state = self.conn.state();
        if state.closed {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "connection closed",
            )));
        }
        if state.fail_write.contains(&self.path) {
            return Poll::Ready(Err(io::Error::other("No space left on device")));
        }
        state
            .files
            .entry(self.path.clone())
            .or_default()
            .extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let path = self.path.clone();
        self.conn.state().calls.push(Call::CloseFile(path));
        self.release();
        Poll::Ready(Ok(()))
    }
}

impl Drop for MockFile {
    fn drop(&mut self) {
        self.release();
    }
}
