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

//! Local-to-remote path mapping and shell quoting.

/// Quote `s` as a single POSIX shell word.
///
/// The result is wrapped in single quotes; embedded single quotes are written
/// as `'\''`. No other character is special inside single quotes, so the
/// remote shell sees `s` byte for byte.
pub fn shell_quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('\'');
    for c in s.chars() {
        if c == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(c);
        }
    }
    quoted.push('\'');
    quoted
}

/// The remote command that creates `remote_dir` and any missing parents.
///
/// `--` ends option parsing, so a path starting with `-` is still a path.
pub fn mkdir_command(remote_dir: &str) -> String {
    format!("mkdir -p -- {}", shell_quote(remote_dir))
}

/// Drop trailing slashes from a remote root, keeping a bare `/` intact.
pub fn normalize_remote_root(remote_root: &str) -> String {
    let trimmed = remote_root.trim_end_matches('/');
    if trimmed.is_empty() && remote_root.starts_with('/') {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Append one more path component to a remote path.
pub fn join_remote(base: &str, name: &str) -> String {
    if base.ends_with('/') {
        format!("{base}{name}")
    } else {
        format!("{base}/{name}")
    }
}
