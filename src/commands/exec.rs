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

use anyhow::Result;
use std::io::Write;

use crate::command::{run_unchecked, CommandOutput, ExecOptions};
use crate::transport::Connection;

/// Run `command` remotely, relay its output and return its exit status.
pub async fn execute_command<C>(conn: &C, command: &str, options: &ExecOptions) -> Result<u32>
where
    C: Connection + ?Sized,
{
    tracing::info!("Executing on {}: {}", conn.describe(), command);
    let output = run_unchecked(conn, command, options).await?;
    print_output(&output, options)?;

    if !output.is_success() {
        tracing::debug!("Remote command exited with status {}", output.exit_status);
    }
    Ok(output.exit_status)
}

fn print_output(output: &CommandOutput, options: &ExecOptions) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&output.output())?;
    stdout.flush()?;

    if !options.merge_stderr && !output.stderr.is_empty() {
        let mut stderr = std::io::stderr().lock();
        stderr.write_all(&output.stderr)?;
        stderr.flush()?;
    }
    Ok(())
}

/// Map a remote exit status onto a process exit code.
pub fn exit_code(status: u32) -> i32 {
    i32::try_from(status).map_or(1, |code| code.clamp(0, 255))
}
