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

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use owo_colors::OwoColorize;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::sync::{SyncOptions, SyncProgress, SyncReport, Synchronizer};
use crate::transport::Connection;
use crate::utils::format_bytes;

/// Draws synchronization progress on an indicatif bar.
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    pub fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

impl SyncProgress for ProgressReporter {
    fn entries_discovered(&self, count: u64) {
        self.bar.inc_length(count);
    }

    fn directory_created(&self, remote: &str) {
        self.bar.set_message(remote.to_string());
        self.bar.inc(1);
    }

    fn file_copied(&self, _local: &Path, remote: &str, _bytes: u64) {
        self.bar.set_message(remote.to_string());
        self.bar.inc(1);
    }

    fn entry_skipped(&self, _local: &Path, _reason: &str) {
        self.bar.inc(1);
    }
}

pub(crate) fn create_progress_style() -> Result<ProgressStyle> {
    ProgressStyle::default_bar()
        .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
        .map_err(|e| anyhow::anyhow!("Failed to create progress bar template: {e}"))
        .map(|style| style.progress_chars("=> ").tick_chars("⣾⣽⣻⢿⡿⣟⣯⣷ "))
}

/// Mirror `local` to `remote`, cancelling cleanly on Ctrl-C.
pub async fn sync_directory<C>(
    conn: Arc<C>,
    local: &Path,
    remote: &str,
    options: SyncOptions,
    show_progress: bool,
) -> Result<SyncReport>
where
    C: Connection + ?Sized + 'static,
{
    println!(
        "\n{} {} {} {} {}:{} {}\n",
        "▶".cyan(),
        "Synchronizing".cyan().bold(),
        local.display().to_string().yellow(),
        "→".dimmed(),
        conn.describe().green(),
        remote.green(),
        format!("({} workers)", options.worker_pool_size).dimmed()
    );

    let bar = if show_progress {
        let bar = ProgressBar::new(0);
        bar.set_style(create_progress_style()?);
        bar
    } else {
        ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::hidden())
    };
    let reporter = Arc::new(ProgressReporter::new(bar));

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, stopping after in-flight transfers");
                cancel.cancel();
            }
        })
    };

    let result = Synchronizer::new(conn, options)
        .with_progress(Arc::clone(&reporter) as Arc<dyn SyncProgress>)
        .sync(local, remote, &cancel)
        .await;
    watcher.abort();
    reporter.bar().finish_and_clear();

    let report = result.with_context(|| {
        format!("Failed to synchronize {} to {remote}", local.display())
    })?;
    print_summary(&report);
    Ok(report)
}

fn print_summary(report: &SyncReport) {
    println!(
        "{} {} directories, {} files, {} in {:.2?}",
        "●".green(),
        report.directories_created.to_string().yellow(),
        report.files_copied.to_string().yellow(),
        format_bytes(report.bytes_copied).yellow(),
        report.elapsed
    );
    if report.entries_skipped > 0 {
        println!(
            "{} {} entries skipped (run with -v for details)",
            "●".yellow(),
            report.entries_skipped
        );
    }
}
