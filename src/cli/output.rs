//! Output formatting and progress indicators
//!
//! This module provides utilities for displaying progress bars,
//! status messages and errors to the user.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::progress::{DownloadProgress, Progress, TaskProgress};

/// Create a progress bar for downloads
pub fn create_download_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .expect("Invalid progress bar template")
            .progress_chars("█▓▒░"),
    );
    pb
}

/// Print an error and its causes to stderr
pub fn display_error(error: &anyhow::Error) {
    eprintln!("{} {error}", status::ERROR);
    for cause in error.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }
}

/// Renders lifecycle progress, one bar per running download
#[derive(Default)]
struct ProgressRenderer {
    multi: MultiProgress,
    bars: Mutex<HashMap<String, ProgressBar>>,
}

impl ProgressRenderer {
    fn on_download(&self, event: &DownloadProgress) {
        match event {
            DownloadProgress::Start { label, .. } => {
                let bar = self.multi.add(create_download_bar(0));
                bar.set_message(label.clone());
                self.bars.lock().insert(label.clone(), bar);
            }
            DownloadProgress::Update {
                label,
                downloaded,
                total,
            } => {
                if let Some(bar) = self.bars.lock().get(label) {
                    if *total > 0 {
                        bar.set_length(*total);
                    }
                    bar.set_position(*downloaded);
                }
            }
            DownloadProgress::End {
                label,
                success,
                message,
            } => {
                if let Some(bar) = self.bars.lock().remove(label) {
                    bar.finish_and_clear();
                    self.multi.remove(&bar);
                }
                let prefix = if *success {
                    status::SUCCESS
                } else {
                    status::ERROR
                };
                let _ = self.multi.println(format!("{prefix} {message}"));
            }
        }
    }

    fn on_task(&self, event: &TaskProgress) {
        if event.completed {
            let line = if event.message.is_empty() {
                format!("{} {}", status::SUCCESS, event.name)
            } else {
                format!("{} {}: {}", status::SUCCESS, event.name, event.message)
            };
            let _ = self.multi.println(line);
        } else {
            tracing::info!("{}", event.name);
        }
    }
}

/// Progress callbacks drawing to the terminal; silent when `quiet`
pub fn progress(quiet: bool) -> Progress {
    if quiet {
        return Progress::silent();
    }
    let renderer = Arc::new(ProgressRenderer::default());
    if !console_attached() {
        renderer.multi.set_draw_target(ProgressDrawTarget::hidden());
    }
    let downloads = Arc::clone(&renderer);
    Progress::new(
        Arc::new(move |event: &DownloadProgress| downloads.on_download(event)),
        Arc::new(move |event: &TaskProgress| renderer.on_task(event)),
    )
}

fn console_attached() -> bool {
    use std::io::IsTerminal;
    std::io::stderr().is_terminal()
}

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";

    /// Info prefix (blue circle)
    pub const INFO: &str = "ℹ";
}
