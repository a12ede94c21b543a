//! Update-index command implementation
//!
//! Implements `platman update-index`.

use anyhow::Result;

use crate::cli::context::Context;
use crate::cli::output::{self, status};

/// Execute the update-index command
pub async fn execute(ctx: &Context) -> Result<()> {
    let urls = ctx.index_urls();
    let client = ctx.index_client();

    tracing::info!("Updating {} package index(es)...", urls.len());

    let report = client
        .update_indexes(&urls, &output::progress(ctx.quiet))
        .await;

    for path in &report.local {
        tracing::info!(path = %path.display(), "Local index checked");
    }
    for (url, error) in &report.failed {
        eprintln!("{} {url}: {error}", status::ERROR);
    }

    if !report.is_success() {
        anyhow::bail!(
            "{} of {} package index(es) could not be updated",
            report.failed.len(),
            urls.len()
        );
    }

    if !ctx.quiet {
        println!(
            "{} {} package index(es) up to date",
            status::SUCCESS,
            report.updated.len() + report.local.len()
        );
    }
    Ok(())
}
