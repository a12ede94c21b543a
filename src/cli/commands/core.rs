//! Core subcommand implementations
//!
//! Implements `platman core install`, `uninstall`, `upgrade`, `list` and
//! `search`.

use anyhow::Result;

use crate::cli::context::Context;
use crate::cli::output::{self, status};
use crate::core::catalog::Platform;
use crate::core::install::{InstallOutcome, UninstallOutcome, UpgradeOutcome};
use crate::core::resolver::PlatformReference;

/// Execute the core install command
pub async fn execute_install(
    ctx: &Context,
    platforms: &[String],
    skip_post_install: bool,
    no_overwrite: bool,
) -> Result<()> {
    let references = parse_references(platforms)?;
    let manager = ctx.load_manager().await?;

    let mut options = ctx.install_options();
    options.skip_post_install |= skip_post_install;
    if no_overwrite {
        options.allow_overwrite = false;
    }
    let installer = ctx.installer(manager, options);
    let progress = output::progress(ctx.quiet);

    // One at a time: a later platform must see tools the earlier one installed
    for reference in &references {
        match installer.install(reference, &progress).await? {
            InstallOutcome::AlreadyInstalled(release) => {
                println!("{} Platform {release} already installed", status::INFO);
            }
            InstallOutcome::Installed {
                release,
                tools,
                replaced,
            } => {
                for tool in &tools {
                    tracing::info!(tool = %tool, "Tool installed");
                }
                println!("{} Platform {release} installed", status::SUCCESS);
                if let Some(old) = replaced {
                    println!("  Replaced {old}");
                }
            }
        }
    }
    Ok(())
}

/// Execute the core uninstall command
pub async fn execute_uninstall(
    ctx: &Context,
    platforms: &[String],
    skip_pre_uninstall: bool,
) -> Result<()> {
    let references = parse_references(platforms)?;
    let manager = ctx.load_manager().await?;

    let mut options = ctx.install_options();
    options.skip_pre_uninstall |= skip_pre_uninstall;
    let installer = ctx.installer(manager, options);
    let progress = output::progress(ctx.quiet);

    for reference in &references {
        match installer.uninstall(reference, &progress).await? {
            UninstallOutcome::NotInstalled => {
                println!("{} Platform {reference} is not installed", status::WARNING);
            }
            UninstallOutcome::Uninstalled {
                release,
                removed_tools,
            } => {
                println!("{} Platform {release} uninstalled", status::SUCCESS);
                for tool in removed_tools {
                    println!("  Removed tool {tool}");
                }
            }
        }
    }
    Ok(())
}

/// Execute the core upgrade command
///
/// Without platforms, every installed platform is upgraded.
pub async fn execute_upgrade(ctx: &Context, platforms: &[String]) -> Result<()> {
    let manager = ctx.load_manager().await?;

    let references = if platforms.is_empty() {
        let explorer = manager.new_explorer();
        explorer
            .installed_platform_releases()
            .into_iter()
            .map(|r| PlatformReference::new(&r.package, &r.architecture, None))
            .collect()
    } else {
        let references = parse_references(platforms)?;
        if let Some(pinned) = references.iter().find(|r| r.version.is_some()) {
            anyhow::bail!("Invalid platform '{pinned}': upgrade does not take a version");
        }
        references
    };

    if references.is_empty() {
        println!("No platforms installed.");
        return Ok(());
    }

    let installer = ctx.installer(manager, ctx.install_options());
    let progress = output::progress(ctx.quiet);

    for reference in &references {
        match installer.upgrade(reference, &progress).await? {
            UpgradeOutcome::AlreadyLatest(release) => {
                println!("{} Platform {release} is already the latest version", status::INFO);
            }
            UpgradeOutcome::Upgraded { from, to } => {
                println!(
                    "{} Platform {} upgraded from {} to {}",
                    status::SUCCESS,
                    reference.platform_key(),
                    from.version,
                    to.version
                );
            }
        }
    }
    Ok(())
}

/// Execute the core list command
pub async fn execute_list(ctx: &Context, all: bool) -> Result<()> {
    let manager = ctx.load_manager().await?;
    let explorer = manager.new_explorer();

    let platforms: Vec<&Platform> = explorer
        .packages()
        .flat_map(|p| p.platforms.values())
        .filter(|p| all || p.is_installed())
        .collect();

    if platforms.is_empty() {
        if all {
            println!("No platforms available.");
        } else {
            println!("No platforms installed.");
        }
        return Ok(());
    }

    print_platforms(&platforms);
    Ok(())
}

/// Execute the core search command
pub async fn execute_search(ctx: &Context, query: &str) -> Result<()> {
    let manager = ctx.load_manager().await?;
    let explorer = manager.new_explorer();

    tracing::info!("Searching for '{}'...", query);

    let platforms = explorer.search_platforms(query);
    if platforms.is_empty() {
        println!("No platforms found for '{query}'");
        return Ok(());
    }

    print_platforms(&platforms);
    Ok(())
}

fn parse_references(platforms: &[String]) -> Result<Vec<PlatformReference>> {
    platforms
        .iter()
        .map(|p| PlatformReference::parse(p).map_err(Into::into))
        .collect()
}

fn print_platforms(platforms: &[&Platform]) {
    println!("{:<28} {:<12} {:<12} Name", "ID", "Installed", "Latest");
    for platform in platforms {
        let installed = platform
            .installed_release()
            .map_or_else(|| "-".to_string(), |r| r.version.to_string());
        let latest = platform
            .latest
            .as_ref()
            .map_or_else(|| "-".to_string(), ToString::to_string);
        let name = platform
            .installed_release()
            .or_else(|| platform.latest_release())
            .map_or("", |r| r.name.as_str());
        let deprecated = if platform.deprecated {
            " [DEPRECATED]"
        } else {
            ""
        };
        println!(
            "{:<28} {:<12} {:<12} {name}{deprecated}",
            platform.key(),
            installed,
            latest
        );
    }
}
