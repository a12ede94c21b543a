//! Board subcommand implementations
//!
//! Implements `platman board details` and `platman board listall`.

use anyhow::Result;

use crate::cli::context::Context;
use crate::core::board::Board;
use crate::core::fqbn::Fqbn;

/// Execute the board details command
///
/// With `show_properties`, prints only the resolved build properties.
pub async fn execute_details(ctx: &Context, fqbn: &str, show_properties: bool) -> Result<()> {
    let fqbn = Fqbn::parse(fqbn)?;
    let manager = ctx.load_manager().await?;
    let explorer = manager.new_explorer();

    let resolved = explorer.resolve_fqbn(&fqbn)?;

    if show_properties {
        for (key, value) in resolved.build_properties.iter() {
            println!("{key}={value}");
        }
        return Ok(());
    }

    let board = resolved.board;
    let release = resolved.platform_release;

    println!("Board name:    {}", board.name());
    println!("FQBN:          {}", board.fqbn());
    println!("Platform:      {} ({})", release.id(), release.name);
    if !resolved.package.maintainer.is_empty() {
        println!("Maintainer:    {}", resolved.package.maintainer);
    }
    if let Some(reference) = resolved.reference_platform_release {
        println!("Core from:     {}", reference.id());
    }

    let options = board.config_options(&release.menus);
    if !options.is_empty() {
        let defaults = board.default_config();
        println!();
        println!("Options:");
        for (option, label) in options {
            let selected = fqbn
                .configs
                .get(&option)
                .or_else(|| defaults.get(&option));
            println!("  {label} ({option})");
            for (value, value_label) in board.config_option_values(&option).iter() {
                let marker = if selected == Some(value) { "*" } else { " " };
                println!("    {marker} {value_label} ({option}={value})");
            }
        }
    }

    if !release.programmers.is_empty() {
        println!();
        println!("Programmers:");
        for (id, programmer) in &release.programmers {
            println!("  {id:<20} {}", programmer.name);
        }
    }

    let tools = explorer.find_tools_required_for_build(release, resolved.build_platform_release())?;
    if !tools.is_empty() {
        println!();
        println!("Required tools:");
        for tool in tools {
            println!("  {tool}");
        }
    }

    Ok(())
}

/// Execute the board listall command
pub async fn execute_listall(ctx: &Context, query: &str) -> Result<()> {
    let manager = ctx.load_manager().await?;
    let explorer = manager.new_explorer();

    let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
    let mut boards: Vec<&Board> = explorer
        .installed_boards()
        .into_iter()
        .filter(|b| !b.is_hidden())
        .filter(|b| {
            let name = b.name().to_lowercase();
            terms.iter().all(|t| name.contains(t.as_str()))
        })
        .collect();

    if boards.is_empty() {
        println!("No boards found.");
        return Ok(());
    }

    boards.sort_by(|a, b| a.name().cmp(b.name()).then_with(|| a.fqbn().cmp(&b.fqbn())));

    println!("{:<40} FQBN", "Board Name");
    for board in &boards {
        println!("{:<40} {}", board.name(), board.fqbn());
    }
    println!();
    println!("{} board(s) available.", boards.len());
    Ok(())
}
