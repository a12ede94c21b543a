//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod board;
pub mod core;
pub mod update_index;

use anyhow::Result;
use clap::Subcommand;

use crate::cli::context::Context;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download the package indexes
    UpdateIndex,

    /// Platform management subcommands
    Core {
        #[command(subcommand)]
        command: CoreCommands,
    },

    /// Board subcommands
    Board {
        #[command(subcommand)]
        command: BoardCommands,
    },
}

/// Platform subcommands
#[derive(Subcommand, Debug)]
pub enum CoreCommands {
    /// Install platforms and the tools they need
    Install {
        /// Platforms as PACKAGE:ARCH[@VERSION]
        #[arg(required = true)]
        platforms: Vec<String>,

        /// Do not run post_install scripts
        #[arg(long)]
        skip_post_install: bool,

        /// Fail if another version of the platform is installed
        #[arg(long)]
        no_overwrite: bool,
    },

    /// Uninstall platforms and the tools nothing else needs
    Uninstall {
        /// Platforms as PACKAGE:ARCH[@VERSION]
        #[arg(required = true)]
        platforms: Vec<String>,

        /// Do not run pre_uninstall scripts
        #[arg(long)]
        skip_pre_uninstall: bool,
    },

    /// Upgrade platforms to their latest version
    Upgrade {
        /// Platforms as PACKAGE:ARCH (upgrades all installed if not specified)
        platforms: Vec<String>,
    },

    /// List installed platforms
    List {
        /// Also list platforms that are not installed
        #[arg(long)]
        all: bool,
    },

    /// Search platforms by id, name or board
    Search {
        /// Search terms
        query: Vec<String>,
    },
}

/// Board subcommands
#[derive(Subcommand, Debug)]
pub enum BoardCommands {
    /// Show board information
    Details {
        /// Fully qualified board name
        fqbn: String,

        /// Print the resolved build properties
        #[arg(long)]
        show_properties: bool,
    },

    /// List boards of installed platforms
    Listall {
        /// Only boards whose name contains every term
        query: Vec<String>,
    },
}

impl Commands {
    /// Execute the command
    pub async fn run(self, ctx: &Context) -> Result<()> {
        match self {
            Self::UpdateIndex => update_index::execute(ctx).await,
            Self::Core { command } => match command {
                CoreCommands::Install {
                    platforms,
                    skip_post_install,
                    no_overwrite,
                } => self::core::execute_install(ctx, &platforms, skip_post_install, no_overwrite).await,
                CoreCommands::Uninstall {
                    platforms,
                    skip_pre_uninstall,
                } => self::core::execute_uninstall(ctx, &platforms, skip_pre_uninstall).await,
                CoreCommands::Upgrade { platforms } => {
                    self::core::execute_upgrade(ctx, &platforms).await
                }
                CoreCommands::List { all } => self::core::execute_list(ctx, all).await,
                CoreCommands::Search { query } => {
                    self::core::execute_search(ctx, &query.join(" ")).await
                }
            },
            Self::Board { command } => match command {
                BoardCommands::Details {
                    fqbn,
                    show_properties,
                } => board::execute_details(ctx, &fqbn, show_properties).await,
                BoardCommands::Listall { query } => {
                    board::execute_listall(ctx, &query.join(" ")).await
                }
            },
        }
    }
}
