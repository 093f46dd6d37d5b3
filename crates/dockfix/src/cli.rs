use std::ffi::OsString;

use anyhow::Result;
use clap::Parser;

use crate::args::Args;
use crate::commands::Command;
use crate::commands::DockfixCommand;
use crate::exit::Exit;
use crate::project::Project;

/// Rewrite Dockerfiles with configurable recipes, keeping everything else
/// byte for byte.
#[derive(Parser)]
#[command(name = "dockfix")]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: DockfixCommand,

    #[command(flatten)]
    pub args: Args,
}

/// Parse CLI arguments and execute the chosen command
pub fn run<I>(args: I) -> Result<Exit>
where
    I: IntoIterator,
    I::Item: Into<OsString> + Clone,
{
    let cli = Cli::try_parse_from(args).unwrap_or_else(|e| {
        e.exit();
    });

    let project = Project::load(cli.args.global.config.as_deref())?;
    crate::logging::init(&cli.args.global, project.settings.debug);
    tracing::debug!(root = %project.root, "project loaded");
    cli.command.execute(&project, &cli.args)
}
