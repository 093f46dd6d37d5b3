mod apply;
mod check;
mod recipes;

use anyhow::Result;
use clap::Subcommand;

use crate::args::Args;
use crate::exit::Exit;
use crate::project::Project;

pub trait Command {
    fn execute(&self, project: &Project, args: &Args) -> Result<Exit>;
}

#[derive(Debug, Subcommand)]
pub enum DockfixCommand {
    /// Apply recipes to build files
    Apply(self::apply::Apply),
    /// Report files that fail to parse
    Check(self::check::Check),
    /// List the available recipes and their options
    Recipes(self::recipes::Recipes),
}

impl Command for DockfixCommand {
    fn execute(&self, project: &Project, args: &Args) -> Result<Exit> {
        match self {
            DockfixCommand::Apply(command) => command.execute(project, args),
            DockfixCommand::Check(command) => command.execute(project, args),
            DockfixCommand::Recipes(command) => command.execute(project, args),
        }
    }
}
