use camino::Utf8PathBuf;
use clap::Parser;
use dockfix_workspace::WalkOptions;

#[derive(Parser)]
pub struct Args {
    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Parser, Debug, Clone)]
pub struct GlobalArgs {
    /// Do not print any log output.
    #[arg(global = true, long, short, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Use verbose output. Repeat for more.
    #[arg(global = true, action = clap::ArgAction::Count, long, short, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Read settings from this file on top of the project and user config.
    #[arg(global = true, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,
}

/// File discovery flags shared by the commands that walk directories.
#[derive(Parser, Debug, Clone, Default)]
pub struct WalkArgs {
    /// Search hidden files and directories.
    #[arg(long)]
    pub hidden: bool,

    /// Do not respect .gitignore and other ignore files.
    #[arg(long)]
    pub no_ignore: bool,

    /// Include or exclude (with `!`) files matching this glob. Repeatable.
    #[arg(long = "glob", short = 'g', value_name = "GLOB")]
    pub globs: Vec<String>,
}

impl WalkArgs {
    pub fn options(&self) -> WalkOptions {
        WalkOptions {
            hidden: self.hidden,
            globs: self.globs.clone(),
            no_ignore: self.no_ignore,
            ..WalkOptions::default()
        }
    }
}
