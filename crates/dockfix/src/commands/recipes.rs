use std::fmt::Write as _;

use anyhow::Result;
use clap::Parser;
use dockfix_rewrite::OptionKind;
use dockfix_rewrite::RecipeDescriptor;

use crate::args::Args;
use crate::commands::Command;
use crate::exit::Exit;
use crate::project::Project;

#[derive(Debug, Parser)]
pub struct Recipes {
    /// Print the catalog as JSON.
    #[arg(long)]
    json: bool,
}

impl Command for Recipes {
    fn execute(&self, _project: &Project, _args: &Args) -> Result<Exit> {
        let catalog: Vec<&RecipeDescriptor> = dockfix_recipes::catalog().collect();
        if self.json {
            println!("{}", serde_json::to_string_pretty(&catalog)?);
        } else {
            print!("{}", listing(&catalog));
        }
        Ok(Exit::success())
    }
}

fn kind_name(kind: OptionKind) -> &'static str {
    match kind {
        OptionKind::String => "string",
        OptionKind::Boolean => "boolean",
        OptionKind::Integer => "integer",
        OptionKind::StringList => "list",
    }
}

fn listing(catalog: &[&RecipeDescriptor]) -> String {
    let mut out = String::new();
    for descriptor in catalog {
        let _ = writeln!(out, "{} ({})", descriptor.name, descriptor.display_name);
        let _ = writeln!(out, "    {}", descriptor.description);
        for option in descriptor.options {
            let required = if option.required { ", required" } else { "" };
            let _ = write!(
                out,
                "    --option {}=<{}{required}>  {}",
                option.name,
                kind_name(option.kind),
                option.description
            );
            if let Some(example) = option.example {
                let _ = write!(out, " Example: {example}");
            }
            out.push('\n');
        }
        out.push('\n');
    }
    out
}
