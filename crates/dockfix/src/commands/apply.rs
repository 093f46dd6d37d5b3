use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use clap::Parser;
use dockfix_recipes::recipe_from_options;
use dockfix_recipes::registry;
use dockfix_rewrite::apply_all;
use dockfix_rewrite::OptionKind;
use dockfix_rewrite::Recipe;
use dockfix_syntax::print;
use dockfix_syntax::ParseError;
use dockfix_syntax::ParseOutcome;
use rayon::prelude::*;
use serde_json::Map;
use serde_json::Value;
use similar::TextDiff;

use super::check::pick_renderer;
use super::check::read_stdin;
use super::check::reads_stdin;
use super::check::render_parse_error;
use crate::args::Args;
use crate::args::WalkArgs;
use crate::commands::Command;
use crate::exit::Exit;
use crate::project::Project;

#[derive(Debug, Parser)]
pub struct Apply {
    /// Files or directories to rewrite, or `-` for stdin. Defaults to the
    /// current directory.
    paths: Vec<Utf8PathBuf>,

    /// Run this recipe instead of the ones in the settings.
    #[arg(long, short, value_name = "NAME")]
    recipe: Option<String>,

    /// Option for --recipe. Repeatable.
    #[arg(long = "option", short = 'o', value_name = "KEY=VALUE", requires = "recipe")]
    options: Vec<String>,

    /// Write the changes back to the files.
    #[arg(long, conflicts_with = "diff")]
    write: bool,

    /// Print a unified diff instead of the rewritten text.
    #[arg(long)]
    diff: bool,

    #[command(flatten)]
    walk: WalkArgs,
}

/// What happened to one file.
enum Outcome {
    Unchanged,
    Changed { before: String, after: String },
    Unparsed { source: String, error: ParseError },
}

impl Command for Apply {
    fn execute(&self, project: &Project, _args: &Args) -> Result<Exit> {
        let recipes = self.recipes(project)?;
        if recipes.is_empty() {
            return Ok(Exit::error().with_message(
                "No recipes to run. Pass --recipe or add [[recipes]] to dockfix.toml.",
            ));
        }
        // Nothing is read or written unless every recipe is usable.
        for recipe in &recipes {
            dockfix_rewrite::validate(recipe.as_ref())?;
        }

        if reads_stdin(&self.paths) {
            return self.apply_stdin(&recipes);
        }

        let files = project.files(&self.paths, &self.walk)?;
        if files.is_empty() {
            tracing::warn!("no build files found");
            return Ok(Exit::success());
        }

        let results: Vec<(Utf8PathBuf, Result<Outcome>)> = files
            .into_par_iter()
            .map(|path| {
                let outcome = self.apply_file(&path, &recipes);
                (path, outcome)
            })
            .collect();

        let fmt = pick_renderer(std::io::stderr().is_terminal());
        let mut changed = 0usize;
        let mut failed = 0usize;
        let several = results.len() > 1;
        for (path, result) in results {
            let shown = project.display(&path);
            match result {
                Ok(Outcome::Unchanged) => tracing::debug!(path = %shown, "unchanged"),
                Ok(Outcome::Changed { before, after }) => {
                    changed += 1;
                    tracing::info!(path = %shown, "changed");
                    self.report(shown, &before, &after, several);
                }
                Ok(Outcome::Unparsed { source, error }) => {
                    failed += 1;
                    let rendered = render_parse_error(&source, shown.as_str(), &error, &fmt);
                    eprintln!("{rendered}\n");
                }
                Err(err) => {
                    failed += 1;
                    eprintln!("error: {shown}: {err:#}");
                }
            }
        }

        let verb = if self.write { "Rewrote" } else { "Would rewrite" };
        let file_word = |count: usize| if count == 1 { "file" } else { "files" };
        let mut summary = format!("{verb} {changed} {}.", file_word(changed));
        if failed > 0 {
            summary.push_str(&format!(" Skipped {failed} {} with errors.", file_word(failed)));
            return Ok(Exit::error().with_message(summary));
        }
        if self.write || self.diff {
            return Ok(Exit::success().with_message(summary));
        }
        Ok(Exit::success())
    }
}

impl Apply {
    fn recipes(&self, project: &Project) -> Result<Vec<Box<dyn Recipe>>> {
        let Some(name) = &self.recipe else {
            return project.configured_recipes();
        };
        let options = parse_options(name, &self.options)?;
        let recipe = recipe_from_options(name, Value::Object(options))?;
        Ok(vec![recipe])
    }

    fn apply_file(&self, path: &Utf8Path, recipes: &[Box<dyn Recipe>]) -> Result<Outcome> {
        let source =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
        let outcome = rewrite(source, recipes)?;
        if self.write {
            if let Outcome::Changed { after, .. } = &outcome {
                std::fs::write(path, after).with_context(|| format!("Failed to write {path}"))?;
            }
        }
        Ok(outcome)
    }

    fn apply_stdin(&self, recipes: &[Box<dyn Recipe>]) -> Result<Exit> {
        if self.write {
            bail!("--write cannot be used with stdin");
        }
        let source = read_stdin()?;
        match rewrite(source.clone(), recipes)? {
            Outcome::Unchanged => {
                if !self.diff {
                    print!("{source}");
                }
                Ok(Exit::success())
            }
            Outcome::Changed { before, after } => {
                self.report(Utf8Path::new("<stdin>"), &before, &after, false);
                Ok(Exit::success())
            }
            Outcome::Unparsed { source, error } => {
                let fmt = pick_renderer(std::io::stderr().is_terminal());
                let rendered = render_parse_error(&source, "<stdin>", &error, &fmt);
                eprintln!("{rendered}\n");
                Ok(Exit::error().with_message("Skipped 1 file with errors."))
            }
        }
    }

    fn report(&self, path: &Utf8Path, before: &str, after: &str, several: bool) {
        if self.write {
            return;
        }
        if self.diff {
            print!("{}", unified_diff(path, before, after));
        } else if several {
            println!("==> {path} <==");
            print!("{after}");
        } else {
            print!("{after}");
        }
    }
}

fn rewrite(source: String, recipes: &[Box<dyn Recipe>]) -> Result<Outcome> {
    let document = match ParseOutcome::from_text(&source) {
        ParseOutcome::Parsed(document) => Arc::new(document),
        ParseOutcome::Unparsed { text, error } => {
            tracing::debug!(code = error.diagnostic_code(), "skipping file that does not parse");
            return Ok(Outcome::Unparsed {
                source: text,
                error,
            });
        }
    };
    let run = apply_all(recipes, &document)?;
    if !run.changed {
        return Ok(Outcome::Unchanged);
    }
    let after = print(&run.document);
    Ok(Outcome::Changed {
        before: source,
        after,
    })
}

fn unified_diff(path: &Utf8Path, before: &str, after: &str) -> String {
    TextDiff::from_lines(before, after)
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{path}"), &format!("b/{path}"))
        .to_string()
}

/// `key=value` pairs typed by the recipe's declared option kinds. Names the
/// recipe does not declare are passed through as strings so the recipe can
/// reject them.
fn parse_options(recipe: &str, pairs: &[String]) -> Result<Map<String, Value>> {
    let descriptor = registry::descriptor(recipe);
    let mut options = Map::new();
    for pair in pairs {
        let Some((key, raw)) = pair.split_once('=') else {
            bail!("Option '{pair}' is not of the form key=value");
        };
        let kind = descriptor
            .and_then(|descriptor| descriptor.options.iter().find(|option| option.name == key))
            .map_or(OptionKind::String, |option| option.kind);
        let value = match kind {
            OptionKind::String => Value::from(raw),
            OptionKind::Boolean => Value::from(
                raw.parse::<bool>()
                    .with_context(|| format!("Option '{key}' expects true or false"))?,
            ),
            OptionKind::Integer => Value::from(
                raw.parse::<i64>()
                    .with_context(|| format!("Option '{key}' expects a number"))?,
            ),
            OptionKind::StringList => Value::from(
                raw.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .collect::<Vec<_>>(),
            ),
        };
        options.insert(key.to_string(), value);
    }
    Ok(options)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn pairs(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn options_follow_declared_kinds() {
        let options = parse_options(
            "add-healthcheck",
            &pairs(&["cmd=curl -f localhost || exit 1", "retries=3", "interval=30s"]),
        )
        .unwrap();
        assert_eq!(
            Value::Object(options),
            json!({"cmd": "curl -f localhost || exit 1", "retries": 3, "interval": "30s"})
        );

        let options =
            parse_options("change-base-image", &pairs(&["new_tag=22.04", "new_digest="])).unwrap();
        assert_eq!(Value::Object(options), json!({"new_tag": "22.04", "new_digest": ""}));

        let options =
            parse_options("combine-run-instructions", &pairs(&["separator= ; "])).unwrap();
        assert_eq!(Value::Object(options), json!({"separator": " ; "}));
    }

    #[test]
    fn bad_option_syntax() {
        let err = parse_options("add-exposed-port", &pairs(&["port"])).unwrap_err();
        assert_eq!(err.to_string(), "Option 'port' is not of the form key=value");

        let err = parse_options("convert-to-exec-form", &pairs(&["include_run=yes"])).unwrap_err();
        assert_eq!(err.to_string(), "Option 'include_run' expects true or false");
    }

    #[test]
    fn diff_has_headers() {
        let diff = unified_diff(
            Utf8Path::new("Dockerfile"),
            "FROM alpine\nADD a /a\n",
            "FROM alpine\nCOPY a /a\n",
        );
        insta::assert_snapshot!(diff, @r"
        --- a/Dockerfile
        +++ b/Dockerfile
        @@ -1,2 +1,2 @@
         FROM alpine
        -ADD a /a
        +COPY a /a
        ");
    }

    #[test]
    fn unparsable_files_are_kept_opaque() {
        let outcome = rewrite("RUN make\n".to_string(), &[]).unwrap();
        let Outcome::Unparsed { source, error } = outcome else {
            panic!("expected a parse failure");
        };
        assert_eq!(source, "RUN make\n");
        assert_eq!(error.diagnostic_code(), "P105");
    }
}
