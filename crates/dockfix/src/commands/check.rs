use std::io::IsTerminal;
use std::io::Read as _;

use anyhow::Context;
use anyhow::Result;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use clap::Parser;
use dockfix_source::Diagnostic;
use dockfix_source::DiagnosticRenderer;
use dockfix_source::Severity;
use dockfix_syntax::ParseError;
use rayon::prelude::*;

use crate::args::Args;
use crate::args::WalkArgs;
use crate::commands::Command;
use crate::exit::Exit;
use crate::project::Project;

#[derive(Debug, Parser)]
pub struct Check {
    /// Files or directories to check, or `-` for stdin. Defaults to the
    /// current directory.
    paths: Vec<Utf8PathBuf>,

    #[command(flatten)]
    walk: WalkArgs,
}

impl Command for Check {
    fn execute(&self, project: &Project, _args: &Args) -> Result<Exit> {
        let fmt = pick_renderer(std::io::stdout().is_terminal());

        if reads_stdin(&self.paths) {
            return check_stdin(&fmt);
        }

        let files = project.files(&self.paths, &self.walk)?;
        if files.is_empty() {
            tracing::warn!("no build files found");
            return Ok(Exit::success());
        }

        // Parse in parallel, render on the main thread in path order.
        let results: Vec<(Utf8PathBuf, Result<Option<Invalid>>)> = files
            .into_par_iter()
            .map(|path| {
                let result = check_file(&path);
                (path, result)
            })
            .collect();

        let mut error_count: usize = 0;
        for (path, result) in &results {
            let shown = project.display(path);
            match result {
                Ok(None) => {}
                Ok(Some(invalid)) => {
                    error_count += 1;
                    let rendered =
                        render_parse_error(&invalid.source, shown.as_str(), &invalid.error, &fmt);
                    println!("{rendered}\n");
                }
                Err(err) => {
                    error_count += 1;
                    eprintln!("error: {shown}: {err:#}");
                }
            }
        }

        if error_count > 0 {
            let file_word = if error_count == 1 { "file" } else { "files" };
            Ok(Exit::error().with_message(format!("Found errors in {error_count} {file_word}.")))
        } else {
            Ok(Exit::success())
        }
    }
}

struct Invalid {
    source: String,
    error: ParseError,
}

fn check_file(path: &Utf8Path) -> Result<Option<Invalid>> {
    let source = std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
    Ok(dockfix_syntax::parse(&source)
        .err()
        .map(|error| Invalid { source, error }))
}

fn check_stdin(fmt: &DiagnosticRenderer) -> Result<Exit> {
    let source = read_stdin()?;
    match dockfix_syntax::parse(&source) {
        Ok(_) => Ok(Exit::success()),
        Err(error) => {
            println!("{}\n", render_parse_error(&source, "<stdin>", &error, fmt));
            Ok(Exit::error().with_message("Found errors in 1 file."))
        }
    }
}

pub(crate) fn reads_stdin(paths: &[Utf8PathBuf]) -> bool {
    matches!(paths, [only] if only.as_str() == "-")
}

pub(crate) fn read_stdin() -> Result<String> {
    let mut source = String::new();
    std::io::stdin()
        .read_to_string(&mut source)
        .context("Failed to read stdin")?;
    Ok(source)
}

pub(crate) fn render_parse_error(
    source: &str,
    path: &str,
    error: &ParseError,
    fmt: &DiagnosticRenderer,
) -> String {
    let message = error.message();
    let mut diagnostic = Diagnostic::new(
        source,
        path,
        error.diagnostic_code(),
        &message,
        Severity::Error,
        error.span,
        "",
    );
    if let Some(help) = error.kind.help() {
        diagnostic = diagnostic.note(help);
    }
    fmt.render(&diagnostic)
}

/// Styled output only when the stream the diagnostics go to is a terminal.
pub(crate) fn pick_renderer(terminal: bool) -> DiagnosticRenderer {
    if terminal {
        DiagnosticRenderer::styled()
    } else {
        DiagnosticRenderer::plain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_with_code_and_path() {
        let source = "FROM alpine\nRUNN make\n";
        let error = dockfix_syntax::parse(source).unwrap_err();
        let output = render_parse_error(source, "Dockerfile", &error, &DiagnosticRenderer::plain());
        assert!(output.contains("error[P101]"), "{output}");
        assert!(output.contains("Dockerfile"), "{output}");
        assert!(output.contains("RUNN make"), "{output}");
    }

    #[test]
    fn notes_carry_the_usual_fix() {
        let source = "RUN make\nFROM alpine\n";
        let error = dockfix_syntax::parse(source).unwrap_err();
        let output = render_parse_error(source, "Dockerfile", &error, &DiagnosticRenderer::plain());
        assert!(output.contains("error[P105]"), "{output}");
        assert!(output.contains("only ARG may appear before the first FROM"), "{output}");
    }

    #[test]
    fn dash_means_stdin() {
        assert!(reads_stdin(&[Utf8PathBuf::from("-")]));
        assert!(!reads_stdin(&[]));
        assert!(!reads_stdin(&[Utf8PathBuf::from("-"), Utf8PathBuf::from("x")]));
    }
}
