//! Merge consecutive shell-form RUN instructions.

use std::sync::Arc;

use dockfix_rewrite::Iso;
use dockfix_rewrite::IsoVisitor;
use dockfix_rewrite::OptionKind;
use dockfix_rewrite::OptionSpec;
use dockfix_rewrite::Recipe;
use dockfix_rewrite::RecipeDescriptor;
use dockfix_rewrite::VisitContext;
use dockfix_rewrite::Visitor;
use dockfix_syntax::has_shell_comment;
use dockfix_syntax::CommandForm;
use dockfix_syntax::Instruction;
use dockfix_syntax::Run;
use dockfix_syntax::ShellForm;
use dockfix_syntax::Stage;
use itertools::Itertools;
use serde::Deserialize;

pub static DESCRIPTOR: RecipeDescriptor = RecipeDescriptor {
    name: "combine-run-instructions",
    display_name: "Combine RUN instructions",
    description: "Merge consecutive shell-form RUN instructions without flags into one, \
                  reducing the number of image layers.",
    options: &[OptionSpec::new(
        "separator",
        OptionKind::String,
        "Text placed between merged commands. Defaults to ` && `.",
    )
    .example(" && \\\n    ")],
};

const DEFAULT_SEPARATOR: &str = " && ";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CombineRunInstructions {
    pub separator: Option<String>,
}

impl Recipe for CombineRunInstructions {
    fn descriptor(&self) -> &'static RecipeDescriptor {
        &DESCRIPTOR
    }

    fn visitor(&self) -> Option<Box<dyn Visitor>> {
        let separator = self
            .separator
            .clone()
            .unwrap_or_else(|| DEFAULT_SEPARATOR.to_string());
        Some(Box::new(Iso(CombineRuns { separator })))
    }
}

struct CombineRuns {
    separator: String,
}

/// The shell form of a RUN that may be merged with its neighbours.
fn mergeable(instruction: &Instruction, escape: char) -> Option<(&Arc<Run>, &Arc<ShellForm>)> {
    let Instruction::Run(run) = instruction else {
        return None;
    };
    let CommandForm::Shell(shell) = &run.command else {
        return None;
    };
    if !run.flags.is_empty() {
        return None;
    }
    // Heredoc bodies and trailing comments must stay last on their line.
    let text = shell.text();
    if text.contains("<<") || has_shell_comment(&text, escape) {
        return None;
    }
    Some((run, shell))
}

impl CombineRuns {
    /// Emit the pending group as one RUN. Returns whether anything merged.
    fn flush(
        &self,
        group: &mut Vec<(&Arc<Run>, &Arc<ShellForm>)>,
        out: &mut Vec<Instruction>,
    ) -> bool {
        let merged = match group.as_slice() {
            [] => false,
            [(run, _)] => {
                out.push(Instruction::Run(Arc::clone(run)));
                false
            }
            [(first, shell), ..] => {
                let text = group.iter().map(|(_, shell)| shell.text()).join(&self.separator);
                tracing::trace!(count = group.len(), "combining RUN instructions");
                out.push(Instruction::Run(Arc::new(Run {
                    command: CommandForm::Shell(Arc::new(shell.with_text(text))),
                    ..Run::clone(first)
                })));
                true
            }
        };
        group.clear();
        merged
    }
}

impl IsoVisitor for CombineRuns {
    fn visit_stage(&mut self, stage: &Arc<Stage>, cx: &mut VisitContext) -> Arc<Stage> {
        let escape = cx.escape();
        let mut instructions: Vec<Instruction> = Vec::with_capacity(stage.instructions.len());
        let mut group: Vec<(&Arc<Run>, &Arc<ShellForm>)> = Vec::new();
        let mut changed = false;

        for instruction in &stage.instructions {
            match mergeable(instruction, escape) {
                // A commented RUN starts a group of its own so the comment
                // keeps describing the command under it.
                Some(entry) if group.is_empty() || entry.0.prefix.comments().next().is_none() => {
                    group.push(entry);
                }
                Some(entry) => {
                    changed |= self.flush(&mut group, &mut instructions);
                    group.push(entry);
                }
                None => {
                    changed |= self.flush(&mut group, &mut instructions);
                    instructions.push(instruction.clone());
                }
            }
        }
        changed |= self.flush(&mut group, &mut instructions);

        if !changed {
            return Arc::clone(stage);
        }
        Arc::new(Stage {
            instructions,
            ..(**stage).clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::rewrite_noop;
    use crate::testing::rewrite_test;

    #[test]
    fn merges_consecutive_runs() {
        rewrite_test(
            &CombineRunInstructions::default(),
            "FROM alpine\nRUN a\nRUN b\n",
            "FROM alpine\nRUN a && b\n",
        );
    }

    #[test]
    fn other_instructions_are_boundaries() {
        rewrite_noop(
            &CombineRunInstructions::default(),
            "FROM alpine\nRUN a\nCOPY . /src\nRUN b\n",
        );
    }

    #[test]
    fn flags_and_exec_form_are_boundaries() {
        rewrite_test(
            &CombineRunInstructions::default(),
            "FROM alpine\nRUN a\nRUN b\nRUN --mount=type=cache,target=/root/.cache c\nRUN [\"d\"]\nRUN e\nRUN f\n",
            "FROM alpine\nRUN a && b\nRUN --mount=type=cache,target=/root/.cache c\nRUN [\"d\"]\nRUN e && f\n",
        );
    }

    #[test]
    fn custom_separator() {
        let recipe = CombineRunInstructions {
            separator: Some(" && \\\n    ".to_string()),
        };
        rewrite_test(
            &recipe,
            "FROM alpine\nRUN apk update\nRUN apk add curl\n",
            "FROM alpine\nRUN apk update && \\\n    apk add curl\n",
        );
    }

    #[test]
    fn comments_start_a_new_group() {
        rewrite_test(
            &CombineRunInstructions::default(),
            "FROM alpine\nRUN a\nRUN b\n# tools\nRUN c\nRUN d\n",
            "FROM alpine\nRUN a && b\n# tools\nRUN c && d\n",
        );
    }

    #[test]
    fn stages_are_separate() {
        rewrite_noop(
            &CombineRunInstructions::default(),
            "FROM alpine AS one\nRUN a\nFROM alpine\nRUN b\n",
        );
    }

    #[test]
    fn trailing_comment_ends_the_group() {
        rewrite_noop(
            &CombineRunInstructions::default(),
            "FROM a\nRUN make # build it\nRUN make install\n",
        );
        rewrite_test(
            &CombineRunInstructions::default(),
            "FROM a\nRUN a\nRUN b\nRUN c # note\nRUN d\nRUN e\n",
            "FROM a\nRUN a && b\nRUN c # note\nRUN d && e\n",
        );
    }

    #[test]
    fn quoted_hash_is_not_a_comment() {
        rewrite_test(
            &CombineRunInstructions::default(),
            "FROM a\nRUN echo \"# hi\" > /motd\nRUN make\n",
            "FROM a\nRUN echo \"# hi\" > /motd && make\n",
        );
    }
}
