//! Rewrite shell-form commands as JSON arrays.

use std::sync::Arc;

use dockfix_rewrite::OptionKind;
use dockfix_rewrite::OptionSpec;
use dockfix_rewrite::Recipe;
use dockfix_rewrite::RecipeDescriptor;
use dockfix_rewrite::VisitContext;
use dockfix_rewrite::Visitor;
use dockfix_syntax::split_shell_words;
use dockfix_syntax::Cmd;
use dockfix_syntax::CommandForm;
use dockfix_syntax::Entrypoint;
use dockfix_syntax::ExecForm;
use dockfix_syntax::Instruction;
use dockfix_syntax::Run;
use serde::Deserialize;

pub static DESCRIPTOR: RecipeDescriptor = RecipeDescriptor {
    name: "convert-to-exec-form",
    display_name: "Convert commands to exec form",
    description: "Rewrite shell-form CMD and ENTRYPOINT as JSON arrays so the process receives \
                  signals directly. Commands that need a shell are left alone.",
    options: &[OptionSpec::new(
        "include_run",
        OptionKind::Boolean,
        "Also convert RUN instructions.",
    )],
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConvertToExecForm {
    #[serde(default)]
    pub include_run: bool,
}

impl Recipe for ConvertToExecForm {
    fn descriptor(&self) -> &'static RecipeDescriptor {
        &DESCRIPTOR
    }

    fn visitor(&self) -> Option<Box<dyn Visitor>> {
        Some(Box::new(ToExecForm {
            include_run: self.include_run,
        }))
    }
}

struct ToExecForm {
    include_run: bool,
}

/// The exec form equivalent of a shell-form command, if there is one.
fn exec_form(command: &CommandForm, escape: char) -> Option<CommandForm> {
    let CommandForm::Shell(shell) = command else {
        return None;
    };
    let words = split_shell_words(&shell.text(), escape).filter(|words| !words.is_empty())?;
    Some(CommandForm::Exec(Arc::new(ExecForm::from_values(
        shell.prefix.clone(),
        &words,
    ))))
}

impl Visitor for ToExecForm {
    fn visit_cmd(&mut self, node: &Arc<Cmd>, cx: &mut VisitContext) -> Instruction {
        let Some(command) = exec_form(&node.command, cx.escape()) else {
            return Instruction::Cmd(Arc::clone(node));
        };
        Instruction::Cmd(Arc::new(Cmd {
            command,
            ..(**node).clone()
        }))
    }

    fn visit_entrypoint(&mut self, node: &Arc<Entrypoint>, cx: &mut VisitContext) -> Instruction {
        let Some(command) = exec_form(&node.command, cx.escape()) else {
            return Instruction::Entrypoint(Arc::clone(node));
        };
        Instruction::Entrypoint(Arc::new(Entrypoint {
            command,
            ..(**node).clone()
        }))
    }

    fn visit_run(&mut self, node: &Arc<Run>, cx: &mut VisitContext) -> Instruction {
        let command = self
            .include_run
            .then(|| exec_form(&node.command, cx.escape()))
            .flatten();
        let Some(command) = command else {
            return Instruction::Run(Arc::clone(node));
        };
        Instruction::Run(Arc::new(Run {
            command,
            ..(**node).clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::rewrite_noop;
    use crate::testing::rewrite_test;

    #[test]
    fn entrypoint_words() {
        rewrite_test(
            &ConvertToExecForm::default(),
            "FROM alpine\nENTRYPOINT /app/server --port 8080\n",
            "FROM alpine\nENTRYPOINT [\"/app/server\", \"--port\", \"8080\"]\n",
        );
    }

    #[test]
    fn quoted_words_stay_whole() {
        rewrite_test(
            &ConvertToExecForm::default(),
            "FROM alpine\nCMD echo \"hello world\" 'it''s'\n",
            "FROM alpine\nCMD [\"echo\", \"hello world\", \"its\"]\n",
        );
    }

    #[test]
    fn commands_that_need_a_shell() {
        rewrite_noop(
            &ConvertToExecForm::default(),
            "FROM alpine\nCMD make && ./run\nENTRYPOINT exec $BINARY\nCMD cat <<EOF\nhi\nEOF\n",
        );
    }

    #[test]
    fn run_only_when_asked() {
        let input = "FROM alpine\nRUN make install\nCMD [\"make\"]\n";
        rewrite_noop(&ConvertToExecForm::default(), input);
        rewrite_test(
            &ConvertToExecForm { include_run: true },
            input,
            "FROM alpine\nRUN [\"make\", \"install\"]\nCMD [\"make\"]\n",
        );
    }

    #[test]
    fn windows_paths_under_backtick_escape() {
        rewrite_test(
            &ConvertToExecForm::default(),
            "# escape=`\nFROM mcr.microsoft.com/windows\nCMD C:\\app\\server.exe --port 80\n",
            "# escape=`\nFROM mcr.microsoft.com/windows\nCMD [\"C:\\\\app\\\\server.exe\", \"--port\", \"80\"]\n",
        );
    }
}
