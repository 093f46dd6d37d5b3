use std::sync::Arc;

use dockfix_syntax::Add;
use dockfix_syntax::Arg;
use dockfix_syntax::Argument;
use dockfix_syntax::Cmd;
use dockfix_syntax::CommandForm;
use dockfix_syntax::Copy;
use dockfix_syntax::Document;
use dockfix_syntax::Entrypoint;
use dockfix_syntax::Env;
use dockfix_syntax::ExecForm;
use dockfix_syntax::Expose;
use dockfix_syntax::Flag;
use dockfix_syntax::Healthcheck;
use dockfix_syntax::HealthcheckCheck;
use dockfix_syntax::HeredocForm;
use dockfix_syntax::Instruction;
use dockfix_syntax::KeyValue;
use dockfix_syntax::Label;
use dockfix_syntax::Maintainer;
use dockfix_syntax::Onbuild;
use dockfix_syntax::Operands;
use dockfix_syntax::Run;
use dockfix_syntax::Shell;
use dockfix_syntax::ShellForm;
use dockfix_syntax::Stage;
use dockfix_syntax::StageAlias;
use dockfix_syntax::Stopsignal;
use dockfix_syntax::User;
use dockfix_syntax::Volume;
use dockfix_syntax::Workdir;

use crate::VisitContext;

/// Rewriting traversal over a build document.
///
/// Every method receives a node and returns its replacement. The defaults
/// walk into children and hand back the *same* `Arc` when no child changed,
/// so overriding one method touches only the nodes that method rewrites.
/// Instruction methods return [`Instruction`], which lets an override swap
/// one instruction kind for another; visitors that never do that should
/// implement [`crate::IsoVisitor`] instead.
pub trait Visitor {
    fn visit_document(
        &mut self,
        document: &Arc<Document>,
        cx: &mut VisitContext,
    ) -> Arc<Document> {
        walk_document(self, document, cx)
    }

    fn visit_stage(&mut self, stage: &Arc<Stage>, cx: &mut VisitContext) -> Arc<Stage> {
        walk_stage(self, stage, cx)
    }

    fn visit_from(
        &mut self,
        from: &Arc<dockfix_syntax::From>,
        cx: &mut VisitContext,
    ) -> Arc<dockfix_syntax::From> {
        walk_from(self, from, cx)
    }

    fn visit_stage_alias(
        &mut self,
        alias: &Arc<StageAlias>,
        cx: &mut VisitContext,
    ) -> Arc<StageAlias> {
        walk_stage_alias(self, alias, cx)
    }

    /// Dispatch to the method for the instruction's kind.
    fn visit_instruction(
        &mut self,
        instruction: &Instruction,
        cx: &mut VisitContext,
    ) -> Instruction {
        walk_instruction(self, instruction, cx)
    }

    fn visit_add(&mut self, node: &Arc<Add>, cx: &mut VisitContext) -> Instruction {
        Instruction::Add(walk_add(self, node, cx))
    }

    fn visit_arg(&mut self, node: &Arc<Arg>, cx: &mut VisitContext) -> Instruction {
        Instruction::Arg(walk_arg(self, node, cx))
    }

    fn visit_cmd(&mut self, node: &Arc<Cmd>, cx: &mut VisitContext) -> Instruction {
        Instruction::Cmd(walk_cmd(self, node, cx))
    }

    fn visit_copy(&mut self, node: &Arc<Copy>, cx: &mut VisitContext) -> Instruction {
        Instruction::Copy(walk_copy(self, node, cx))
    }

    fn visit_entrypoint(&mut self, node: &Arc<Entrypoint>, cx: &mut VisitContext) -> Instruction {
        Instruction::Entrypoint(walk_entrypoint(self, node, cx))
    }

    fn visit_env(&mut self, node: &Arc<Env>, cx: &mut VisitContext) -> Instruction {
        Instruction::Env(walk_env(self, node, cx))
    }

    fn visit_expose(&mut self, node: &Arc<Expose>, cx: &mut VisitContext) -> Instruction {
        Instruction::Expose(walk_expose(self, node, cx))
    }

    fn visit_healthcheck(
        &mut self,
        node: &Arc<Healthcheck>,
        cx: &mut VisitContext,
    ) -> Instruction {
        Instruction::Healthcheck(walk_healthcheck(self, node, cx))
    }

    fn visit_label(&mut self, node: &Arc<Label>, cx: &mut VisitContext) -> Instruction {
        Instruction::Label(walk_label(self, node, cx))
    }

    fn visit_maintainer(&mut self, node: &Arc<Maintainer>, cx: &mut VisitContext) -> Instruction {
        Instruction::Maintainer(walk_maintainer(self, node, cx))
    }

    fn visit_onbuild(&mut self, node: &Arc<Onbuild>, cx: &mut VisitContext) -> Instruction {
        Instruction::Onbuild(walk_onbuild(self, node, cx))
    }

    fn visit_run(&mut self, node: &Arc<Run>, cx: &mut VisitContext) -> Instruction {
        Instruction::Run(walk_run(self, node, cx))
    }

    fn visit_shell(&mut self, node: &Arc<Shell>, cx: &mut VisitContext) -> Instruction {
        Instruction::Shell(walk_shell(self, node, cx))
    }

    fn visit_stopsignal(&mut self, node: &Arc<Stopsignal>, cx: &mut VisitContext) -> Instruction {
        Instruction::Stopsignal(walk_stopsignal(self, node, cx))
    }

    fn visit_user(&mut self, node: &Arc<User>, cx: &mut VisitContext) -> Instruction {
        Instruction::User(walk_user(self, node, cx))
    }

    fn visit_volume(&mut self, node: &Arc<Volume>, cx: &mut VisitContext) -> Instruction {
        Instruction::Volume(walk_volume(self, node, cx))
    }

    fn visit_workdir(&mut self, node: &Arc<Workdir>, cx: &mut VisitContext) -> Instruction {
        Instruction::Workdir(walk_workdir(self, node, cx))
    }

    /// May return a different form than it was given (shell to exec).
    fn visit_command_form(&mut self, form: &CommandForm, cx: &mut VisitContext) -> CommandForm {
        walk_command_form(self, form, cx)
    }

    fn visit_shell_form(
        &mut self,
        form: &Arc<ShellForm>,
        cx: &mut VisitContext,
    ) -> Arc<ShellForm> {
        walk_shell_form(self, form, cx)
    }

    fn visit_exec_form(&mut self, form: &Arc<ExecForm>, _cx: &mut VisitContext) -> Arc<ExecForm> {
        Arc::clone(form)
    }

    fn visit_heredoc_form(
        &mut self,
        form: &Arc<HeredocForm>,
        cx: &mut VisitContext,
    ) -> Arc<HeredocForm> {
        walk_heredoc_form(self, form, cx)
    }

    fn visit_operands(&mut self, operands: &Operands, cx: &mut VisitContext) -> Operands {
        walk_operands(self, operands, cx)
    }

    fn visit_flag(&mut self, flag: &Arc<Flag>, cx: &mut VisitContext) -> Arc<Flag> {
        walk_flag(self, flag, cx)
    }

    fn visit_key_value(&mut self, pair: &Arc<KeyValue>, cx: &mut VisitContext) -> Arc<KeyValue> {
        walk_key_value(self, pair, cx)
    }

    fn visit_argument(
        &mut self,
        argument: &Arc<Argument>,
        _cx: &mut VisitContext,
    ) -> Arc<Argument> {
        Arc::clone(argument)
    }
}

/// Tracks whether any child came back as a different node.
#[derive(Default)]
struct Rebuild {
    changed: bool,
}

impl Rebuild {
    fn arc<T>(&mut self, original: &Arc<T>, visited: Arc<T>) -> Arc<T> {
        self.changed |= !Arc::ptr_eq(original, &visited);
        visited
    }

    fn option<T>(
        &mut self,
        original: Option<&Arc<T>>,
        visit: impl FnOnce(&Arc<T>) -> Arc<T>,
    ) -> Option<Arc<T>> {
        original.map(|node| {
            let visited = visit(node);
            self.arc(node, visited)
        })
    }

    fn list<T>(
        &mut self,
        original: &[Arc<T>],
        mut visit: impl FnMut(&Arc<T>) -> Arc<T>,
    ) -> Vec<Arc<T>> {
        original
            .iter()
            .map(|node| {
                let visited = visit(node);
                self.arc(node, visited)
            })
            .collect()
    }

    fn instructions(
        &mut self,
        original: &[Instruction],
        mut visit: impl FnMut(&Instruction) -> Instruction,
    ) -> Vec<Instruction> {
        original
            .iter()
            .map(|instruction| {
                let visited = visit(instruction);
                self.changed |= !visited.ptr_eq(instruction);
                visited
            })
            .collect()
    }

    fn command(&mut self, original: &CommandForm, visited: CommandForm) -> CommandForm {
        self.changed |= !visited.ptr_eq(original);
        visited
    }

    fn operands(&mut self, original: &Operands, visited: Operands) -> Operands {
        self.changed |= !operands_ptr_eq(original, &visited);
        visited
    }

    /// The original node if nothing changed, otherwise a new node built
    /// from it.
    fn finish<T>(self, original: &Arc<T>, build: impl FnOnce(&T) -> T) -> Arc<T> {
        if self.changed {
            Arc::new(build(original))
        } else {
            Arc::clone(original)
        }
    }
}

fn operands_ptr_eq(a: &Operands, b: &Operands) -> bool {
    match (a, b) {
        (
            Operands::Paths {
                sources: a_sources,
                destination: a_destination,
            },
            Operands::Paths {
                sources: b_sources,
                destination: b_destination,
            },
        ) => {
            Arc::ptr_eq(a_destination, b_destination)
                && a_sources.len() == b_sources.len()
                && a_sources
                    .iter()
                    .zip(b_sources)
                    .all(|(a, b)| Arc::ptr_eq(a, b))
        }
        (Operands::Exec(a), Operands::Exec(b)) => Arc::ptr_eq(a, b),
        (Operands::Heredoc(a), Operands::Heredoc(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

/// Visit the preamble, then each stage with the context scoped to it.
pub fn walk_document<V: Visitor + ?Sized>(
    visitor: &mut V,
    document: &Arc<Document>,
    cx: &mut VisitContext,
) -> Arc<Document> {
    cx.enter_document(document.stages.len(), document.escape());
    let mut rebuild = Rebuild::default();

    let preamble = rebuild.instructions(&document.preamble, |instruction| {
        visitor.visit_instruction(instruction, cx)
    });

    let mut stages = Vec::with_capacity(document.stages.len());
    for (index, stage) in document.stages.iter().enumerate() {
        cx.enter_stage(index, stage.name());
        let visited = visitor.visit_stage(stage, cx);
        stages.push(rebuild.arc(stage, visited));
    }
    cx.leave_stage();

    rebuild.finish(document, |document| Document {
        preamble,
        stages,
        ..document.clone()
    })
}

pub fn walk_stage<V: Visitor + ?Sized>(
    visitor: &mut V,
    stage: &Arc<Stage>,
    cx: &mut VisitContext,
) -> Arc<Stage> {
    let mut rebuild = Rebuild::default();
    let visited = visitor.visit_from(&stage.from, cx);
    let from = rebuild.arc(&stage.from, visited);
    let instructions = rebuild.instructions(&stage.instructions, |instruction| {
        visitor.visit_instruction(instruction, cx)
    });
    rebuild.finish(stage, |stage| Stage {
        from,
        instructions,
        ..stage.clone()
    })
}

pub fn walk_from<V: Visitor + ?Sized>(
    visitor: &mut V,
    from: &Arc<dockfix_syntax::From>,
    cx: &mut VisitContext,
) -> Arc<dockfix_syntax::From> {
    let mut rebuild = Rebuild::default();
    let flags = rebuild.list(&from.flags, |flag| visitor.visit_flag(flag, cx));
    let visited = visitor.visit_argument(&from.image, cx);
    let image = rebuild.arc(&from.image, visited);
    let tag = rebuild.option(from.tag.as_ref(), |tag| visitor.visit_argument(tag, cx));
    let digest = rebuild.option(from.digest.as_ref(), |digest| {
        visitor.visit_argument(digest, cx)
    });
    let alias = rebuild.option(from.alias.as_ref(), |alias| {
        visitor.visit_stage_alias(alias, cx)
    });
    rebuild.finish(from, |from| dockfix_syntax::From {
        flags,
        image,
        tag,
        digest,
        alias,
        ..from.clone()
    })
}

pub fn walk_stage_alias<V: Visitor + ?Sized>(
    visitor: &mut V,
    alias: &Arc<StageAlias>,
    cx: &mut VisitContext,
) -> Arc<StageAlias> {
    let mut rebuild = Rebuild::default();
    let visited = visitor.visit_argument(&alias.name, cx);
    let name = rebuild.arc(&alias.name, visited);
    rebuild.finish(alias, |alias| StageAlias {
        name,
        ..alias.clone()
    })
}

pub fn walk_instruction<V: Visitor + ?Sized>(
    visitor: &mut V,
    instruction: &Instruction,
    cx: &mut VisitContext,
) -> Instruction {
    match instruction {
        Instruction::Add(node) => visitor.visit_add(node, cx),
        Instruction::Arg(node) => visitor.visit_arg(node, cx),
        Instruction::Cmd(node) => visitor.visit_cmd(node, cx),
        Instruction::Copy(node) => visitor.visit_copy(node, cx),
        Instruction::Entrypoint(node) => visitor.visit_entrypoint(node, cx),
        Instruction::Env(node) => visitor.visit_env(node, cx),
        Instruction::Expose(node) => visitor.visit_expose(node, cx),
        Instruction::Healthcheck(node) => visitor.visit_healthcheck(node, cx),
        Instruction::Label(node) => visitor.visit_label(node, cx),
        Instruction::Maintainer(node) => visitor.visit_maintainer(node, cx),
        Instruction::Onbuild(node) => visitor.visit_onbuild(node, cx),
        Instruction::Run(node) => visitor.visit_run(node, cx),
        Instruction::Shell(node) => visitor.visit_shell(node, cx),
        Instruction::Stopsignal(node) => visitor.visit_stopsignal(node, cx),
        Instruction::User(node) => visitor.visit_user(node, cx),
        Instruction::Volume(node) => visitor.visit_volume(node, cx),
        Instruction::Workdir(node) => visitor.visit_workdir(node, cx),
    }
}

pub fn walk_add<V: Visitor + ?Sized>(
    visitor: &mut V,
    node: &Arc<Add>,
    cx: &mut VisitContext,
) -> Arc<Add> {
    let mut rebuild = Rebuild::default();
    let flags = rebuild.list(&node.flags, |flag| visitor.visit_flag(flag, cx));
    let visited = visitor.visit_operands(&node.operands, cx);
    let operands = rebuild.operands(&node.operands, visited);
    rebuild.finish(node, |node| Add {
        flags,
        operands,
        ..node.clone()
    })
}

pub fn walk_copy<V: Visitor + ?Sized>(
    visitor: &mut V,
    node: &Arc<Copy>,
    cx: &mut VisitContext,
) -> Arc<Copy> {
    let mut rebuild = Rebuild::default();
    let flags = rebuild.list(&node.flags, |flag| visitor.visit_flag(flag, cx));
    let visited = visitor.visit_operands(&node.operands, cx);
    let operands = rebuild.operands(&node.operands, visited);
    rebuild.finish(node, |node| Copy {
        flags,
        operands,
        ..node.clone()
    })
}

pub fn walk_arg<V: Visitor + ?Sized>(
    visitor: &mut V,
    node: &Arc<Arg>,
    cx: &mut VisitContext,
) -> Arc<Arg> {
    let mut rebuild = Rebuild::default();
    let pairs = rebuild.list(&node.pairs, |pair| visitor.visit_key_value(pair, cx));
    rebuild.finish(node, |node| Arg {
        pairs,
        ..node.clone()
    })
}

pub fn walk_env<V: Visitor + ?Sized>(
    visitor: &mut V,
    node: &Arc<Env>,
    cx: &mut VisitContext,
) -> Arc<Env> {
    let mut rebuild = Rebuild::default();
    let pairs = rebuild.list(&node.pairs, |pair| visitor.visit_key_value(pair, cx));
    rebuild.finish(node, |node| Env {
        pairs,
        ..node.clone()
    })
}

pub fn walk_label<V: Visitor + ?Sized>(
    visitor: &mut V,
    node: &Arc<Label>,
    cx: &mut VisitContext,
) -> Arc<Label> {
    let mut rebuild = Rebuild::default();
    let pairs = rebuild.list(&node.pairs, |pair| visitor.visit_key_value(pair, cx));
    rebuild.finish(node, |node| Label {
        pairs,
        ..node.clone()
    })
}

pub fn walk_cmd<V: Visitor + ?Sized>(
    visitor: &mut V,
    node: &Arc<Cmd>,
    cx: &mut VisitContext,
) -> Arc<Cmd> {
    let mut rebuild = Rebuild::default();
    let visited = visitor.visit_command_form(&node.command, cx);
    let command = rebuild.command(&node.command, visited);
    rebuild.finish(node, |node| Cmd {
        command,
        ..node.clone()
    })
}

pub fn walk_entrypoint<V: Visitor + ?Sized>(
    visitor: &mut V,
    node: &Arc<Entrypoint>,
    cx: &mut VisitContext,
) -> Arc<Entrypoint> {
    let mut rebuild = Rebuild::default();
    let visited = visitor.visit_command_form(&node.command, cx);
    let command = rebuild.command(&node.command, visited);
    rebuild.finish(node, |node| Entrypoint {
        command,
        ..node.clone()
    })
}

pub fn walk_shell<V: Visitor + ?Sized>(
    visitor: &mut V,
    node: &Arc<Shell>,
    cx: &mut VisitContext,
) -> Arc<Shell> {
    let mut rebuild = Rebuild::default();
    let visited = visitor.visit_command_form(&node.command, cx);
    let command = rebuild.command(&node.command, visited);
    rebuild.finish(node, |node| Shell {
        command,
        ..node.clone()
    })
}

pub fn walk_volume<V: Visitor + ?Sized>(
    visitor: &mut V,
    node: &Arc<Volume>,
    cx: &mut VisitContext,
) -> Arc<Volume> {
    let mut rebuild = Rebuild::default();
    let visited = visitor.visit_command_form(&node.paths, cx);
    let paths = rebuild.command(&node.paths, visited);
    rebuild.finish(node, |node| Volume {
        paths,
        ..node.clone()
    })
}

pub fn walk_run<V: Visitor + ?Sized>(
    visitor: &mut V,
    node: &Arc<Run>,
    cx: &mut VisitContext,
) -> Arc<Run> {
    let mut rebuild = Rebuild::default();
    let flags = rebuild.list(&node.flags, |flag| visitor.visit_flag(flag, cx));
    let visited = visitor.visit_command_form(&node.command, cx);
    let command = rebuild.command(&node.command, visited);
    rebuild.finish(node, |node| Run {
        flags,
        command,
        ..node.clone()
    })
}

pub fn walk_expose<V: Visitor + ?Sized>(
    visitor: &mut V,
    node: &Arc<Expose>,
    cx: &mut VisitContext,
) -> Arc<Expose> {
    let mut rebuild = Rebuild::default();
    let ports = rebuild.list(&node.ports, |port| visitor.visit_argument(port, cx));
    rebuild.finish(node, |node| Expose {
        ports,
        ..node.clone()
    })
}

pub fn walk_workdir<V: Visitor + ?Sized>(
    visitor: &mut V,
    node: &Arc<Workdir>,
    cx: &mut VisitContext,
) -> Arc<Workdir> {
    let mut rebuild = Rebuild::default();
    let visited = visitor.visit_argument(&node.path, cx);
    let path = rebuild.arc(&node.path, visited);
    rebuild.finish(node, |node| Workdir {
        path,
        ..node.clone()
    })
}

pub fn walk_user<V: Visitor + ?Sized>(
    visitor: &mut V,
    node: &Arc<User>,
    cx: &mut VisitContext,
) -> Arc<User> {
    let mut rebuild = Rebuild::default();
    let visited = visitor.visit_argument(&node.user, cx);
    let user = rebuild.arc(&node.user, visited);
    rebuild.finish(node, |node| User {
        user,
        ..node.clone()
    })
}

pub fn walk_stopsignal<V: Visitor + ?Sized>(
    visitor: &mut V,
    node: &Arc<Stopsignal>,
    cx: &mut VisitContext,
) -> Arc<Stopsignal> {
    let mut rebuild = Rebuild::default();
    let visited = visitor.visit_argument(&node.signal, cx);
    let signal = rebuild.arc(&node.signal, visited);
    rebuild.finish(node, |node| Stopsignal {
        signal,
        ..node.clone()
    })
}

pub fn walk_maintainer<V: Visitor + ?Sized>(
    visitor: &mut V,
    node: &Arc<Maintainer>,
    cx: &mut VisitContext,
) -> Arc<Maintainer> {
    let mut rebuild = Rebuild::default();
    let visited = visitor.visit_argument(&node.name, cx);
    let name = rebuild.arc(&node.name, visited);
    rebuild.finish(node, |node| Maintainer {
        name,
        ..node.clone()
    })
}

/// The trigger is visited like any other instruction and may change kind.
pub fn walk_onbuild<V: Visitor + ?Sized>(
    visitor: &mut V,
    node: &Arc<Onbuild>,
    cx: &mut VisitContext,
) -> Arc<Onbuild> {
    let trigger = visitor.visit_instruction(&node.trigger, cx);
    if trigger.ptr_eq(&node.trigger) {
        return Arc::clone(node);
    }
    Arc::new(Onbuild {
        trigger,
        ..(**node).clone()
    })
}

/// The nested CMD goes through [`Visitor::visit_cmd`]; a result that is not
/// a CMD cannot live under HEALTHCHECK and is discarded.
pub fn walk_healthcheck<V: Visitor + ?Sized>(
    visitor: &mut V,
    node: &Arc<Healthcheck>,
    cx: &mut VisitContext,
) -> Arc<Healthcheck> {
    let mut rebuild = Rebuild::default();
    let flags = rebuild.list(&node.flags, |flag| visitor.visit_flag(flag, cx));
    let check = match &node.check {
        HealthcheckCheck::None(word) => {
            let visited = visitor.visit_argument(word, cx);
            HealthcheckCheck::None(rebuild.arc(word, visited))
        }
        HealthcheckCheck::Cmd(cmd) => match visitor.visit_cmd(cmd, cx) {
            Instruction::Cmd(visited) => HealthcheckCheck::Cmd(rebuild.arc(cmd, visited)),
            other => {
                tracing::trace!(kind = %other.kind(), "discarding non-CMD healthcheck rewrite");
                HealthcheckCheck::Cmd(Arc::clone(cmd))
            }
        },
    };
    rebuild.finish(node, |node| Healthcheck {
        flags,
        check,
        ..node.clone()
    })
}

pub fn walk_command_form<V: Visitor + ?Sized>(
    visitor: &mut V,
    form: &CommandForm,
    cx: &mut VisitContext,
) -> CommandForm {
    match form {
        CommandForm::Shell(shell) => CommandForm::Shell(visitor.visit_shell_form(shell, cx)),
        CommandForm::Exec(exec) => CommandForm::Exec(visitor.visit_exec_form(exec, cx)),
        CommandForm::Heredoc(heredoc) => {
            CommandForm::Heredoc(visitor.visit_heredoc_form(heredoc, cx))
        }
    }
}

pub fn walk_shell_form<V: Visitor + ?Sized>(
    visitor: &mut V,
    form: &Arc<ShellForm>,
    cx: &mut VisitContext,
) -> Arc<ShellForm> {
    let mut rebuild = Rebuild::default();
    let visited = visitor.visit_argument(&form.argument, cx);
    let argument = rebuild.arc(&form.argument, visited);
    rebuild.finish(form, |form| ShellForm {
        argument,
        ..form.clone()
    })
}

pub fn walk_heredoc_form<V: Visitor + ?Sized>(
    visitor: &mut V,
    form: &Arc<HeredocForm>,
    cx: &mut VisitContext,
) -> Arc<HeredocForm> {
    let mut rebuild = Rebuild::default();
    let destination = rebuild.option(form.destination.as_ref(), |destination| {
        visitor.visit_argument(destination, cx)
    });
    rebuild.finish(form, |form| HeredocForm {
        destination,
        ..form.clone()
    })
}

pub fn walk_operands<V: Visitor + ?Sized>(
    visitor: &mut V,
    operands: &Operands,
    cx: &mut VisitContext,
) -> Operands {
    match operands {
        Operands::Paths {
            sources,
            destination,
        } => {
            let sources = sources
                .iter()
                .map(|source| visitor.visit_argument(source, cx))
                .collect();
            let destination = visitor.visit_argument(destination, cx);
            Operands::Paths {
                sources,
                destination,
            }
        }
        Operands::Exec(exec) => Operands::Exec(visitor.visit_exec_form(exec, cx)),
        Operands::Heredoc(heredoc) => Operands::Heredoc(visitor.visit_heredoc_form(heredoc, cx)),
    }
}

pub fn walk_flag<V: Visitor + ?Sized>(
    visitor: &mut V,
    flag: &Arc<Flag>,
    cx: &mut VisitContext,
) -> Arc<Flag> {
    let mut rebuild = Rebuild::default();
    let value = rebuild.option(flag.value.as_ref(), |value| visitor.visit_argument(value, cx));
    rebuild.finish(flag, |flag| Flag {
        value,
        ..flag.clone()
    })
}

pub fn walk_key_value<V: Visitor + ?Sized>(
    visitor: &mut V,
    pair: &Arc<KeyValue>,
    cx: &mut VisitContext,
) -> Arc<KeyValue> {
    let mut rebuild = Rebuild::default();
    let visited = visitor.visit_argument(&pair.key, cx);
    let key = rebuild.arc(&pair.key, visited);
    let value = rebuild.option(pair.value.as_ref(), |value| visitor.visit_argument(value, cx));
    rebuild.finish(pair, |pair| KeyValue {
        key,
        value,
        ..pair.clone()
    })
}

#[cfg(test)]
mod tests {
    use dockfix_syntax::parse;
    use dockfix_syntax::print;
    use dockfix_syntax::ArgumentContent;
    use dockfix_syntax::Space;

    use super::*;

    fn document(text: &str) -> Arc<Document> {
        Arc::new(parse(text).unwrap())
    }

    struct Identity;

    impl Visitor for Identity {}

    #[test]
    fn default_walk_returns_the_same_tree() {
        let input = document(include_str!(
            "../../dockfix-syntax/tests/fixtures/all-instructions.Dockerfile"
        ));
        let output = Identity.visit_document(&input, &mut VisitContext::new());
        assert!(Arc::ptr_eq(&input, &output));
    }

    struct UppercaseUser;

    impl Visitor for UppercaseUser {
        fn visit_user(&mut self, node: &Arc<User>, _cx: &mut VisitContext) -> Instruction {
            let user = node.user.with_contents(vec![ArgumentContent::plain(
                node.user.text().to_uppercase(),
            )]);
            Instruction::User(Arc::new(User {
                user: Arc::new(user),
                ..(**node).clone()
            }))
        }
    }

    #[test]
    fn untouched_siblings_are_shared() {
        let input =
            document("FROM alpine AS build\nRUN make\n\nFROM scratch\nUSER app\nCMD [\"/app\"]\n");
        let output = UppercaseUser.visit_document(&input, &mut VisitContext::new());

        assert_eq!(
            print(&output),
            "FROM alpine AS build\nRUN make\n\nFROM scratch\nUSER APP\nCMD [\"/app\"]\n"
        );
        assert!(Arc::ptr_eq(&input.stages[0], &output.stages[0]));
        assert!(!Arc::ptr_eq(&input.stages[1], &output.stages[1]));
        assert!(Arc::ptr_eq(&input.stages[1].from, &output.stages[1].from));
        assert!(output.stages[1].instructions[1].ptr_eq(&input.stages[1].instructions[1]));
    }

    struct RunToCmd;

    impl Visitor for RunToCmd {
        fn visit_cmd(&mut self, node: &Arc<Cmd>, _cx: &mut VisitContext) -> Instruction {
            Instruction::Run(Arc::new(Run {
                prefix: node.prefix.clone(),
                meta: node.meta.clone(),
                keyword: "RUN".to_string(),
                flags: Vec::new(),
                command: node.command.clone(),
            }))
        }
    }

    #[test]
    fn healthcheck_keeps_its_cmd_when_the_rewrite_changes_kind() {
        let input = document("FROM alpine\nHEALTHCHECK CMD true\nCMD sh\n");
        let output = RunToCmd.visit_document(&input, &mut VisitContext::new());
        assert_eq!(print(&output), "FROM alpine\nHEALTHCHECK CMD true\nRUN sh\n");
        assert!(output.stages[0].instructions[0].ptr_eq(&input.stages[0].instructions[0]));
    }

    struct StageRecorder(Vec<(Option<usize>, Option<String>, bool)>);

    impl Visitor for StageRecorder {
        fn visit_instruction(
            &mut self,
            instruction: &Instruction,
            cx: &mut VisitContext,
        ) -> Instruction {
            self.0.push((
                cx.stage_index(),
                cx.stage_name().map(str::to_string),
                cx.is_final_stage(),
            ));
            walk_instruction(self, instruction, cx)
        }
    }

    #[test]
    fn context_tracks_the_current_stage() {
        let input = document(
            "ARG BASE=alpine\nFROM $BASE AS build\nRUN make\nFROM scratch\nCOPY --from=build /out /\n",
        );
        let mut recorder = StageRecorder(Vec::new());
        recorder.visit_document(&input, &mut VisitContext::new());
        assert_eq!(
            recorder.0,
            vec![
                (None, None, false),
                (Some(0), Some("build".to_string()), false),
                (Some(1), None, true),
            ]
        );
    }

    struct IndentOnbuild;

    impl Visitor for IndentOnbuild {
        fn visit_copy(&mut self, node: &Arc<Copy>, _cx: &mut VisitContext) -> Instruction {
            Instruction::Copy(Arc::new(Copy {
                prefix: Space::new("  "),
                ..(**node).clone()
            }))
        }
    }

    #[test]
    fn onbuild_triggers_are_visited() {
        let input = document("FROM alpine\nONBUILD COPY . /src\n");
        let output = IndentOnbuild.visit_document(&input, &mut VisitContext::new());
        assert_eq!(print(&output), "FROM alpine\nONBUILD  COPY . /src\n");
    }
}
