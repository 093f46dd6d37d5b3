use std::sync::Arc;

use dockfix_syntax::Add;
use dockfix_syntax::Arg;
use dockfix_syntax::Argument;
use dockfix_syntax::Cmd;
use dockfix_syntax::Copy;
use dockfix_syntax::Document;
use dockfix_syntax::Entrypoint;
use dockfix_syntax::Env;
use dockfix_syntax::ExecForm;
use dockfix_syntax::Expose;
use dockfix_syntax::Flag;
use dockfix_syntax::Healthcheck;
use dockfix_syntax::HeredocForm;
use dockfix_syntax::Instruction;
use dockfix_syntax::KeyValue;
use dockfix_syntax::Label;
use dockfix_syntax::Maintainer;
use dockfix_syntax::Onbuild;
use dockfix_syntax::Run;
use dockfix_syntax::Shell;
use dockfix_syntax::ShellForm;
use dockfix_syntax::Stage;
use dockfix_syntax::StageAlias;
use dockfix_syntax::Stopsignal;
use dockfix_syntax::User;
use dockfix_syntax::Volume;
use dockfix_syntax::Workdir;

use crate::visitor::walk_add;
use crate::visitor::walk_arg;
use crate::visitor::walk_cmd;
use crate::visitor::walk_copy;
use crate::visitor::walk_document;
use crate::visitor::walk_entrypoint;
use crate::visitor::walk_env;
use crate::visitor::walk_expose;
use crate::visitor::walk_flag;
use crate::visitor::walk_from;
use crate::visitor::walk_healthcheck;
use crate::visitor::walk_heredoc_form;
use crate::visitor::walk_key_value;
use crate::visitor::walk_label;
use crate::visitor::walk_maintainer;
use crate::visitor::walk_onbuild;
use crate::visitor::walk_run;
use crate::visitor::walk_shell;
use crate::visitor::walk_shell_form;
use crate::visitor::walk_stage;
use crate::visitor::walk_stage_alias;
use crate::visitor::walk_stopsignal;
use crate::visitor::walk_user;
use crate::visitor::walk_volume;
use crate::visitor::walk_workdir;
use crate::VisitContext;
use crate::Visitor;

/// A visitor whose every method returns the node type it was given.
///
/// The signatures make kind-changing edits impossible, which is all most
/// rules need. Wrap an implementation in [`Iso`] to run it through the
/// engine. Command forms are not narrowed here: a shell form stays a shell
/// form, and changing the form is a job for [`Visitor::visit_command_form`].
pub trait IsoVisitor {
    fn visit_document(
        &mut self,
        document: &Arc<Document>,
        cx: &mut VisitContext,
    ) -> Arc<Document> {
        walk_document(&mut Iso(self), document, cx)
    }

    fn visit_stage(&mut self, stage: &Arc<Stage>, cx: &mut VisitContext) -> Arc<Stage> {
        walk_stage(&mut Iso(self), stage, cx)
    }

    fn visit_from(
        &mut self,
        from: &Arc<dockfix_syntax::From>,
        cx: &mut VisitContext,
    ) -> Arc<dockfix_syntax::From> {
        walk_from(&mut Iso(self), from, cx)
    }

    fn visit_stage_alias(
        &mut self,
        alias: &Arc<StageAlias>,
        cx: &mut VisitContext,
    ) -> Arc<StageAlias> {
        walk_stage_alias(&mut Iso(self), alias, cx)
    }

    fn visit_add(&mut self, node: &Arc<Add>, cx: &mut VisitContext) -> Arc<Add> {
        walk_add(&mut Iso(self), node, cx)
    }

    fn visit_arg(&mut self, node: &Arc<Arg>, cx: &mut VisitContext) -> Arc<Arg> {
        walk_arg(&mut Iso(self), node, cx)
    }

    fn visit_cmd(&mut self, node: &Arc<Cmd>, cx: &mut VisitContext) -> Arc<Cmd> {
        walk_cmd(&mut Iso(self), node, cx)
    }

    fn visit_copy(&mut self, node: &Arc<Copy>, cx: &mut VisitContext) -> Arc<Copy> {
        walk_copy(&mut Iso(self), node, cx)
    }

    fn visit_entrypoint(
        &mut self,
        node: &Arc<Entrypoint>,
        cx: &mut VisitContext,
    ) -> Arc<Entrypoint> {
        walk_entrypoint(&mut Iso(self), node, cx)
    }

    fn visit_env(&mut self, node: &Arc<Env>, cx: &mut VisitContext) -> Arc<Env> {
        walk_env(&mut Iso(self), node, cx)
    }

    fn visit_expose(&mut self, node: &Arc<Expose>, cx: &mut VisitContext) -> Arc<Expose> {
        walk_expose(&mut Iso(self), node, cx)
    }

    fn visit_healthcheck(
        &mut self,
        node: &Arc<Healthcheck>,
        cx: &mut VisitContext,
    ) -> Arc<Healthcheck> {
        walk_healthcheck(&mut Iso(self), node, cx)
    }

    fn visit_label(&mut self, node: &Arc<Label>, cx: &mut VisitContext) -> Arc<Label> {
        walk_label(&mut Iso(self), node, cx)
    }

    fn visit_maintainer(
        &mut self,
        node: &Arc<Maintainer>,
        cx: &mut VisitContext,
    ) -> Arc<Maintainer> {
        walk_maintainer(&mut Iso(self), node, cx)
    }

    fn visit_onbuild(&mut self, node: &Arc<Onbuild>, cx: &mut VisitContext) -> Arc<Onbuild> {
        walk_onbuild(&mut Iso(self), node, cx)
    }

    fn visit_run(&mut self, node: &Arc<Run>, cx: &mut VisitContext) -> Arc<Run> {
        walk_run(&mut Iso(self), node, cx)
    }

    fn visit_shell(&mut self, node: &Arc<Shell>, cx: &mut VisitContext) -> Arc<Shell> {
        walk_shell(&mut Iso(self), node, cx)
    }

    fn visit_stopsignal(
        &mut self,
        node: &Arc<Stopsignal>,
        cx: &mut VisitContext,
    ) -> Arc<Stopsignal> {
        walk_stopsignal(&mut Iso(self), node, cx)
    }

    fn visit_user(&mut self, node: &Arc<User>, cx: &mut VisitContext) -> Arc<User> {
        walk_user(&mut Iso(self), node, cx)
    }

    fn visit_volume(&mut self, node: &Arc<Volume>, cx: &mut VisitContext) -> Arc<Volume> {
        walk_volume(&mut Iso(self), node, cx)
    }

    fn visit_workdir(&mut self, node: &Arc<Workdir>, cx: &mut VisitContext) -> Arc<Workdir> {
        walk_workdir(&mut Iso(self), node, cx)
    }

    fn visit_shell_form(
        &mut self,
        form: &Arc<ShellForm>,
        cx: &mut VisitContext,
    ) -> Arc<ShellForm> {
        walk_shell_form(&mut Iso(self), form, cx)
    }

    fn visit_exec_form(&mut self, form: &Arc<ExecForm>, _cx: &mut VisitContext) -> Arc<ExecForm> {
        Arc::clone(form)
    }

    fn visit_heredoc_form(
        &mut self,
        form: &Arc<HeredocForm>,
        cx: &mut VisitContext,
    ) -> Arc<HeredocForm> {
        walk_heredoc_form(&mut Iso(self), form, cx)
    }

    fn visit_flag(&mut self, flag: &Arc<Flag>, cx: &mut VisitContext) -> Arc<Flag> {
        walk_flag(&mut Iso(self), flag, cx)
    }

    fn visit_key_value(&mut self, pair: &Arc<KeyValue>, cx: &mut VisitContext) -> Arc<KeyValue> {
        walk_key_value(&mut Iso(self), pair, cx)
    }

    fn visit_argument(
        &mut self,
        argument: &Arc<Argument>,
        _cx: &mut VisitContext,
    ) -> Arc<Argument> {
        Arc::clone(argument)
    }
}

/// Runs an [`IsoVisitor`] as a [`Visitor`].
#[derive(Debug, Clone, Default)]
pub struct Iso<V>(pub V);

/// Forward every method of an Iso visitor through a reference, so the
/// defaults above can re-enter the caller's overrides.
macro_rules! forward_iso {
    ($($method:ident($node:ty) -> $ret:ty;)*) => {
        impl<V: IsoVisitor + ?Sized> IsoVisitor for &mut V {
            $(
                fn $method(&mut self, node: &$node, cx: &mut VisitContext) -> $ret {
                    (**self).$method(node, cx)
                }
            )*
        }
    };
}

forward_iso! {
    visit_document(Arc<Document>) -> Arc<Document>;
    visit_stage(Arc<Stage>) -> Arc<Stage>;
    visit_from(Arc<dockfix_syntax::From>) -> Arc<dockfix_syntax::From>;
    visit_stage_alias(Arc<StageAlias>) -> Arc<StageAlias>;
    visit_add(Arc<Add>) -> Arc<Add>;
    visit_arg(Arc<Arg>) -> Arc<Arg>;
    visit_cmd(Arc<Cmd>) -> Arc<Cmd>;
    visit_copy(Arc<Copy>) -> Arc<Copy>;
    visit_entrypoint(Arc<Entrypoint>) -> Arc<Entrypoint>;
    visit_env(Arc<Env>) -> Arc<Env>;
    visit_expose(Arc<Expose>) -> Arc<Expose>;
    visit_healthcheck(Arc<Healthcheck>) -> Arc<Healthcheck>;
    visit_label(Arc<Label>) -> Arc<Label>;
    visit_maintainer(Arc<Maintainer>) -> Arc<Maintainer>;
    visit_onbuild(Arc<Onbuild>) -> Arc<Onbuild>;
    visit_run(Arc<Run>) -> Arc<Run>;
    visit_shell(Arc<Shell>) -> Arc<Shell>;
    visit_stopsignal(Arc<Stopsignal>) -> Arc<Stopsignal>;
    visit_user(Arc<User>) -> Arc<User>;
    visit_volume(Arc<Volume>) -> Arc<Volume>;
    visit_workdir(Arc<Workdir>) -> Arc<Workdir>;
    visit_shell_form(Arc<ShellForm>) -> Arc<ShellForm>;
    visit_exec_form(Arc<ExecForm>) -> Arc<ExecForm>;
    visit_heredoc_form(Arc<HeredocForm>) -> Arc<HeredocForm>;
    visit_flag(Arc<Flag>) -> Arc<Flag>;
    visit_key_value(Arc<KeyValue>) -> Arc<KeyValue>;
    visit_argument(Arc<Argument>) -> Arc<Argument>;
}

impl<V: IsoVisitor> Visitor for Iso<V> {
    fn visit_document(
        &mut self,
        document: &Arc<Document>,
        cx: &mut VisitContext,
    ) -> Arc<Document> {
        self.0.visit_document(document, cx)
    }

    fn visit_stage(&mut self, stage: &Arc<Stage>, cx: &mut VisitContext) -> Arc<Stage> {
        self.0.visit_stage(stage, cx)
    }

    fn visit_from(
        &mut self,
        from: &Arc<dockfix_syntax::From>,
        cx: &mut VisitContext,
    ) -> Arc<dockfix_syntax::From> {
        self.0.visit_from(from, cx)
    }

    fn visit_stage_alias(
        &mut self,
        alias: &Arc<StageAlias>,
        cx: &mut VisitContext,
    ) -> Arc<StageAlias> {
        self.0.visit_stage_alias(alias, cx)
    }

    fn visit_add(&mut self, node: &Arc<Add>, cx: &mut VisitContext) -> Instruction {
        Instruction::Add(self.0.visit_add(node, cx))
    }

    fn visit_arg(&mut self, node: &Arc<Arg>, cx: &mut VisitContext) -> Instruction {
        Instruction::Arg(self.0.visit_arg(node, cx))
    }

    fn visit_cmd(&mut self, node: &Arc<Cmd>, cx: &mut VisitContext) -> Instruction {
        Instruction::Cmd(self.0.visit_cmd(node, cx))
    }

    fn visit_copy(&mut self, node: &Arc<Copy>, cx: &mut VisitContext) -> Instruction {
        Instruction::Copy(self.0.visit_copy(node, cx))
    }

    fn visit_entrypoint(&mut self, node: &Arc<Entrypoint>, cx: &mut VisitContext) -> Instruction {
        Instruction::Entrypoint(self.0.visit_entrypoint(node, cx))
    }

    fn visit_env(&mut self, node: &Arc<Env>, cx: &mut VisitContext) -> Instruction {
        Instruction::Env(self.0.visit_env(node, cx))
    }

    fn visit_expose(&mut self, node: &Arc<Expose>, cx: &mut VisitContext) -> Instruction {
        Instruction::Expose(self.0.visit_expose(node, cx))
    }

    fn visit_healthcheck(
        &mut self,
        node: &Arc<Healthcheck>,
        cx: &mut VisitContext,
    ) -> Instruction {
        Instruction::Healthcheck(self.0.visit_healthcheck(node, cx))
    }

    fn visit_label(&mut self, node: &Arc<Label>, cx: &mut VisitContext) -> Instruction {
        Instruction::Label(self.0.visit_label(node, cx))
    }

    fn visit_maintainer(&mut self, node: &Arc<Maintainer>, cx: &mut VisitContext) -> Instruction {
        Instruction::Maintainer(self.0.visit_maintainer(node, cx))
    }

    fn visit_onbuild(&mut self, node: &Arc<Onbuild>, cx: &mut VisitContext) -> Instruction {
        Instruction::Onbuild(self.0.visit_onbuild(node, cx))
    }

    fn visit_run(&mut self, node: &Arc<Run>, cx: &mut VisitContext) -> Instruction {
        Instruction::Run(self.0.visit_run(node, cx))
    }

    fn visit_shell(&mut self, node: &Arc<Shell>, cx: &mut VisitContext) -> Instruction {
        Instruction::Shell(self.0.visit_shell(node, cx))
    }

    fn visit_stopsignal(&mut self, node: &Arc<Stopsignal>, cx: &mut VisitContext) -> Instruction {
        Instruction::Stopsignal(self.0.visit_stopsignal(node, cx))
    }

    fn visit_user(&mut self, node: &Arc<User>, cx: &mut VisitContext) -> Instruction {
        Instruction::User(self.0.visit_user(node, cx))
    }

    fn visit_volume(&mut self, node: &Arc<Volume>, cx: &mut VisitContext) -> Instruction {
        Instruction::Volume(self.0.visit_volume(node, cx))
    }

    fn visit_workdir(&mut self, node: &Arc<Workdir>, cx: &mut VisitContext) -> Instruction {
        Instruction::Workdir(self.0.visit_workdir(node, cx))
    }

    fn visit_shell_form(
        &mut self,
        form: &Arc<ShellForm>,
        cx: &mut VisitContext,
    ) -> Arc<ShellForm> {
        self.0.visit_shell_form(form, cx)
    }

    fn visit_exec_form(&mut self, form: &Arc<ExecForm>, cx: &mut VisitContext) -> Arc<ExecForm> {
        self.0.visit_exec_form(form, cx)
    }

    fn visit_heredoc_form(
        &mut self,
        form: &Arc<HeredocForm>,
        cx: &mut VisitContext,
    ) -> Arc<HeredocForm> {
        self.0.visit_heredoc_form(form, cx)
    }

    fn visit_flag(&mut self, flag: &Arc<Flag>, cx: &mut VisitContext) -> Arc<Flag> {
        self.0.visit_flag(flag, cx)
    }

    fn visit_key_value(&mut self, pair: &Arc<KeyValue>, cx: &mut VisitContext) -> Arc<KeyValue> {
        self.0.visit_key_value(pair, cx)
    }

    fn visit_argument(
        &mut self,
        argument: &Arc<Argument>,
        cx: &mut VisitContext,
    ) -> Arc<Argument> {
        self.0.visit_argument(argument, cx)
    }
}

#[cfg(test)]
mod tests {
    use dockfix_syntax::parse;
    use dockfix_syntax::print;
    use dockfix_syntax::ArgumentContent;

    use super::*;

    /// Rewrites `latest` tags, counting how many it saw.
    #[derive(Default)]
    struct PinLatest {
        seen: usize,
    }

    impl IsoVisitor for PinLatest {
        fn visit_from(
            &mut self,
            from: &Arc<dockfix_syntax::From>,
            cx: &mut VisitContext,
        ) -> Arc<dockfix_syntax::From> {
            let from = walk_from(&mut Iso(&mut *self), from, cx);
            let Some(tag) = from.tag.as_ref().filter(|tag| tag.text() == "latest") else {
                return from;
            };
            self.seen += 1;
            let pinned = tag.with_contents(vec![ArgumentContent::plain("1.0")]);
            Arc::new(dockfix_syntax::From {
                tag: Some(Arc::new(pinned)),
                ..(*from).clone()
            })
        }
    }

    #[test]
    fn iso_visitor_runs_through_the_engine_interface() {
        let input =
            Arc::new(parse("FROM app:latest AS a\nFROM app:2.0\nFROM app:latest\n").unwrap());
        let mut visitor = Iso(PinLatest::default());
        let output = Visitor::visit_document(&mut visitor, &input, &mut VisitContext::new());

        assert_eq!(print(&output), "FROM app:1.0 AS a\nFROM app:2.0\nFROM app:1.0\n");
        assert_eq!(visitor.0.seen, 2);
        assert!(Arc::ptr_eq(&input.stages[1], &output.stages[1]));
    }

    struct Nothing;

    impl IsoVisitor for Nothing {}

    #[test]
    fn default_iso_walk_is_identity() {
        let input =
            Arc::new(parse("FROM alpine\nONBUILD RUN make\nHEALTHCHECK CMD true\n").unwrap());
        let output = Iso(Nothing).visit_document(&input, &mut VisitContext::new());
        assert!(Arc::ptr_eq(&input, &output));
    }
}
