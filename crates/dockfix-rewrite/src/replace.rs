use dockfix_syntax::Instruction;
use dockfix_syntax::NodeId;

use crate::visitor::walk_instruction;
use crate::VisitContext;
use crate::Visitor;

/// Swap the instruction with a given id for another, possibly of a
/// different kind.
///
/// Scheduled as a deferred pass by rules that find the instruction during
/// a kind-preserving traversal.
#[derive(Debug, Clone)]
pub struct ReplaceInstruction {
    target: NodeId,
    replacement: Instruction,
}

impl ReplaceInstruction {
    #[must_use]
    pub fn new(target: NodeId, replacement: Instruction) -> Self {
        Self {
            target,
            replacement,
        }
    }
}

impl Visitor for ReplaceInstruction {
    fn visit_instruction(
        &mut self,
        instruction: &Instruction,
        cx: &mut VisitContext,
    ) -> Instruction {
        if instruction.id() == self.target {
            return self.replacement.clone();
        }
        walk_instruction(self, instruction, cx)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dockfix_syntax::parse;
    use dockfix_syntax::print;
    use dockfix_syntax::Run;

    use super::*;
    use crate::run_visitor;

    #[test]
    fn replaces_by_identity_inside_onbuild() {
        let document = Arc::new(parse("FROM alpine\nONBUILD CMD make\nCMD make\n").unwrap());
        let Instruction::Onbuild(onbuild) = &document.stages[0].instructions[0] else {
            panic!("expected ONBUILD");
        };
        let Instruction::Cmd(cmd) = &onbuild.trigger else {
            panic!("expected CMD trigger");
        };
        let run = Instruction::Run(Arc::new(Run {
            prefix: cmd.prefix.clone(),
            meta: cmd.meta.clone(),
            keyword: "RUN".to_string(),
            flags: Vec::new(),
            command: cmd.command.clone(),
        }));

        let mut visitor = ReplaceInstruction::new(cmd.meta.id(), run);
        let output = run_visitor(&mut visitor, &document);
        assert_eq!(print(&output), "FROM alpine\nONBUILD RUN make\nCMD make\n");
        assert!(output.stages[0].instructions[1].ptr_eq(&document.stages[0].instructions[1]));
    }
}
