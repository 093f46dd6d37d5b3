use std::sync::Arc;

use dockfix_rewrite::visitor::walk_cmd;
use dockfix_rewrite::visitor::walk_from;
use dockfix_rewrite::visitor::walk_instruction;
use dockfix_rewrite::visitor::walk_stage_alias;
use dockfix_rewrite::Recipe;
use dockfix_rewrite::RecipeDescriptor;
use dockfix_rewrite::VisitContext;
use dockfix_rewrite::Visitor;
use dockfix_syntax::Cmd;
use dockfix_syntax::From;
use dockfix_syntax::Instruction;
use dockfix_syntax::StageAlias;
use serde::Deserialize;

pub static DESCRIPTOR: RecipeDescriptor = RecipeDescriptor {
    name: "normalize-instruction-case",
    display_name: "Normalize instruction case",
    description: "Upper-case instruction keywords and the `AS` of stage aliases.",
    options: &[],
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NormalizeInstructionCase {}

impl Recipe for NormalizeInstructionCase {
    fn descriptor(&self) -> &'static RecipeDescriptor {
        &DESCRIPTOR
    }

    fn visitor(&self) -> Option<Box<dyn Visitor>> {
        Some(Box::new(UpperCase))
    }
}

fn upper(keyword: &str) -> Option<String> {
    let upper = keyword.to_ascii_uppercase();
    (upper != keyword).then_some(upper)
}

fn upper_instruction(instruction: Instruction) -> Instruction {
    match upper(instruction.keyword()) {
        Some(keyword) => instruction.with_keyword(keyword),
        None => instruction,
    }
}

struct UpperCase;

impl Visitor for UpperCase {
    fn visit_from(&mut self, from: &Arc<From>, cx: &mut VisitContext) -> Arc<From> {
        let from = walk_from(self, from, cx);
        match upper(&from.keyword) {
            Some(keyword) => Arc::new(From {
                keyword,
                ..(*from).clone()
            }),
            None => from,
        }
    }

    fn visit_stage_alias(
        &mut self,
        alias: &Arc<StageAlias>,
        cx: &mut VisitContext,
    ) -> Arc<StageAlias> {
        let alias = walk_stage_alias(self, alias, cx);
        match upper(&alias.keyword) {
            Some(keyword) => Arc::new(StageAlias {
                keyword,
                ..(*alias).clone()
            }),
            None => alias,
        }
    }

    fn visit_instruction(
        &mut self,
        instruction: &Instruction,
        cx: &mut VisitContext,
    ) -> Instruction {
        upper_instruction(walk_instruction(self, instruction, cx))
    }

    // Reached directly for the CMD inside HEALTHCHECK.
    fn visit_cmd(&mut self, node: &Arc<Cmd>, cx: &mut VisitContext) -> Instruction {
        upper_instruction(Instruction::Cmd(walk_cmd(self, node, cx)))
    }
}
