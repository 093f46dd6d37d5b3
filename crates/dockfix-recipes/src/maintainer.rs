//! MAINTAINER is deprecated in favour of a `maintainer` label.

use std::sync::Arc;

use dockfix_rewrite::Iso;
use dockfix_rewrite::IsoVisitor;
use dockfix_rewrite::Recipe;
use dockfix_rewrite::RecipeDescriptor;
use dockfix_rewrite::ReplaceInstruction;
use dockfix_rewrite::VisitContext;
use dockfix_rewrite::Visitor;
use dockfix_syntax::Instruction;
use dockfix_syntax::KeyValue;
use dockfix_syntax::Label;
use dockfix_syntax::Maintainer;
use dockfix_syntax::Space;
use serde::Deserialize;

use crate::stage::keyword_in_case_of;

pub static DESCRIPTOR: RecipeDescriptor = RecipeDescriptor {
    name: "replace-maintainer-with-label",
    display_name: "Replace MAINTAINER with LABEL",
    description: "Replace the deprecated MAINTAINER instruction with `LABEL maintainer=...`.",
    options: &[],
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplaceMaintainerWithLabel {}

impl Recipe for ReplaceMaintainerWithLabel {
    fn descriptor(&self) -> &'static RecipeDescriptor {
        &DESCRIPTOR
    }

    fn visitor(&self) -> Option<Box<dyn Visitor>> {
        Some(Box::new(Iso(FindMaintainers)))
    }
}

struct FindMaintainers;

impl IsoVisitor for FindMaintainers {
    fn visit_maintainer(
        &mut self,
        node: &Arc<Maintainer>,
        cx: &mut VisitContext,
    ) -> Arc<Maintainer> {
        let name = node.name.unquoted();
        // MAINTAINER never expands variables; a LABEL would.
        if name.contains('$') {
            tracing::debug!(%name, "keeping MAINTAINER that a label would expand");
            return Arc::clone(node);
        }

        let label = Instruction::Label(Arc::new(Label {
            prefix: node.prefix.clone(),
            meta: node.meta.clone(),
            keyword: keyword_in_case_of(&node.keyword, "LABEL"),
            pairs: vec![Arc::new(KeyValue::assignment(
                Space::single(),
                "maintainer",
                &name,
            ))],
        }));
        cx.schedule(ReplaceInstruction::new(node.meta.id(), label));
        Arc::clone(node)
    }
}
