use std::sync::Arc;

use dockfix_rewrite::Iso;
use dockfix_rewrite::IsoVisitor;
use dockfix_rewrite::Recipe;
use dockfix_rewrite::RecipeDescriptor;
use dockfix_rewrite::VisitContext;
use dockfix_rewrite::Visitor;
use dockfix_syntax::CommandForm;
use dockfix_syntax::Run;
use serde::Deserialize;

use crate::shell;

pub static DESCRIPTOR: RecipeDescriptor = RecipeDescriptor {
    name: "add-no-install-recommends",
    display_name: "Add --no-install-recommends",
    description: "Stop apt from pulling in recommended packages on every `apt-get install`.",
    options: &[],
};

const FLAG: &str = "--no-install-recommends";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddNoInstallRecommends {}

impl Recipe for AddNoInstallRecommends {
    fn descriptor(&self) -> &'static RecipeDescriptor {
        &DESCRIPTOR
    }

    fn visitor(&self) -> Option<Box<dyn Visitor>> {
        Some(Box::new(Iso(NoRecommends)))
    }
}

/// Byte offsets just past each `install` word that lacks the flag.
fn insertion_points(text: &str) -> Vec<usize> {
    shell::commands(text)
        .into_iter()
        .filter_map(|range| {
            let words = shell::words(text, range);
            let install = shell::invocation(&words, &["apt-get", "apt"], &["install"])?;
            if words.iter().any(|word| word.text == FLAG) {
                return None;
            }
            Some(words[install].end())
        })
        .collect()
}

struct NoRecommends;

impl IsoVisitor for NoRecommends {
    fn visit_run(&mut self, node: &Arc<Run>, _cx: &mut VisitContext) -> Arc<Run> {
        let CommandForm::Shell(form) = &node.command else {
            return Arc::clone(node);
        };
        let text = form.text();
        if text.contains("<<") {
            return Arc::clone(node);
        }
        let points = insertion_points(&text);
        if points.is_empty() {
            return Arc::clone(node);
        }

        let mut rewritten = text;
        for at in points.into_iter().rev() {
            rewritten.insert_str(at, &format!(" {FLAG}"));
        }
        Arc::new(Run {
            command: CommandForm::Shell(Arc::new(form.with_text(rewritten))),
            ..(**node).clone()
        })
    }
}
