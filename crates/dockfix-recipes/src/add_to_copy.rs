//! Use COPY where ADD does nothing COPY would not.

use std::sync::Arc;

use dockfix_rewrite::Iso;
use dockfix_rewrite::IsoVisitor;
use dockfix_rewrite::Recipe;
use dockfix_rewrite::RecipeDescriptor;
use dockfix_rewrite::ReplaceInstruction;
use dockfix_rewrite::VisitContext;
use dockfix_rewrite::Visitor;
use dockfix_syntax::Add;
use dockfix_syntax::Copy;
use dockfix_syntax::Instruction;
use dockfix_syntax::Operands;
use serde::Deserialize;

use crate::stage::keyword_in_case_of;

pub static DESCRIPTOR: RecipeDescriptor = RecipeDescriptor {
    name: "replace-add-with-copy",
    display_name: "Replace ADD with COPY",
    description: "Turn ADD into COPY unless it fetches a URL, extracts an archive, uses a flag \
                  only ADD has, or names a source through a variable.",
    options: &[],
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplaceAddWithCopy {}

impl Recipe for ReplaceAddWithCopy {
    fn descriptor(&self) -> &'static RecipeDescriptor {
        &DESCRIPTOR
    }

    fn visitor(&self) -> Option<Box<dyn Visitor>> {
        Some(Box::new(Iso(FindAdds)))
    }
}

/// Extensions ADD unpacks into the destination.
const ARCHIVE_EXTENSIONS: &[&str] = &[
    ".tar", ".tar.gz", ".tgz", ".tar.bz2", ".tbz2", ".tbz", ".tar.xz", ".txz", ".tar.zst",
    ".tzst", ".gz", ".bz2", ".xz", ".zst",
];

const ADD_ONLY_FLAGS: &[&str] = &["checksum", "keep-git-dir", "unpack"];

/// A source that COPY would treat differently, or that cannot be told
/// apart from one.
fn needs_add(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    lower.contains("://")
        || lower.starts_with("git@")
        || ARCHIVE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

fn convertible(add: &Add) -> bool {
    if add
        .flags
        .iter()
        .any(|flag| ADD_ONLY_FLAGS.contains(&flag.name.as_str()))
    {
        return false;
    }
    match &add.operands {
        Operands::Paths { sources, .. } => sources
            .iter()
            .all(|source| source.literal().is_some_and(|text| !needs_add(&text))),
        Operands::Exec(form) => {
            let values = form.values();
            let Some((_, sources)) = values.split_last() else {
                return false;
            };
            sources
                .iter()
                .all(|source| !source.contains('$') && !needs_add(source))
        }
        Operands::Heredoc(_) => true,
    }
}

struct FindAdds;

impl IsoVisitor for FindAdds {
    fn visit_add(&mut self, node: &Arc<Add>, cx: &mut VisitContext) -> Arc<Add> {
        if convertible(node) {
            let copy = Instruction::Copy(Arc::new(Copy {
                prefix: node.prefix.clone(),
                meta: node.meta.clone(),
                keyword: keyword_in_case_of(&node.keyword, "COPY"),
                flags: node.flags.clone(),
                operands: node.operands.clone(),
            }));
            cx.schedule(ReplaceInstruction::new(node.meta.id(), copy));
        }
        Arc::clone(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::rewrite_noop;
    use crate::testing::rewrite_test;

    #[test]
    fn plain_files_become_copy() {
        rewrite_test(
            &ReplaceAddWithCopy {},
            "FROM openjdk\nADD app.jar /app/\n",
            "FROM openjdk\nCOPY app.jar /app/\n",
        );
    }

    #[test]
    fn archives_urls_and_variables_stay() {
        rewrite_noop(
            &ReplaceAddWithCopy {},
            "FROM alpine\nADD archive.tar.gz /app/\nADD https://example.com/x.sh /x.sh\nADD git@github.com:acme/app.git /src\nADD $JAR /app/\nADD --checksum=sha256:abc file /f\n",
        );
    }

    #[test]
    fn keyword_case_and_flags_are_kept() {
        rewrite_test(
            &ReplaceAddWithCopy {},
            "from alpine\nadd --chown=app:app src/ /src/\nAdd [\"a b\", \"/c/\"]\n",
            "from alpine\ncopy --chown=app:app src/ /src/\nCopy [\"a b\", \"/c/\"]\n",
        );
    }

    #[test]
    fn onbuild_triggers() {
        rewrite_test(
            &ReplaceAddWithCopy {},
            "FROM alpine\nONBUILD ADD . /src\n",
            "FROM alpine\nONBUILD COPY . /src\n",
        );
    }

    #[test]
    fn one_archive_keeps_the_whole_instruction() {
        rewrite_noop(&ReplaceAddWithCopy {}, "FROM alpine\nADD a.txt b.tgz /dst/\n");
    }
}
