//! Remove package manager caches in the RUN that filled them.

use std::sync::Arc;

use dockfix_rewrite::Iso;
use dockfix_rewrite::IsoVisitor;
use dockfix_rewrite::Recipe;
use dockfix_rewrite::RecipeDescriptor;
use dockfix_rewrite::VisitContext;
use dockfix_rewrite::Visitor;
use dockfix_syntax::CommandForm;
use dockfix_syntax::Run;
use itertools::Itertools;
use serde::Deserialize;

use crate::shell;

pub static DESCRIPTOR: RecipeDescriptor = RecipeDescriptor {
    name: "add-package-cache-cleanup",
    display_name: "Add package cache cleanup",
    description: "Append the package manager's cache cleanup to RUN instructions that install \
                  packages, so the cache does not end up in the layer.",
    options: &[],
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddPackageCacheCleanup {}

impl Recipe for AddPackageCacheCleanup {
    fn descriptor(&self) -> &'static RecipeDescriptor {
        &DESCRIPTOR
    }

    fn visitor(&self) -> Option<Box<dyn Visitor>> {
        Some(Box::new(Iso(CacheCleanup)))
    }
}

/// A package manager whose installs leave a cache behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Manager {
    Apt,
    Apk,
    Yum,
    Dnf,
}

impl Manager {
    fn cleanup(self) -> &'static str {
        match self {
            Manager::Apt => "rm -rf /var/lib/apt/lists/*",
            Manager::Apk => "rm -rf /var/cache/apk/*",
            Manager::Yum => "yum clean all",
            Manager::Dnf => "dnf clean all",
        }
    }

    /// Text whose presence means the cache is already dealt with.
    fn marker(self) -> &'static str {
        match self {
            Manager::Apt => "/var/lib/apt/lists",
            Manager::Apk => "/var/cache/apk",
            Manager::Yum => "yum clean all",
            Manager::Dnf => "dnf clean all",
        }
    }

    /// The manager a single command installs packages with, if any.
    fn installing(words: &[shell::Word<'_>]) -> Option<Self> {
        if shell::invocation(words, &["apt-get", "apt"], &["install"]).is_some() {
            return Some(Manager::Apt);
        }
        if shell::invocation(words, &["apk"], &["add"]).is_some()
            && !words.iter().any(|word| word.text == "--no-cache")
        {
            return Some(Manager::Apk);
        }
        if shell::invocation(words, &["yum"], &["install"]).is_some() {
            return Some(Manager::Yum);
        }
        if shell::invocation(words, &["dnf", "microdnf"], &["install"]).is_some() {
            return Some(Manager::Dnf);
        }
        None
    }
}

struct CacheCleanup;

fn has_cache_mount(run: &Run) -> bool {
    run.flags.iter().any(|flag| {
        flag.name == "mount"
            && flag
                .value
                .as_ref()
                .is_some_and(|value| value.unquoted().split(',').any(|part| part == "type=cache"))
    })
}

impl IsoVisitor for CacheCleanup {
    fn visit_run(&mut self, node: &Arc<Run>, _cx: &mut VisitContext) -> Arc<Run> {
        let CommandForm::Shell(form) = &node.command else {
            return Arc::clone(node);
        };
        if has_cache_mount(node) {
            return Arc::clone(node);
        }
        let text = form.text();
        if text.contains("<<") {
            return Arc::clone(node);
        }

        let missing: Vec<Manager> = shell::commands(&text)
            .into_iter()
            .filter_map(|range| Manager::installing(&shell::words(&text, range)))
            .unique()
            .filter(|manager| !text.contains(manager.marker()))
            .collect();
        if missing.is_empty() {
            return Arc::clone(node);
        }

        tracing::trace!(?missing, "adding package cache cleanup");
        let cleanup = missing.iter().map(|manager| manager.cleanup()).join(" && ");
        Arc::new(Run {
            command: CommandForm::Shell(Arc::new(form.with_text(format!("{text} && {cleanup}")))),
            ..(**node).clone()
        })
    }
}
