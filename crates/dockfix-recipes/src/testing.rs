use std::sync::Arc;

use dockfix_rewrite::apply;
use dockfix_rewrite::Recipe;
use dockfix_syntax::parse;
use dockfix_syntax::print;
use dockfix_syntax::Document;

fn parsed(text: &str) -> Arc<Document> {
    let document = parse(text).unwrap_or_else(|err| panic!("fixture does not parse: {err}"));
    assert_eq!(print(&document), text, "fixture does not round-trip");
    Arc::new(document)
}

/// Apply `recipe` to `before`, expect `after`, and expect a second run to
/// change nothing.
#[track_caller]
pub(crate) fn rewrite_test(recipe: &dyn Recipe, before: &str, after: &str) {
    let input = parsed(before);
    let run = apply(recipe, &input).unwrap();
    assert_eq!(print(&run.document), after);
    assert_eq!(run.changed, before != after);

    let again = apply(recipe, &run.document).unwrap();
    assert_eq!(print(&again.document), after, "second run changed the output");
    assert!(!again.changed);

    parsed(after);
}

/// Apply `recipe` to `before` and expect the very same tree back.
#[track_caller]
pub(crate) fn rewrite_noop(recipe: &dyn Recipe, before: &str) {
    let input = parsed(before);
    let run = apply(recipe, &input).unwrap();
    assert_eq!(print(&run.document), before);
    assert!(!run.changed);
}
