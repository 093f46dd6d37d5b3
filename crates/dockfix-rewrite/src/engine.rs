use std::sync::Arc;

use dockfix_syntax::Document;

use crate::OptionsError;
use crate::Recipe;
use crate::RecipeError;
use crate::VisitContext;
use crate::Visitor;

/// The outcome of applying recipes to one document.
#[derive(Debug, Clone)]
pub struct RecipeRun {
    pub document: Arc<Document>,
    /// Whether the result differs from the input. Rebuilt nodes that print
    /// the same as before do not count.
    pub changed: bool,
}

impl RecipeRun {
    fn new(input: &Arc<Document>, document: Arc<Document>) -> Self {
        let changed = !Arc::ptr_eq(input, &document) && **input != *document;
        Self { document, changed }
    }
}

/// Run one visitor over a document, then every pass it scheduled, in
/// order, until the queue is empty.
pub fn run_visitor(visitor: &mut dyn Visitor, document: &Arc<Document>) -> Arc<Document> {
    let mut cx = VisitContext::new();
    let mut current = visitor.visit_document(document, &mut cx);

    let mut pass = 0usize;
    while let Some(mut deferred) = cx.next_deferred() {
        pass += 1;
        tracing::trace!(pass, remaining = cx.pending_passes(), "running deferred pass");
        current = deferred.visit_document(&current, &mut cx);
    }
    current
}

/// Validate a recipe and everything it expands to, then apply it.
pub fn apply(recipe: &dyn Recipe, document: &Arc<Document>) -> Result<RecipeRun, RecipeError> {
    validate(recipe)?;
    let output = run_recipe(recipe, document);
    Ok(RecipeRun::new(document, output))
}

/// Apply recipes in order, each seeing the previous one's output. Nothing
/// runs unless every recipe validates.
pub fn apply_all(
    recipes: &[Box<dyn Recipe>],
    document: &Arc<Document>,
) -> Result<RecipeRun, RecipeError> {
    for recipe in recipes {
        validate(recipe.as_ref())?;
    }
    let output = recipes.iter().fold(Arc::clone(document), |current, recipe| {
        run_recipe(recipe.as_ref(), &current)
    });
    Ok(RecipeRun::new(document, output))
}

/// Validate a recipe and every sub-recipe it expands to, without running
/// anything.
pub fn validate(recipe: &dyn Recipe) -> Result<(), OptionsError> {
    recipe.validate()?;
    for sub in recipe.sub_recipes() {
        validate(sub.as_ref())?;
    }
    Ok(())
}

fn run_recipe(recipe: &dyn Recipe, document: &Arc<Document>) -> Arc<Document> {
    tracing::debug!(recipe = recipe.name(), "applying recipe");
    let mut current = Arc::clone(document);
    if let Some(mut visitor) = recipe.visitor() {
        current = run_visitor(visitor.as_mut(), &current);
    }
    for sub in recipe.sub_recipes() {
        current = run_recipe(sub.as_ref(), &current);
    }
    current
}
