use serde::Serialize;

use crate::OptionsError;
use crate::Visitor;

/// Type of an option value, as shown in recipe listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    String,
    Boolean,
    Integer,
    StringList,
}

/// Declaration of one named option a recipe accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OptionSpec {
    pub name: &'static str,
    pub kind: OptionKind,
    pub description: &'static str,
    pub example: Option<&'static str>,
    pub required: bool,
}

impl OptionSpec {
    #[must_use]
    pub const fn new(name: &'static str, kind: OptionKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            example: None,
            required: false,
        }
    }

    #[must_use]
    pub const fn example(mut self, example: &'static str) -> Self {
        self.example = Some(example);
        self
    }

    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// A named, option-parameterised document transformation.
///
/// A recipe either supplies a visitor, expands into sub-recipes, or both;
/// the engine runs the visitor first and then each sub-recipe in order.
/// Recipes never fail on documents they do not apply to: they leave them
/// unchanged.
pub trait Recipe: Send + Sync {
    fn descriptor(&self) -> &'static RecipeDescriptor;

    fn name(&self) -> &'static str {
        self.descriptor().name
    }

    /// Reject option combinations the recipe cannot honour.
    fn validate(&self) -> Result<(), OptionsError> {
        Ok(())
    }

    fn visitor(&self) -> Option<Box<dyn Visitor>> {
        None
    }

    fn sub_recipes(&self) -> Vec<Box<dyn Recipe>> {
        Vec::new()
    }
}

/// Name, description, and options of a recipe, available without
/// constructing it.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct RecipeDescriptor {
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub options: &'static [OptionSpec],
}
