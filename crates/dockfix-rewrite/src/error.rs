use thiserror::Error;

/// A recipe's options are missing, malformed, or contradict each other.
///
/// Raised before any document is visited.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{recipe}: {message}")]
pub struct OptionsError {
    pub recipe: String,
    /// Names of the offending options.
    pub options: Vec<String>,
    pub message: String,
}

impl OptionsError {
    #[must_use]
    pub fn new(recipe: &str, options: &[&str], message: impl Into<String>) -> Self {
        Self {
            recipe: recipe.to_string(),
            options: options.iter().map(|option| (*option).to_string()).collect(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RecipeError {
    #[error(transparent)]
    Options(#[from] OptionsError),

    #[error("unknown recipe '{name}'")]
    UnknownRecipe { name: String },

    #[error("invalid options for {recipe}: {source}")]
    InvalidOptions {
        recipe: String,
        #[source]
        source: serde_json::Error,
    },
}

impl RecipeError {
    #[must_use]
    pub fn diagnostic_code(&self) -> &'static str {
        match self {
            RecipeError::Options(_) => "R100",
            RecipeError::UnknownRecipe { .. } => "R101",
            RecipeError::InvalidOptions { .. } => "R102",
        }
    }
}
