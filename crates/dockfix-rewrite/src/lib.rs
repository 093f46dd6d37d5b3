//! Rewriting machinery for dockfix documents.
//!
//! Rules are written as visitors over the immutable tree from
//! `dockfix-syntax`. A visitor overrides the methods for the nodes it cares
//! about; the default walk rebuilds only the path from a changed node to
//! the root and hands back untouched subtrees by pointer.
//!
//! ## Key Components
//!
//! - [`Visitor`]: one method per node kind, may change instruction kinds
//! - [`IsoVisitor`] and [`Iso`]: the same traversal with kind-preserving
//!   signatures
//! - [`VisitContext`]: current stage and the queue of deferred passes
//! - [`Recipe`]: named rule with declared options and validation
//! - [`apply`] / [`apply_all`]: validate, run, and report whether anything
//!   changed
//! - [`FromMatcher`]: glob-based predicate over base images

mod context;
mod engine;
mod error;
mod glob;
mod iso;
mod matcher;
pub mod options;
mod recipe;
mod replace;
pub mod visitor;

pub use context::VisitContext;
pub use engine::apply;
pub use engine::apply_all;
pub use engine::run_visitor;
pub use engine::validate;
pub use engine::RecipeRun;
pub use error::OptionsError;
pub use error::RecipeError;
pub use glob::Glob;
pub use iso::Iso;
pub use iso::IsoVisitor;
pub use matcher::split_reference;
pub use matcher::FromMatcher;
pub use matcher::FromRewrite;
pub use matcher::ImageReference;
pub use matcher::ReferencePart;
pub use recipe::OptionKind;
pub use recipe::OptionSpec;
pub use recipe::Recipe;
pub use recipe::RecipeDescriptor;
pub use replace::ReplaceInstruction;
pub use visitor::Visitor;
