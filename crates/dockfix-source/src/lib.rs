mod position;
mod render;
mod span;

pub use position::LineCol;
pub use position::LineIndex;
pub use render::Annotation;
pub use render::Diagnostic;
pub use render::DiagnosticRenderer;
pub use render::Severity;
pub use span::Span;
