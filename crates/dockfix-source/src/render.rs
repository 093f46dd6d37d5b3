use annotate_snippets::AnnotationKind;
use annotate_snippets::Level;
use annotate_snippets::Renderer;
use annotate_snippets::Snippet;

use crate::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A labelled span. Primary spans are underlined with `^`, context spans
/// with `-`.
#[derive(Debug, Clone)]
pub struct Annotation<'a> {
    pub span: Span,
    pub label: &'a str,
    pub primary: bool,
}

/// One report against one build file: a coded message, the spans it points
/// at, and trailing notes.
#[derive(Debug)]
pub struct Diagnostic<'a> {
    pub source: &'a str,
    pub path: &'a str,
    pub code: &'a str,
    pub message: &'a str,
    pub severity: Severity,
    pub annotations: Vec<Annotation<'a>>,
    pub notes: Vec<&'a str>,
}

impl<'a> Diagnostic<'a> {
    /// Create a diagnostic with a single primary annotation.
    #[must_use]
    pub fn new(
        source: &'a str,
        path: &'a str,
        code: &'a str,
        message: &'a str,
        severity: Severity,
        span: Span,
        label: &'a str,
    ) -> Self {
        Self {
            source,
            path,
            code,
            message,
            severity,
            annotations: vec![Annotation {
                span,
                label,
                primary: true,
            }],
            notes: Vec::new(),
        }
    }

    #[must_use]
    pub fn annotation(mut self, span: Span, label: &'a str, primary: bool) -> Self {
        self.annotations.push(Annotation {
            span,
            label,
            primary,
        });
        self
    }

    #[must_use]
    pub fn note(mut self, note: &'a str) -> Self {
        self.notes.push(note);
        self
    }
}

/// Plain output for pipes and tests, styled output for terminals.
#[derive(Debug)]
pub struct DiagnosticRenderer {
    renderer: Renderer,
}

impl DiagnosticRenderer {
    #[must_use]
    pub fn plain() -> Self {
        Self {
            renderer: Renderer::plain(),
        }
    }

    #[must_use]
    pub fn styled() -> Self {
        Self {
            renderer: Renderer::styled(),
        }
    }

    #[must_use]
    pub fn render(&self, diagnostic: &Diagnostic<'_>) -> String {
        let level = match diagnostic.severity {
            Severity::Error => Level::ERROR,
            Severity::Warning => Level::WARNING,
        };

        let mut snippet = Snippet::source(diagnostic.source)
            .path(diagnostic.path)
            .line_start(1);

        // Errors at end of input point one past the text.
        let clamp = |offset: usize| offset.min(diagnostic.source.len());
        for annotation in &diagnostic.annotations {
            let kind = if annotation.primary {
                AnnotationKind::Primary
            } else {
                AnnotationKind::Context
            };
            let range = clamp(annotation.span.start_usize())..clamp(annotation.span.end_usize());
            snippet = snippet.annotation(kind.span(range).label(annotation.label));
        }

        let mut title = level
            .primary_title(diagnostic.message)
            .id(diagnostic.code)
            .element(snippet);

        for note in &diagnostic.notes {
            title = title.element(Level::NOTE.message(*note));
        }

        let report = &[title];
        self.renderer.render(report)
    }
}
