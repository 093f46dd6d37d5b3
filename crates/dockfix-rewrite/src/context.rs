use std::collections::VecDeque;
use std::fmt;

use crate::Visitor;

#[derive(Debug, Clone, PartialEq, Eq)]
struct StageScope {
    index: usize,
    name: Option<String>,
}

/// State threaded through a traversal: where in the document the visitor
/// is, and which follow-up passes have been requested.
pub struct VisitContext {
    stage: Option<StageScope>,
    stage_count: usize,
    /// Aliases of the stages entered so far, by index.
    stage_names: Vec<Option<String>>,
    escape: char,
    deferred: VecDeque<Box<dyn Visitor>>,
}

impl Default for VisitContext {
    fn default() -> Self {
        Self {
            stage: None,
            stage_count: 0,
            stage_names: Vec::new(),
            escape: '\\',
            deferred: VecDeque::new(),
        }
    }
}

impl VisitContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn enter_document(&mut self, stage_count: usize, escape: char) {
        self.stage = None;
        self.stage_count = stage_count;
        self.stage_names.clear();
        self.escape = escape;
    }

    pub(crate) fn enter_stage(&mut self, index: usize, name: Option<String>) {
        self.stage_names.truncate(index);
        self.stage_names.resize(index, None);
        self.stage_names.push(name.clone());
        self.stage = Some(StageScope { index, name });
    }

    pub(crate) fn leave_stage(&mut self) {
        self.stage = None;
    }

    /// Index of the stage being visited; `None` in the ARG preamble.
    #[must_use]
    pub fn stage_index(&self) -> Option<usize> {
        self.stage.as_ref().map(|scope| scope.index)
    }

    /// The `AS` alias of the current stage.
    #[must_use]
    pub fn stage_name(&self) -> Option<&str> {
        self.stage.as_ref().and_then(|scope| scope.name.as_deref())
    }

    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stage_count
    }

    /// The document's escape character, `\` unless a `# escape=` directive
    /// changed it.
    #[must_use]
    pub fn escape(&self) -> char {
        self.escape
    }

    /// Whether `name` is the alias of a stage before the current one, so a
    /// `FROM name` refers to that stage rather than to an image.
    #[must_use]
    pub fn names_earlier_stage(&self, name: &str) -> bool {
        let current = self.stage_index().unwrap_or(self.stage_names.len());
        self.stage_names
            .iter()
            .take(current)
            .flatten()
            .any(|alias| alias.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn is_final_stage(&self) -> bool {
        self.stage_index()
            .is_some_and(|index| index + 1 == self.stage_count)
    }

    /// Whether the current stage is the one a rule should edit.
    ///
    /// With no target the final stage is meant. A target matches the stage
    /// alias case-insensitively, or the stage index when it is a number.
    #[must_use]
    pub fn is_target_stage(&self, target: Option<&str>) -> bool {
        let Some(target) = target else {
            return self.is_final_stage();
        };
        if self
            .stage_name()
            .is_some_and(|name| name.eq_ignore_ascii_case(target))
        {
            return true;
        }
        target
            .parse::<usize>()
            .is_ok_and(|index| self.stage_index() == Some(index))
    }

    /// Queue a visitor to run over the finished tree of the current pass.
    /// Passes run in the order they were scheduled.
    pub fn schedule(&mut self, visitor: impl Visitor + 'static) {
        self.deferred.push_back(Box::new(visitor));
    }

    pub(crate) fn next_deferred(&mut self) -> Option<Box<dyn Visitor>> {
        self.deferred.pop_front()
    }

    #[must_use]
    pub fn pending_passes(&self) -> usize {
        self.deferred.len()
    }
}

impl fmt::Debug for VisitContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisitContext")
            .field("stage", &self.stage)
            .field("stage_count", &self.stage_count)
            .field("escape", &self.escape)
            .field("pending_passes", &self.deferred.len())
            .finish()
    }
}
