use std::sync::Arc;

use crate::lexer::escape_directive;
use crate::lexer::DEFAULT_ESCAPE;
use crate::Argument;
use crate::Flag;
use crate::Instruction;
use crate::Meta;
use crate::Space;

/// A parsed build file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub meta: Meta,
    /// ARG instructions declared before the first FROM.
    pub preamble: Vec<Instruction>,
    /// Never empty; order is build order.
    pub stages: Vec<Arc<Stage>>,
    /// Trailing whitespace and comments after the last instruction.
    pub eof: Space,
}

impl Document {
    #[must_use]
    pub fn final_stage(&self) -> Option<&Arc<Stage>> {
        self.stages.last()
    }

    /// The escape character set by a `# escape=` directive, or `\`.
    ///
    /// Directives live in the comments before the first instruction.
    #[must_use]
    pub fn escape(&self) -> char {
        let leading = match self.preamble.first() {
            Some(instruction) => instruction.prefix(),
            None => match self.stages.first() {
                Some(stage) => &stage.from.prefix,
                None => return DEFAULT_ESCAPE,
            },
        };
        escape_directive(leading.as_str()).unwrap_or(DEFAULT_ESCAPE)
    }

    /// Find a stage by its `AS` alias, case-insensitively like the builder does.
    #[must_use]
    pub fn stage_named(&self, name: &str) -> Option<(usize, &Arc<Stage>)> {
        self.stages.iter().enumerate().find(|(_, stage)| {
            stage
                .name()
                .is_some_and(|alias| alias.eq_ignore_ascii_case(name))
        })
    }
}

/// One `FROM` block and the instructions that follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub meta: Meta,
    pub from: Arc<From>,
    pub instructions: Vec<Instruction>,
}

impl Stage {
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.from.alias.as_ref().map(|alias| alias.name.unquoted())
    }
}

/// Base image reference of a stage.
///
/// At most one of `tag` and `digest` is set. `name:tag@digest` keeps the tag
/// inside `image` so the invariant holds for every parsed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct From {
    pub prefix: Space,
    pub meta: Meta,
    pub keyword: String,
    pub flags: Vec<Arc<Flag>>,
    pub image: Arc<Argument>,
    /// Printed after `:`.
    pub tag: Option<Arc<Argument>>,
    /// Printed after `@`.
    pub digest: Option<Arc<Argument>>,
    pub alias: Option<Arc<StageAlias>>,
}

impl From {
    #[must_use]
    pub fn flag(&self, name: &str) -> Option<&Arc<Flag>> {
        self.flags.iter().find(|flag| flag.name == name)
    }

    /// Image name, tag, and digest joined back into one reference string.
    #[must_use]
    pub fn reference(&self) -> String {
        let mut out = self.image.text();
        if let Some(tag) = &self.tag {
            out.push(':');
            out.push_str(&tag.text());
        }
        if let Some(digest) = &self.digest {
            out.push('@');
            out.push_str(&digest.text());
        }
        out
    }
}

/// `AS name` suffix of a FROM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageAlias {
    pub prefix: Space,
    pub meta: Meta,
    /// `AS` as written.
    pub keyword: String,
    pub name: Arc<Argument>,
}

#[cfg(test)]
mod tests {
    use crate::parse;

    #[test]
    fn escape_comes_from_the_leading_directive() {
        assert_eq!(parse("FROM alpine\n").unwrap().escape(), '\\');
        assert_eq!(parse("# escape=`\nFROM alpine\n").unwrap().escape(), '`');
        assert_eq!(
            parse("# syntax=docker/dockerfile:1\n# escape=`\nARG V\nFROM alpine\n")
                .unwrap()
                .escape(),
            '`'
        );
        assert_eq!(parse("FROM alpine\n# escape=`\nRUN a\n").unwrap().escape(), '\\');
    }
}
