use std::fmt;

use serde::Serialize;

/// Non-semantic text in front of a node.
///
/// Holds whitespace, newlines, comment lines, and line continuations exactly
/// as they appeared. Every node owns one `Space` as its prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Space(String);

impl Space {
    pub const EMPTY: Space = Space(String::new());

    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    #[must_use]
    pub fn single() -> Self {
        Self(" ".to_string())
    }

    #[must_use]
    pub fn newline() -> Self {
        Self("\n".to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn contains_newline(&self) -> bool {
        self.0.contains('\n')
    }

    /// Comment lines carried by this space, without the leading `#`.
    pub fn comments(&self) -> impl Iterator<Item = &str> {
        self.0
            .lines()
            .map(str::trim_start)
            .filter_map(|line| line.strip_prefix('#'))
    }

    /// Indentation of the last line, i.e. the text after the final newline.
    #[must_use]
    pub fn indent(&self) -> &str {
        match self.0.rfind('\n') {
            Some(idx) => &self.0[idx + 1..],
            None => "",
        }
    }

    /// A newline followed by this space's indentation.
    ///
    /// Used for nodes inserted next to an existing sibling so they line up.
    #[must_use]
    pub fn line_break_like(&self) -> Self {
        Self(format!("\n{}", self.indent()))
    }
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Space {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_are_extracted() {
        let space = Space::new("\n# first\n  # second\n\n");
        let comments: Vec<&str> = space.comments().collect();
        assert_eq!(comments, vec![" first", " second"]);
    }

    #[test]
    fn indent_of_last_line() {
        assert_eq!(Space::new("\n\n    ").indent(), "    ");
        assert_eq!(Space::new("  ").indent(), "");
        assert_eq!(Space::new("\n\t").line_break_like(), Space::new("\n\t"));
    }
}
