/// A 1-based line and column position within a text document.
///
/// Columns count characters, not bytes, so positions line up with what an
/// editor shows for non-ASCII text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineCol {
    line: u32,
    column: u32,
}

impl LineCol {
    #[must_use]
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    #[must_use]
    pub fn column(&self) -> u32 {
        self.column
    }
}

/// Byte offsets of every line start in a text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineIndex {
    line_starts: Vec<u32>,
    text: String,
}

impl LineIndex {
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        let mut pos: u32 = 0;

        for c in text.chars() {
            pos = pos.saturating_add(u32::try_from(c.len_utf8()).unwrap_or(0));
            if c == '\n' {
                line_starts.push(pos);
            }
        }

        Self {
            line_starts,
            text: text.to_string(),
        }
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Map a byte offset to a 1-based line/column pair.
    ///
    /// Offsets past the end of the text clamp to the last position.
    #[must_use]
    pub fn to_line_col(&self, offset: u32) -> LineCol {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next.saturating_sub(1),
        };
        let line_start = self.line_starts[line] as usize;
        let end = (offset as usize).min(self.text.len());
        let column = self
            .text
            .get(line_start..end)
            .map_or(0, |prefix| prefix.chars().count());

        LineCol::new(
            u32::try_from(line + 1).unwrap_or(u32::MAX),
            u32::try_from(column + 1).unwrap_or(u32::MAX),
        )
    }
}
