use crate::ArgumentContent;
use crate::Quote;
use crate::Space;

pub(crate) const DEFAULT_ESCAPE: char = '\\';

/// A heredoc opener seen on an instruction line whose body has not been
/// read yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PendingHeredoc {
    pub delimiter: String,
    pub strip_tabs: bool,
}

/// Why a quoted fragment could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UnterminatedQuote {
    pub start: usize,
    pub quote: char,
}

/// Character cursor over a build file.
///
/// Knows the file's line-continuation character and the low-level shapes of
/// the language (whitespace, continuations, words, quoted strings, variable
/// references, heredoc openers). It never drops text: every method either
/// returns what it consumed or leaves the position untouched.
pub(crate) struct Lexer<'src> {
    source: &'src str,
    current: usize,
    escape: char,
}

impl<'src> Lexer<'src> {
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        Lexer {
            source,
            current: 0,
            escape: escape_directive(source).unwrap_or(DEFAULT_ESCAPE),
        }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.current
    }

    #[inline]
    pub fn reset(&mut self, position: usize) {
        self.current = position;
    }

    pub fn slice(&self, start: usize, end: usize) -> &'src str {
        &self.source[start..end]
    }

    #[inline]
    pub fn peek(&self) -> char {
        self.source[self.current..].chars().next().unwrap_or('\0')
    }

    pub fn peek_next(&self) -> char {
        let mut chars = self.source[self.current..].chars();
        chars.next();
        chars.next().unwrap_or('\0')
    }

    fn peek_previous(&self) -> Option<char> {
        self.source[..self.current].chars().next_back()
    }

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    #[inline]
    pub fn starts_with(&self, pattern: &str) -> bool {
        self.source[self.current..].starts_with(pattern)
    }

    #[inline]
    pub fn consume(&mut self) {
        if let Some(ch) = self.source[self.current..].chars().next() {
            self.current += ch.len_utf8();
        }
    }

    /// At a newline (`\n` or `\r\n`) or the end of input.
    pub fn at_line_end(&self) -> bool {
        self.is_at_end() || self.starts_with("\n") || self.starts_with("\r\n")
    }

    fn consume_newline(&mut self) {
        if self.starts_with("\r\n") {
            self.current += 2;
        } else if self.starts_with("\n") {
            self.current += 1;
        }
    }

    fn consume_to_line_end(&mut self) {
        while !self.at_line_end() {
            self.consume();
        }
    }

    /// Length of a line continuation (escape char, optional trailing blanks,
    /// newline) starting at `at`, if there is one.
    fn continuation_len(&self, at: usize) -> Option<usize> {
        let rest = &self.source[at..];
        let after_escape = rest.strip_prefix(self.escape)?;
        let trimmed = after_escape.trim_start_matches([' ', '\t']);
        let newline = if trimmed.starts_with("\r\n") {
            2
        } else if trimmed.starts_with('\n') {
            1
        } else {
            return None;
        };
        Some(rest.len() - trimmed.len() + newline)
    }

    pub fn at_continuation(&self) -> bool {
        self.continuation_len(self.current).is_some()
    }

    /// After a continuation, blank lines and comment lines belong to the
    /// same logical instruction.
    fn skip_continuation_lines(&mut self) {
        loop {
            while matches!(self.peek(), ' ' | '\t') {
                self.consume();
            }
            if self.peek() == '#' {
                self.consume_to_line_end();
            }
            if self.is_at_end() || !self.at_line_end() {
                return;
            }
            self.consume_newline();
        }
    }

    /// Whitespace, newlines, and whole comment lines between instructions.
    pub fn trivia(&mut self) -> Space {
        let start = self.current;
        loop {
            match self.peek() {
                ' ' | '\t' | '\r' | '\n' => self.consume(),
                '#' => self.consume_to_line_end(),
                _ => break,
            }
        }
        Space::new(&self.source[start..self.current])
    }

    /// Blanks and continuations inside one logical instruction.
    pub fn inline_space(&mut self) -> Space {
        let start = self.current;
        loop {
            match self.peek() {
                ' ' | '\t' => self.consume(),
                '\r' if self.peek_next() != '\n' => self.consume(),
                c if c == self.escape => match self.continuation_len(self.current) {
                    Some(len) => {
                        self.current += len;
                        self.skip_continuation_lines();
                    }
                    None => break,
                },
                _ => break,
            }
        }
        Space::new(&self.source[start..self.current])
    }

    /// Consume inline space only if the instruction continues after it.
    ///
    /// Trailing blanks before the newline are left in place so they become
    /// part of the next node's prefix.
    pub fn space_before_more(&mut self) -> Option<Space> {
        let save = self.current;
        let space = self.inline_space();
        if self.at_line_end() {
            self.current = save;
            None
        } else {
            Some(space)
        }
    }

    /// Letters of an instruction keyword.
    pub fn keyword(&mut self) -> &'src str {
        let start = self.current;
        while self.peek().is_ascii_alphabetic() {
            self.consume();
        }
        &self.source[start..self.current]
    }

    /// Whether the cursor sits on a word boundary.
    pub fn at_word_boundary(&self) -> bool {
        self.at_line_end() || matches!(self.peek(), ' ' | '\t') || self.at_continuation()
    }

    /// Consume up to the next blank or line end and return the raw text.
    pub fn raw_token(&mut self) -> &'src str {
        let start = self.current;
        while !self.at_word_boundary() {
            self.consume();
        }
        &self.source[start..self.current]
    }

    /// Consume `--name`, returning the name; `None` when `--` is not followed
    /// by a name character.
    pub fn flag_name(&mut self) -> Option<&'src str> {
        let save = self.current;
        if !self.starts_with("--") {
            return None;
        }
        self.current += 2;
        let start = self.current;
        while matches!(self.peek(), 'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_') {
            self.consume();
        }
        if start == self.current {
            self.current = save;
            return None;
        }
        Some(&self.source[start..self.current])
    }

    /// Read one word as fragments, stopping at an unquoted blank, a
    /// continuation, or the end of the line.
    pub fn word(&mut self, variables: bool) -> Result<Vec<ArgumentContent>, UnterminatedQuote> {
        let mut contents = Vec::new();
        let mut plain = String::new();

        while !self.at_word_boundary() {
            let c = self.peek();
            if c == self.escape {
                plain.push(c);
                self.consume();
                if !self.at_line_end() {
                    plain.push(self.peek());
                    self.consume();
                }
                continue;
            }
            if let Some(quote) = Quote::from_char(c) {
                flush_plain(&mut plain, &mut contents);
                contents.push(self.quoted(quote)?);
                continue;
            }
            if variables && c == '$' {
                if let Some(variable) = self.variable() {
                    flush_plain(&mut plain, &mut contents);
                    contents.push(variable);
                    continue;
                }
            }
            plain.push(c);
            self.consume();
        }

        flush_plain(&mut plain, &mut contents);
        Ok(contents)
    }

    /// Read words and the blanks between them up to the end of the logical
    /// line, as one run of fragments.
    pub fn line_fragments(
        &mut self,
        variables: bool,
    ) -> Result<Vec<ArgumentContent>, UnterminatedQuote> {
        let mut contents = Vec::new();
        loop {
            for content in self.word(variables)? {
                push_merged(&mut contents, content);
            }
            match self.space_before_more() {
                Some(space) => {
                    push_merged(&mut contents, ArgumentContent::Plain(space.to_string()));
                }
                None => return Ok(contents),
            }
        }
    }

    fn quoted(&mut self, quote: Quote) -> Result<ArgumentContent, UnterminatedQuote> {
        let start = self.current;
        let q = quote.char();
        self.consume();
        let text_start = self.current;

        loop {
            if let Some(len) = self.continuation_len(self.current) {
                self.current += len;
                continue;
            }
            if self.at_line_end() {
                return Err(UnterminatedQuote { start, quote: q });
            }
            let c = self.peek();
            if c == q {
                let text = self.source[text_start..self.current].to_string();
                self.consume();
                return Ok(ArgumentContent::Quoted { text, quote });
            }
            self.consume();
            if quote == Quote::Double && c == self.escape && !self.at_line_end() {
                self.consume();
            }
        }
    }

    fn variable(&mut self) -> Option<ArgumentContent> {
        let start = self.current;
        let rest = &self.source[start + 1..];

        if let Some(inner) = rest.strip_prefix('{') {
            let line = inner.split('\n').next().unwrap_or_default();
            let close = line.find('}')?;
            let name = &line[..close];
            if name.is_empty() {
                return None;
            }
            self.current = start + 2 + close + 1;
            return Some(ArgumentContent::Variable {
                name: name.to_string(),
                braced: true,
            });
        }

        let first = rest.chars().next()?;
        if !(first.is_ascii_alphabetic() || first == '_') {
            return None;
        }
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        self.current = start + 1 + len;
        Some(ArgumentContent::Variable {
            name: rest[..len].to_string(),
            braced: false,
        })
    }

    /// Read free text to the end of the logical line, following
    /// continuations. Heredoc openers outside quotes are reported so the
    /// caller can consume their bodies.
    pub fn line_text(&mut self) -> (&'src str, Vec<PendingHeredoc>) {
        let start = self.current;
        let mut heredocs = Vec::new();
        let mut quote: Option<char> = None;

        while !self.at_line_end() {
            if let Some(len) = self.continuation_len(self.current) {
                self.current += len;
                self.skip_continuation_lines();
                continue;
            }
            let c = self.peek();
            if c == self.escape {
                self.consume();
                if !self.at_line_end() {
                    self.consume();
                }
                continue;
            }
            if let Some(q) = quote {
                if c == q {
                    quote = None;
                }
                self.consume();
                continue;
            }
            if c == '"' || c == '\'' {
                quote = Some(c);
                self.consume();
                continue;
            }
            if self.starts_with("<<") && self.heredoc_may_start_here() {
                if let Some((_, pending)) = self.heredoc_opening() {
                    heredocs.push(pending);
                    continue;
                }
            }
            self.consume();
        }

        (&self.source[start..self.current], heredocs)
    }

    /// Heredoc openers start a shell word: `cat <<EOF`, not `1<<2`.
    fn heredoc_may_start_here(&self) -> bool {
        match self.peek_previous() {
            None => true,
            Some(prev) => prev.is_whitespace() || matches!(prev, ';' | '&' | '|' | '(' | '>'),
        }
    }

    /// Consume `<<TAG`, `<<-TAG`, `<<"TAG"`, or `<<'TAG'` and return the raw
    /// opener with the pending heredoc.
    pub fn heredoc_opening(&mut self) -> Option<(&'src str, PendingHeredoc)> {
        let start = self.current;
        let rest = self.source[start..].strip_prefix("<<")?;
        let (strip_tabs, rest) = match rest.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, rest),
        };

        let (delimiter, consumed) = match rest.chars().next()? {
            q @ ('"' | '\'') => {
                let inner = &rest[1..];
                let close = inner.find(|c: char| c == q || c == '\n')?;
                if !inner[close..].starts_with(q) || close == 0 {
                    return None;
                }
                (&inner[..close], close + 2)
            }
            first if first.is_ascii_alphabetic() || first == '_' => {
                let len = rest
                    .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
                    .unwrap_or(rest.len());
                (&rest[..len], len)
            }
            _ => return None,
        };

        let opener_len = 2 + usize::from(strip_tabs) + consumed;
        self.current = start + opener_len;
        Some((
            &self.source[start..self.current],
            PendingHeredoc {
                delimiter: delimiter.to_string(),
                strip_tabs,
            },
        ))
    }

    /// Consume the body of a heredoc: the newline ending the current line,
    /// then whole lines up to and including the terminator line.
    ///
    /// Returns `false` if the input ends before the terminator.
    pub fn heredoc_body(&mut self, heredoc: &PendingHeredoc) -> bool {
        loop {
            if self.is_at_end() {
                return false;
            }
            self.consume_newline();
            let line_start = self.current;
            self.consume_to_line_end();
            let line = &self.source[line_start..self.current];
            let candidate = if heredoc.strip_tabs {
                line.trim_start_matches('\t')
            } else {
                line
            };
            if candidate == heredoc.delimiter {
                return true;
            }
        }
    }

    /// Trim blanks off the end of text read since `start`, moving the cursor
    /// back so they are not lost.
    pub fn trim_trailing_blanks(&mut self, start: usize) {
        let text = &self.source[start..self.current];
        let trimmed = text.trim_end_matches([' ', '\t']);
        self.current = start + trimmed.len();
    }

    /// Read a JSON string literal, quotes included. `None` if the line ends
    /// first.
    pub fn json_string(&mut self) -> Option<&'src str> {
        let start = self.current;
        if self.peek() != '"' {
            return None;
        }
        self.consume();
        loop {
            if self.at_line_end() {
                return None;
            }
            match self.peek() {
                '\\' => {
                    self.consume();
                    if self.at_line_end() {
                        return None;
                    }
                    self.consume();
                }
                '"' => {
                    self.consume();
                    return Some(&self.source[start..self.current]);
                }
                _ => self.consume(),
            }
        }
    }
}

fn flush_plain(plain: &mut String, contents: &mut Vec<ArgumentContent>) {
    if !plain.is_empty() {
        contents.push(ArgumentContent::Plain(std::mem::take(plain)));
    }
}

fn push_merged(contents: &mut Vec<ArgumentContent>, content: ArgumentContent) {
    if let (Some(ArgumentContent::Plain(last)), ArgumentContent::Plain(text)) =
        (contents.last_mut(), &content)
    {
        last.push_str(text);
        return;
    }
    contents.push(content);
}

/// Value of a `# escape=` parser directive at the top of the file.
///
/// Directives are only recognised in the leading run of `# key=value`
/// comment lines; anything else ends the run.
pub(crate) fn escape_directive(source: &str) -> Option<char> {
    for line in source.lines() {
        let directive = line.trim().strip_prefix('#')?;
        let (key, value) = directive.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("escape") {
            return match value.trim() {
                "`" => Some('`'),
                "\\" => Some('\\'),
                _ => None,
            };
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_space_follows_continuations() {
        let source = "  \\\n# comment\n\n    next";
        let mut lexer = Lexer::new(source);
        let space = lexer.inline_space();
        assert_eq!(space.as_str(), "  \\\n# comment\n\n    ");
        assert_eq!(lexer.peek(), 'n');
    }

    #[test]
    fn inline_space_stops_at_newline() {
        let mut lexer = Lexer::new("   \nRUN");
        assert_eq!(lexer.space_before_more(), None);
        assert_eq!(lexer.position(), 0);
    }

    #[test]
    fn trivia_takes_comments_and_blank_lines() {
        let mut lexer = Lexer::new("\n# syntax=docker/dockerfile:1\n\n  FROM");
        let space = lexer.trivia();
        assert_eq!(space.as_str(), "\n# syntax=docker/dockerfile:1\n\n  ");
        assert!(lexer.starts_with("FROM"));
    }

    #[test]
    fn word_splits_fragments() {
        let mut lexer = Lexer::new("${REGISTRY}/image:$VERSION-\"suffix\" rest");
        let contents = lexer.word(true).unwrap();
        assert_eq!(
            contents,
            vec![
                ArgumentContent::Variable {
                    name: "REGISTRY".into(),
                    braced: true
                },
                ArgumentContent::plain("/image:"),
                ArgumentContent::Variable {
                    name: "VERSION".into(),
                    braced: false
                },
                ArgumentContent::plain("-"),
                ArgumentContent::quoted("suffix", Quote::Double),
            ]
        );
        assert_eq!(lexer.peek(), ' ');
    }

    #[test]
    fn word_without_variables_keeps_dollar() {
        let mut lexer = Lexer::new("$HOME");
        assert_eq!(lexer.word(false).unwrap(), vec![ArgumentContent::plain("$HOME")]);
    }

    #[test]
    fn unterminated_quote_reports_start() {
        let mut lexer = Lexer::new("a=\"open\nRUN");
        let err = lexer.word(true).unwrap_err();
        assert_eq!(err, UnterminatedQuote { start: 2, quote: '"' });
    }

    #[test]
    fn escaped_quote_inside_double_quotes() {
        let mut lexer = Lexer::new(r#""say \"hi\"" next"#);
        let contents = lexer.word(true).unwrap();
        assert_eq!(
            contents,
            vec![ArgumentContent::quoted(r#"say \"hi\""#, Quote::Double)]
        );
    }

    #[test]
    fn line_text_collects_heredoc_openers() {
        let mut lexer = Lexer::new("cat <<EOF > /a && cat <<-'END' > /b\nbody\nEOF\n\tx\n\tEND\n");
        let (text, heredocs) = lexer.line_text();
        assert_eq!(text, "cat <<EOF > /a && cat <<-'END' > /b");
        assert_eq!(
            heredocs,
            vec![
                PendingHeredoc {
                    delimiter: "EOF".into(),
                    strip_tabs: false
                },
                PendingHeredoc {
                    delimiter: "END".into(),
                    strip_tabs: true
                },
            ]
        );
        assert!(lexer.heredoc_body(&heredocs[0]));
        assert!(lexer.heredoc_body(&heredocs[1]));
        assert_eq!(lexer.peek(), '\n');
    }

    #[test]
    fn shift_operator_is_not_a_heredoc() {
        let mut lexer = Lexer::new("echo $((1<<2))\n");
        let (text, heredocs) = lexer.line_text();
        assert_eq!(text, "echo $((1<<2))");
        assert!(heredocs.is_empty());
    }

    #[test]
    fn escape_directive_switches_continuation() {
        let source = "# escape=`\nFROM x\nRUN a `\n  b\n";
        let mut lexer = Lexer::new(source);
        assert_eq!(lexer.escape, '`');
        lexer.reset(source.find("a `").unwrap());
        let (text, _) = lexer.line_text();
        assert_eq!(text, "a `\n  b");
    }

    #[test]
    fn escape_directive_must_lead() {
        assert_eq!(escape_directive("FROM x\n# escape=`\n"), None);
        assert_eq!(escape_directive("# syntax=x\n# escape=`\n"), Some('`'));
    }
}
