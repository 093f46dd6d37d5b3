//! Just enough shell lexing to find package-manager commands in RUN text.

use std::ops::Range;

/// A word of shell text and where it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Word<'a> {
    pub start: usize,
    pub text: &'a str,
}

impl Word<'_> {
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

/// Byte ranges of the simple commands in `text`, split at `&&`, `||`, `|`,
/// `;`, and unescaped newlines outside quotes.
pub(crate) fn commands(text: &str) -> Vec<Range<usize>> {
    let bytes = text.as_bytes();
    let mut ranges = Vec::new();
    let mut quote: Option<u8> = None;
    let mut start = 0;
    let mut idx = 0;

    let mut push = |ranges: &mut Vec<Range<usize>>, range: Range<usize>| {
        if !text[range.clone()].trim().is_empty() {
            ranges.push(range);
        }
    };

    while idx < bytes.len() {
        let byte = bytes[idx];
        if let Some(open) = quote {
            if byte == b'\\' && open == b'"' {
                idx += 2;
                continue;
            }
            if byte == open {
                quote = None;
            }
            idx += 1;
            continue;
        }

        match byte {
            b'\\' => {
                idx += 2;
                continue;
            }
            b'\'' | b'"' => quote = Some(byte),
            b'&' | b'|' if bytes.get(idx + 1) == Some(&byte) => {
                push(&mut ranges, start..idx);
                idx += 2;
                start = idx;
                continue;
            }
            b'|' | b';' | b'\n' => {
                push(&mut ranges, start..idx);
                start = idx + 1;
            }
            _ => {}
        }
        idx += 1;
    }

    push(&mut ranges, start.min(bytes.len())..bytes.len());
    ranges
}

/// Words of one command, quotes kept. Continuations count as blanks.
pub(crate) fn words(text: &str, range: Range<usize>) -> Vec<Word<'_>> {
    let mut words = Vec::new();
    let mut quote: Option<char> = None;
    let mut start: Option<usize> = None;
    let mut chars = text[range.clone()].char_indices().peekable();

    while let Some((offset, ch)) = chars.next() {
        let at = range.start + offset;
        match quote {
            Some(open) => {
                if ch == open {
                    quote = None;
                } else if ch == '\\' && open == '"' {
                    chars.next();
                }
                continue;
            }
            None if ch == '\\' => {
                if chars.peek().is_some_and(|(_, next)| *next == '\n' || *next == '\r') {
                    if let Some(begin) = start.take() {
                        words.push(Word {
                            start: begin,
                            text: &text[begin..at],
                        });
                    }
                } else {
                    start.get_or_insert(at);
                }
                chars.next();
            }
            None if ch.is_whitespace() => {
                if let Some(begin) = start.take() {
                    words.push(Word {
                        start: begin,
                        text: &text[begin..at],
                    });
                }
            }
            None => {
                if ch == '\'' || ch == '"' {
                    quote = Some(ch);
                }
                start.get_or_insert(at);
            }
        }
    }

    if let Some(begin) = start {
        words.push(Word {
            start: begin,
            text: &text[begin..range.end],
        });
    }
    words
}

/// Index of the subcommand word when the command runs one of `managers`
/// with one of `subcommands` (`apt-get -y install`).
pub(crate) fn invocation(
    words: &[Word<'_>],
    managers: &[&str],
    subcommands: &[&str],
) -> Option<usize> {
    let manager = words
        .iter()
        .position(|word| managers.contains(&word.text))?;
    words
        .iter()
        .enumerate()
        .skip(manager + 1)
        .find(|(_, word)| subcommands.contains(&word.text))
        .map(|(idx, _)| idx)
}
