/// Characters that make a command line depend on the shell to run it.
const SHELL_OPERATORS: &[char] = &[
    ';', '&', '|', '<', '>', '(', ')', '`', '$', '*', '?', '[', ']', '{', '}',
];

/// Split shell-form command text into the argument list the shell would
/// produce, or `None` if the text needs a shell to mean the same thing.
///
/// Quoted runs stay single words with their quotes removed, bare runs split
/// on whitespace, and adjacent runs join (`--name="a b"` is one word).
/// Operators, globs, variable references, and unescaped newlines all return
/// `None`.
///
/// `escape` is the build file's escape character. Only with the default `\`
/// does a backslash escape anything; otherwise it is an ordinary character,
/// as in `C:\app\server.exe`.
#[must_use]
pub fn split_shell_words(text: &str, escape: char) -> Option<Vec<String>> {
    let joined = join_continuations(text, escape);
    let backslash_escapes = escape == '\\';
    let mut words = Vec::with_capacity((joined.len() / 8).clamp(2, 8));
    let mut current: Option<String> = None;
    let mut quote: Option<char> = None;
    let mut chars = joined.chars();

    while let Some(ch) = chars.next() {
        match quote {
            Some('\'') => {
                if ch == '\'' {
                    quote = None;
                } else {
                    current.get_or_insert_with(String::new).push(ch);
                }
            }
            Some(_) => match ch {
                '"' => quote = None,
                '$' | '`' => return None,
                '\\' if backslash_escapes => {
                    let next = chars.next()?;
                    let word = current.get_or_insert_with(String::new);
                    if !matches!(next, '"' | '\\' | '$' | '`') {
                        word.push('\\');
                    }
                    word.push(next);
                }
                _ => current.get_or_insert_with(String::new).push(ch),
            },
            None => match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    current.get_or_insert_with(String::new);
                }
                '\\' if backslash_escapes => {
                    let next = chars.next()?;
                    if next == '\n' {
                        return None;
                    }
                    current.get_or_insert_with(String::new).push(next);
                }
                '\n' => return None,
                c if c.is_whitespace() => {
                    if let Some(word) = current.take() {
                        words.push(word);
                    }
                }
                c if SHELL_OPERATORS.contains(&c) => return None,
                '#' | '~' if current.is_none() => return None,
                c => current.get_or_insert_with(String::new).push(c),
            },
        }
    }

    if quote.is_some() {
        return None;
    }
    if let Some(word) = current {
        words.push(word);
    }
    Some(words)
}

/// Whether the shell would read part of the command line as a `#` comment:
/// an unquoted `#` that starts a word.
///
/// Appending to such a line lands inside the comment.
#[must_use]
pub fn has_shell_comment(text: &str, escape: char) -> bool {
    let joined = join_continuations(text, escape);
    let mut quote: Option<char> = None;
    let mut word_start = true;
    let mut chars = joined.chars();

    while let Some(ch) = chars.next() {
        match quote {
            Some('\'') => {
                if ch == '\'' {
                    quote = None;
                }
            }
            Some(_) => match ch {
                '"' => quote = None,
                '\\' => {
                    chars.next();
                }
                _ => {}
            },
            None => {
                match ch {
                    '#' if word_start => return true,
                    '\'' | '"' => quote = Some(ch),
                    '\\' => {
                        chars.next();
                    }
                    _ => {}
                }
                word_start = ch.is_whitespace() || matches!(ch, ';' | '&' | '|' | '(' | ')');
            }
        }
    }
    false
}

/// Remove escape-newline continuations the way the builder does before
/// handing text to the shell, dropping blank and comment lines inside them.
fn join_continuations(text: &str, escape: char) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out = String::with_capacity(text.len());
    let mut continued = false;

    for (idx, line) in lines.iter().enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if continued {
            let content = line.trim();
            if content.is_empty() || content.starts_with('#') {
                continue;
            }
        }

        let trimmed = line.trim_end_matches([' ', '\t']);
        let escapes = trimmed.len() - trimmed.trim_end_matches(escape).len();
        if escapes % 2 == 1 {
            out.push_str(&trimmed[..trimmed.len() - 1]);
            continued = true;
        } else {
            out.push_str(line);
            if idx + 1 < lines.len() {
                out.push('\n');
            }
            continued = false;
        }
    }

    out
}
