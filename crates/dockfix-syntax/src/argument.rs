use std::sync::Arc;

use crate::Meta;
use crate::Space;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quote {
    Double,
    Single,
}

impl Quote {
    #[must_use]
    pub fn char(self) -> char {
        match self {
            Quote::Double => '"',
            Quote::Single => '\'',
        }
    }

    #[must_use]
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '"' => Some(Quote::Double),
            '\'' => Some(Quote::Single),
            _ => None,
        }
    }
}

/// One contiguous fragment of an argument token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArgumentContent {
    Plain(String),
    Quoted { text: String, quote: Quote },
    /// `$NAME` or `${NAME}`. For the braced form `name` holds everything
    /// between the braces, modifiers included (`NAME:-default`).
    Variable { name: String, braced: bool },
}

impl ArgumentContent {
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain(text.into())
    }

    #[must_use]
    pub fn quoted(text: impl Into<String>, quote: Quote) -> Self {
        Self::Quoted {
            text: text.into(),
            quote,
        }
    }

    /// Whether this fragment refers to a build-time variable whose value is
    /// unknown without evaluating the build.
    #[must_use]
    pub fn has_variable(&self) -> bool {
        match self {
            ArgumentContent::Plain(_) => false,
            ArgumentContent::Quoted { text, quote } => {
                *quote == Quote::Double && text.contains('$')
            }
            ArgumentContent::Variable { .. } => true,
        }
    }

    /// Source text of the fragment.
    #[must_use]
    pub fn source(&self) -> String {
        match self {
            ArgumentContent::Plain(text) => text.clone(),
            ArgumentContent::Quoted { text, quote } => {
                let q = quote.char();
                format!("{q}{text}{q}")
            }
            ArgumentContent::Variable { name, braced: true } => format!("${{{name}}}"),
            ArgumentContent::Variable { name, braced: false } => format!("${name}"),
        }
    }
}

/// An ordered run of fragments forming one argument token.
///
/// `${REGISTRY}/image:${VERSION}-suffix` is a single argument made of five
/// fragments; none may be dropped or reordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub prefix: Space,
    pub meta: Meta,
    pub contents: Vec<ArgumentContent>,
}

impl Argument {
    #[must_use]
    pub fn new(prefix: Space, contents: Vec<ArgumentContent>) -> Self {
        Self {
            prefix,
            meta: Meta::new(),
            contents,
        }
    }

    #[must_use]
    pub fn plain(prefix: Space, text: impl Into<String>) -> Self {
        Self::new(prefix, vec![ArgumentContent::plain(text)])
    }

    #[must_use]
    pub fn with_prefix(&self, prefix: Space) -> Self {
        Self {
            prefix,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_contents(&self, contents: Vec<ArgumentContent>) -> Self {
        Self {
            contents,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn has_variable(&self) -> bool {
        self.contents.iter().any(ArgumentContent::has_variable)
    }

    /// The literal value with quotes removed, or `None` if any fragment
    /// refers to a variable.
    #[must_use]
    pub fn literal(&self) -> Option<String> {
        if self.has_variable() {
            return None;
        }
        Some(self.unquoted())
    }

    /// Value with quotes removed and variables kept in their source form.
    #[must_use]
    pub fn unquoted(&self) -> String {
        self.contents
            .iter()
            .map(|content| match content {
                ArgumentContent::Plain(text) | ArgumentContent::Quoted { text, .. } => {
                    text.clone()
                }
                variable @ ArgumentContent::Variable { .. } => variable.source(),
            })
            .collect()
    }

    /// Value with quotes removed and every variable reference rendered as
    /// `*`, for glob matching against statically unknown text.
    ///
    /// Returns `None` when a quoted fragment embeds a variable: there is no
    /// safe place to put the wildcard without parsing the quoted text.
    #[must_use]
    pub fn wildcard(&self) -> Option<String> {
        let mut out = String::new();
        for content in &self.contents {
            match content {
                ArgumentContent::Plain(text) => out.push_str(text),
                ArgumentContent::Quoted { text, .. } if !content.has_variable() => {
                    out.push_str(text);
                }
                ArgumentContent::Quoted { .. } => return None,
                ArgumentContent::Variable { .. } => out.push('*'),
            }
        }
        Some(out)
    }

    /// The quote style when the argument is exactly one quoted fragment.
    #[must_use]
    pub fn sole_quote(&self) -> Option<Quote> {
        match self.contents.as_slice() {
            [ArgumentContent::Quoted { quote, .. }] => Some(*quote),
            _ => None,
        }
    }

    /// Source text without the prefix.
    #[must_use]
    pub fn text(&self) -> String {
        self.contents.iter().map(ArgumentContent::source).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contents.iter().all(|content| match content {
            ArgumentContent::Plain(text) => text.is_empty(),
            _ => false,
        })
    }
}

/// `--name` or `--name=value` modifier on an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flag {
    pub prefix: Space,
    pub meta: Meta,
    pub name: String,
    pub value: Option<Arc<Argument>>,
}

impl Flag {
    #[must_use]
    pub fn new(prefix: Space, name: impl Into<String>, value: Option<Argument>) -> Self {
        Self {
            prefix,
            meta: Meta::new(),
            name: name.into(),
            value: value.map(Arc::new),
        }
    }

    /// Literal value of the flag, if it has one that contains no variables.
    #[must_use]
    pub fn literal(&self) -> Option<String> {
        self.value.as_ref().and_then(|value| value.literal())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Separator {
    /// `KEY=value`
    Equals,
    /// Legacy `ENV KEY value`; the whitespace is the value's prefix.
    Whitespace,
    /// `ARG NAME` with no default.
    None,
}

/// A `key=value` pair in ENV, LABEL, or ARG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub prefix: Space,
    pub meta: Meta,
    pub key: Arc<Argument>,
    pub separator: Separator,
    pub value: Option<Arc<Argument>>,
}

impl KeyValue {
    /// A new `key=value` pair, quoting the value when it needs it.
    #[must_use]
    pub fn assignment(prefix: Space, key: &str, value: &str) -> Self {
        Self {
            prefix,
            meta: Meta::new(),
            key: Arc::new(Argument::new(Space::EMPTY, vec![key_content(key)])),
            separator: Separator::Equals,
            value: Some(Arc::new(Argument::new(
                Space::EMPTY,
                vec![value_content(value)],
            ))),
        }
    }

    /// Key with quotes removed.
    #[must_use]
    pub fn key_text(&self) -> String {
        self.key.unquoted()
    }

    /// Value with quotes removed, `None` for a bare `ARG NAME`.
    #[must_use]
    pub fn value_text(&self) -> Option<String> {
        self.value.as_ref().map(|value| value.unquoted())
    }

    #[must_use]
    pub fn with_value(&self, value: &str) -> Self {
        let contents = vec![match self.value.as_ref().and_then(|v| v.sole_quote()) {
            Some(quote) => ArgumentContent::quoted(value, quote),
            None => value_content(value),
        }];
        let argument = match &self.value {
            Some(existing) => existing.with_contents(contents),
            None => Argument::new(Space::EMPTY, contents),
        };
        let separator = match self.separator {
            Separator::None => Separator::Equals,
            other => other,
        };
        Self {
            separator,
            value: Some(Arc::new(argument)),
            ..self.clone()
        }
    }
}

fn needs_quotes(text: &str) -> bool {
    text.is_empty()
        || text
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '$' | '\\' | '='))
}

fn key_content(key: &str) -> ArgumentContent {
    if needs_quotes(key) {
        ArgumentContent::quoted(escape_double(key), Quote::Double)
    } else {
        ArgumentContent::plain(key)
    }
}

fn value_content(value: &str) -> ArgumentContent {
    if needs_quotes(value) {
        ArgumentContent::quoted(escape_double(value), Quote::Double)
    } else {
        ArgumentContent::plain(value)
    }
}

fn escape_double(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_image() -> Argument {
        Argument::new(
            Space::single(),
            vec![
                ArgumentContent::Variable {
                    name: "REGISTRY".into(),
                    braced: true,
                },
                ArgumentContent::plain("/image"),
            ],
        )
    }

    #[test]
    fn literal_refuses_variables() {
        assert_eq!(registry_image().literal(), None);
        assert_eq!(
            Argument::plain(Space::EMPTY, "alpine").literal(),
            Some("alpine".into())
        );
    }

    #[test]
    fn wildcard_replaces_variables() {
        assert_eq!(registry_image().wildcard(), Some("*/image".into()));
        assert_eq!(registry_image().text(), "${REGISTRY}/image");
    }

    #[test]
    fn wildcard_gives_up_on_quoted_variables() {
        let arg = Argument::new(
            Space::EMPTY,
            vec![ArgumentContent::quoted("$HOME/x", Quote::Double)],
        );
        assert!(arg.has_variable());
        assert_eq!(arg.wildcard(), None);

        let single = Argument::new(
            Space::EMPTY,
            vec![ArgumentContent::quoted("$HOME/x", Quote::Single)],
        );
        assert!(!single.has_variable());
        assert_eq!(single.wildcard(), Some("$HOME/x".into()));
    }

    #[test]
    fn assignment_quotes_when_needed() {
        let pair = KeyValue::assignment(Space::single(), "description", "a small image");
        assert_eq!(pair.key.text(), "description");
        assert_eq!(
            pair.value.as_ref().map(|v| v.text()),
            Some("\"a small image\"".into())
        );
        assert_eq!(pair.value_text(), Some("a small image".into()));
    }

    #[test]
    fn with_value_keeps_quote_style() {
        let pair = KeyValue {
            prefix: Space::single(),
            meta: Meta::new(),
            key: Arc::new(Argument::plain(Space::EMPTY, "version")),
            separator: Separator::Equals,
            value: Some(Arc::new(Argument::new(
                Space::EMPTY,
                vec![ArgumentContent::quoted("1.0", Quote::Single)],
            ))),
        };
        let updated = pair.with_value("2.0");
        assert_eq!(updated.meta.id(), pair.meta.id());
        assert_eq!(updated.value.map(|v| v.text()), Some("'2.0'".into()));
    }
}
