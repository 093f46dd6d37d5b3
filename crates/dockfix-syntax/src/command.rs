use std::sync::Arc;

use crate::Argument;
use crate::Meta;
use crate::Space;

/// Payload of a command-line instruction (RUN, CMD, ENTRYPOINT, SHELL, VOLUME).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandForm {
    Shell(Arc<ShellForm>),
    Exec(Arc<ExecForm>),
    Heredoc(Arc<HeredocForm>),
}

impl CommandForm {
    #[must_use]
    pub fn prefix(&self) -> &Space {
        match self {
            CommandForm::Shell(form) => &form.prefix,
            CommandForm::Exec(form) => &form.prefix,
            CommandForm::Heredoc(form) => &form.prefix,
        }
    }

    #[must_use]
    pub fn meta(&self) -> &Meta {
        match self {
            CommandForm::Shell(form) => &form.meta,
            CommandForm::Exec(form) => &form.meta,
            CommandForm::Heredoc(form) => &form.meta,
        }
    }

    /// Identity comparison: same variant pointing at the same allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &CommandForm) -> bool {
        match (self, other) {
            (CommandForm::Shell(a), CommandForm::Shell(b)) => Arc::ptr_eq(a, b),
            (CommandForm::Exec(a), CommandForm::Exec(b)) => Arc::ptr_eq(a, b),
            (CommandForm::Heredoc(a), CommandForm::Heredoc(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    #[must_use]
    pub fn as_shell(&self) -> Option<&Arc<ShellForm>> {
        match self {
            CommandForm::Shell(form) => Some(form),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_exec(&self) -> Option<&Arc<ExecForm>> {
        match self {
            CommandForm::Exec(form) => Some(form),
            _ => None,
        }
    }
}

/// Free text handed to the shell, continuations and embedded heredoc
/// bodies included verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellForm {
    pub prefix: Space,
    pub meta: Meta,
    pub argument: Arc<Argument>,
}

impl ShellForm {
    #[must_use]
    pub fn new(prefix: Space, text: impl Into<String>) -> Self {
        Self {
            prefix,
            meta: Meta::new(),
            argument: Arc::new(Argument::plain(Space::EMPTY, text)),
        }
    }

    #[must_use]
    pub fn text(&self) -> String {
        self.argument.text()
    }

    #[must_use]
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            argument: Arc::new(Argument::plain(Space::EMPTY, text)),
            ..self.clone()
        }
    }
}

/// JSON-array payload: `["executable", "arg"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecForm {
    pub prefix: Space,
    pub meta: Meta,
    pub items: Vec<Arc<ExecItem>>,
    /// Whitespace before the closing `]`.
    pub closing: Space,
}

impl ExecForm {
    /// Build an exec form in the conventional `["a", "b"]` layout.
    #[must_use]
    pub fn from_values<S: AsRef<str>>(prefix: Space, values: &[S]) -> Self {
        let items = values
            .iter()
            .enumerate()
            .map(|(idx, value)| {
                let prefix = if idx == 0 { Space::EMPTY } else { Space::single() };
                Arc::new(ExecItem::new(prefix, value.as_ref()))
            })
            .collect();
        Self {
            prefix,
            meta: Meta::new(),
            items,
            closing: Space::EMPTY,
        }
    }

    #[must_use]
    pub fn values(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.value.as_str()).collect()
    }
}

/// One JSON string in an exec form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecItem {
    pub prefix: Space,
    pub meta: Meta,
    /// The JSON literal as written, quotes included.
    pub raw: String,
    /// The decoded string value.
    pub value: String,
    /// Whitespace between the literal and the following `,`.
    pub trailing: Space,
}

impl ExecItem {
    #[must_use]
    pub fn new(prefix: Space, value: &str) -> Self {
        Self {
            prefix,
            meta: Meta::new(),
            raw: encode_json_string(value),
            value: value.to_string(),
            trailing: Space::EMPTY,
        }
    }
}

/// A payload introduced by `<<TAG` or `<<-TAG`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeredocForm {
    pub prefix: Space,
    pub meta: Meta,
    /// The opening token as written, e.g. `<<-"EOF"`.
    pub opening: String,
    pub delimiter: String,
    /// `<<-` strips leading tabs from body lines and the terminator.
    pub strip_tabs: bool,
    /// Rest of the opening line, e.g. the destination of `COPY <<EOF /app/run.sh`.
    pub destination: Option<Arc<Argument>>,
    /// Everything from the end of the opening line through the terminator line.
    pub body: String,
}

impl HeredocForm {
    /// Body lines between the opening line and the terminator.
    #[must_use]
    pub fn content(&self) -> String {
        let mut lines: Vec<&str> = self.body.split('\n').skip(1).collect();
        lines.pop();
        lines.join("\n")
    }
}

fn encode_json_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_from_values_is_conventional() {
        let form = ExecForm::from_values(Space::single(), &["/app/server", "--port", "8080"]);
        let raws: Vec<&str> = form.items.iter().map(|item| item.raw.as_str()).collect();
        assert_eq!(raws, vec!["\"/app/server\"", "\"--port\"", "\"8080\""]);
        assert_eq!(form.values(), vec!["/app/server", "--port", "8080"]);
    }

    #[test]
    fn exec_item_escapes_json() {
        let item = ExecItem::new(Space::EMPTY, "say \"hi\"");
        assert_eq!(item.raw, r#""say \"hi\"""#);
    }

    #[test]
    fn heredoc_content_strips_framing() {
        let form = HeredocForm {
            prefix: Space::single(),
            meta: Meta::new(),
            opening: "<<EOF".into(),
            delimiter: "EOF".into(),
            strip_tabs: false,
            destination: None,
            body: "\napt-get update\napt-get install -y curl\nEOF".into(),
        };
        assert_eq!(form.content(), "apt-get update\napt-get install -y curl");
    }

    #[test]
    fn ptr_eq_tracks_identity() {
        let a = CommandForm::Shell(Arc::new(ShellForm::new(Space::single(), "true")));
        let b = a.clone();
        let c = CommandForm::Shell(Arc::new(ShellForm::new(Space::single(), "true")));
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
        assert_eq!(a, c);
    }
}
