use dockfix_source::Span;
use serde::Serialize;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize)]
pub enum ParseErrorKind {
    /// A quote was opened but the logical line ended before it was closed.
    ///
    /// ```dockerfile
    /// LABEL description="never closed
    /// ```
    #[error("unterminated {quote} quoted string")]
    UnterminatedQuote { quote: char },

    /// The first word of an instruction is not a known keyword.
    #[error("unknown instruction '{keyword}'")]
    UnknownInstruction { keyword: String },

    /// An instruction that requires arguments has none, or too few.
    #[error("{instruction} requires {expected}")]
    MissingArgument {
        instruction: String,
        expected: &'static str,
    },

    /// A heredoc body ran to the end of the file without its terminator.
    #[error("heredoc is missing its terminator '{delimiter}'")]
    UnterminatedHeredoc { delimiter: String },

    /// `--` was not followed by a flag name.
    #[error("invalid flag '{text}'")]
    InvalidFlag { text: String },

    /// Only ARG may appear before the first FROM.
    #[error("{instruction} appears before the first FROM")]
    InstructionBeforeFrom { instruction: String },

    #[error("file contains no FROM instruction")]
    NoFrom,

    /// LABEL requires `key=value` pairs.
    #[error("{instruction} expects key=value pairs, found '{text}'")]
    InvalidKeyValue { instruction: String, text: String },

    #[error("unexpected '{text}' after {instruction}")]
    UnexpectedArgument { instruction: String, text: String },
}

impl ParseErrorKind {
    #[must_use]
    pub fn diagnostic_code(&self) -> &'static str {
        match self {
            ParseErrorKind::UnterminatedQuote { .. } => "P100",
            ParseErrorKind::UnknownInstruction { .. } => "P101",
            ParseErrorKind::MissingArgument { .. } => "P102",
            ParseErrorKind::UnterminatedHeredoc { .. } => "P103",
            ParseErrorKind::InvalidFlag { .. } => "P104",
            ParseErrorKind::InstructionBeforeFrom { .. } => "P105",
            ParseErrorKind::NoFrom => "P106",
            ParseErrorKind::InvalidKeyValue { .. } => "P107",
            ParseErrorKind::UnexpectedArgument { .. } => "P108",
        }
    }

    /// A suggested fix, where there is a usual one.
    #[must_use]
    pub fn help(&self) -> Option<&'static str> {
        match self {
            ParseErrorKind::UnterminatedQuote { .. } => {
                Some("close the quote, or escape it if it is meant literally")
            }
            ParseErrorKind::UnterminatedHeredoc { .. } => {
                Some("the terminator must be alone on its line")
            }
            ParseErrorKind::InstructionBeforeFrom { .. } => {
                Some("only ARG may appear before the first FROM")
            }
            ParseErrorKind::InvalidKeyValue { .. } => Some("write each pair as key=value"),
            _ => None,
        }
    }
}

/// A lexical or grammar error pinned to a 1-based line and column.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize)]
#[error("{line}:{column}: {kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub line: u32,
    pub column: u32,
    pub span: Span,
}

impl ParseError {
    #[must_use]
    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    #[must_use]
    pub fn diagnostic_code(&self) -> &'static str {
        self.kind.diagnostic_code()
    }
}
