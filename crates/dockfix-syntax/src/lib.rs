//! Lossless syntax tree for container build files.
//!
//! The parser turns build-file text into an immutable [`Document`] in which
//! every character of the input is owned by some node: semantic tokens by
//! the node they belong to, and whitespace, comments, and line continuations
//! by the [`Space`] prefix of the node that follows them. Printing a parsed
//! document therefore reproduces its input exactly.
//!
//! ## Key Components
//!
//! - [`Document`], [`Stage`], [`From`]: the build and its stages
//! - [`Instruction`]: one variant per instruction keyword
//! - [`CommandForm`]: shell, exec, and heredoc payloads
//! - [`Argument`], [`Flag`], [`KeyValue`]: the leaves
//! - [`Meta`]: node identity and markers, ignored by equality
//!
//! Nodes are shared through `Arc`. Edits build a new node and a new path up
//! to the root; untouched subtrees are reused by pointer.
//!
//! ## Example
//!
//! ```
//! let text = "FROM alpine:3.19\nRUN apk add curl\n";
//! let document = dockfix_syntax::parse(text).unwrap();
//! assert_eq!(document.stages.len(), 1);
//! assert_eq!(dockfix_syntax::print(&document), text);
//! ```

mod argument;
mod command;
mod document;
mod error;
mod instruction;
mod lexer;
mod meta;
mod parser;
mod printer;
mod quotes;
mod space;

pub use argument::Argument;
pub use argument::ArgumentContent;
pub use argument::Flag;
pub use argument::KeyValue;
pub use argument::Quote;
pub use argument::Separator;
pub use command::CommandForm;
pub use command::ExecForm;
pub use command::ExecItem;
pub use command::HeredocForm;
pub use command::ShellForm;
pub use document::Document;
pub use document::From;
pub use document::Stage;
pub use document::StageAlias;
pub use error::ParseError;
pub use error::ParseErrorKind;
pub use instruction::Add;
pub use instruction::Arg;
pub use instruction::Cmd;
pub use instruction::Copy;
pub use instruction::Entrypoint;
pub use instruction::Env;
pub use instruction::Expose;
pub use instruction::Healthcheck;
pub use instruction::HealthcheckCheck;
pub use instruction::Instruction;
pub use instruction::InstructionKind;
pub use instruction::Label;
pub use instruction::Maintainer;
pub use instruction::Onbuild;
pub use instruction::Operands;
pub use instruction::Run;
pub use instruction::Shell;
pub use instruction::Stopsignal;
pub use instruction::User;
pub use instruction::Volume;
pub use instruction::Workdir;
pub use meta::Marker;
pub use meta::Markers;
pub use meta::Meta;
pub use meta::NodeId;
pub use parser::Parser;
pub use printer::Print;
pub use quotes::has_shell_comment;
pub use quotes::split_shell_words;
pub use space::Space;

/// Parse build-file text into a lossless document.
pub fn parse(text: &str) -> Result<Document, ParseError> {
    let result = Parser::new(text).parse();
    match &result {
        Ok(document) => tracing::trace!(stages = document.stages.len(), "parsed document"),
        Err(error) => tracing::debug!(code = error.diagnostic_code(), %error, "parse failed"),
    }
    result
}

/// Print a document back to text.
#[must_use]
pub fn print(document: &Document) -> String {
    document.print()
}

/// One input of a batch: a parsed document, or the original text kept
/// opaque because it failed to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Parsed(Document),
    Unparsed { text: String, error: ParseError },
}

impl ParseOutcome {
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        match parse(text) {
            Ok(document) => ParseOutcome::Parsed(document),
            Err(error) => ParseOutcome::Unparsed {
                text: text.to_string(),
                error,
            },
        }
    }

    #[must_use]
    pub fn document(&self) -> Option<&Document> {
        match self {
            ParseOutcome::Parsed(document) => Some(document),
            ParseOutcome::Unparsed { .. } => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&ParseError> {
        match self {
            ParseOutcome::Parsed(_) => None,
            ParseOutcome::Unparsed { error, .. } => Some(error),
        }
    }
}

impl Print for ParseOutcome {
    fn print_to(&self, out: &mut String) {
        match self {
            ParseOutcome::Parsed(document) => document.print_to(out),
            ParseOutcome::Unparsed { text, .. } => out.push_str(text),
        }
    }
}
