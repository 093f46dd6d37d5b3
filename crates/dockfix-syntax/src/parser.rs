use std::sync::Arc;

use dockfix_source::LineIndex;
use dockfix_source::Span;

use crate::lexer::Lexer;
use crate::lexer::PendingHeredoc;
use crate::lexer::UnterminatedQuote;
use crate::Add;
use crate::Arg;
use crate::Argument;
use crate::ArgumentContent;
use crate::Cmd;
use crate::CommandForm;
use crate::Copy;
use crate::Document;
use crate::Entrypoint;
use crate::Env;
use crate::ExecForm;
use crate::ExecItem;
use crate::Expose;
use crate::Flag;
use crate::Healthcheck;
use crate::HealthcheckCheck;
use crate::HeredocForm;
use crate::Instruction;
use crate::InstructionKind;
use crate::KeyValue;
use crate::Label;
use crate::Maintainer;
use crate::Meta;
use crate::Onbuild;
use crate::Operands;
use crate::ParseError;
use crate::ParseErrorKind;
use crate::Run;
use crate::Separator;
use crate::Shell;
use crate::ShellForm;
use crate::Space;
use crate::Stage;
use crate::StageAlias;
use crate::Stopsignal;
use crate::User;
use crate::Volume;
use crate::Workdir;

/// Recursive-descent parser producing a lossless [`Document`].
pub struct Parser<'src> {
    source: &'src str,
    lexer: Lexer<'src>,
}

struct OpenStage {
    from: Arc<crate::From>,
    start: usize,
    end: usize,
    instructions: Vec<Instruction>,
}

impl OpenStage {
    fn close(self) -> Arc<Stage> {
        Arc::new(Stage {
            meta: Meta::with_range(Span::from_bounds(self.start, self.end)),
            from: self.from,
            instructions: self.instructions,
        })
    }
}

impl<'src> Parser<'src> {
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            lexer: Lexer::new(source),
        }
    }

    pub fn parse(mut self) -> Result<Document, ParseError> {
        let mut preamble = Vec::new();
        let mut stages = Vec::new();
        let mut open: Option<OpenStage> = None;

        let eof = loop {
            let prefix = self.lexer.trivia();
            if self.lexer.is_at_end() {
                break prefix;
            }

            let start = self.lexer.position();
            let keyword = self.keyword(start)?;

            if keyword.eq_ignore_ascii_case("FROM") {
                let from = self.from(prefix, keyword, start)?;
                if let Some(stage) = open.take() {
                    stages.push(stage.close());
                }
                open = Some(OpenStage {
                    from,
                    start,
                    end: self.lexer.position(),
                    instructions: Vec::new(),
                });
                continue;
            }

            let Some(kind) = InstructionKind::from_keyword(keyword) else {
                return Err(self.error(
                    ParseErrorKind::UnknownInstruction {
                        keyword: keyword.to_string(),
                    },
                    start,
                    self.lexer.position(),
                ));
            };
            let instruction = self.instruction(kind, prefix, keyword, start)?;

            match open.as_mut() {
                Some(stage) => {
                    stage.instructions.push(instruction);
                    stage.end = self.lexer.position();
                }
                None if kind == InstructionKind::Arg => preamble.push(instruction),
                None => {
                    return Err(self.error(
                        ParseErrorKind::InstructionBeforeFrom {
                            instruction: kind.keyword().to_string(),
                        },
                        start,
                        self.lexer.position(),
                    ));
                }
            }
        };

        if let Some(stage) = open.take() {
            stages.push(stage.close());
        }
        if stages.is_empty() {
            let end = self.source.len();
            return Err(self.error(ParseErrorKind::NoFrom, end, end));
        }

        Ok(Document {
            meta: Meta::with_range(Span::from_bounds(0, self.source.len())),
            preamble,
            stages,
            eof,
        })
    }

    fn error(&self, kind: ParseErrorKind, start: usize, end: usize) -> ParseError {
        let span = Span::from_bounds(start, end);
        let position = LineIndex::new(self.source).to_line_col(span.start());
        ParseError {
            kind,
            line: position.line(),
            column: position.column(),
            span,
        }
    }

    fn meta_since(&self, start: usize) -> Meta {
        Meta::with_range(Span::from_bounds(start, self.lexer.position()))
    }

    fn keyword(&mut self, start: usize) -> Result<&'src str, ParseError> {
        let keyword = self.lexer.keyword();
        if !keyword.is_empty() && self.lexer.at_word_boundary() {
            return Ok(keyword);
        }
        self.lexer.reset(start);
        self.lexer.consume();
        self.lexer.raw_token();
        let end = self.lexer.position();
        Err(self.error(
            ParseErrorKind::UnknownInstruction {
                keyword: self.lexer.slice(start, end).to_string(),
            },
            start,
            end,
        ))
    }

    /// Space after a keyword or flag list that must be followed by more text.
    fn required_space(
        &mut self,
        keyword: &str,
        expected: &'static str,
        start: usize,
    ) -> Result<Space, ParseError> {
        let space = self.lexer.inline_space();
        if self.lexer.at_line_end() {
            return Err(self.error(
                ParseErrorKind::MissingArgument {
                    instruction: keyword.to_ascii_uppercase(),
                    expected,
                },
                start,
                self.lexer.position(),
            ));
        }
        Ok(space)
    }

    fn word(&mut self, variables: bool) -> Result<Vec<ArgumentContent>, ParseError> {
        self.lexer
            .word(variables)
            .map_err(|err| self.unterminated_quote(err))
    }

    fn unterminated_quote(&self, err: UnterminatedQuote) -> ParseError {
        self.error(
            ParseErrorKind::UnterminatedQuote { quote: err.quote },
            err.start,
            self.lexer.position(),
        )
    }

    fn argument(&mut self, prefix: Space, variables: bool) -> Result<Arc<Argument>, ParseError> {
        let start = self.lexer.position();
        let contents = self.word(variables)?;
        Ok(Arc::new(Argument {
            prefix,
            meta: self.meta_since(start),
            contents,
        }))
    }

    /// Whitespace-separated words up to the end of the logical line.
    fn words(&mut self, prefix: Space, variables: bool) -> Result<Vec<Arc<Argument>>, ParseError> {
        let mut words = vec![self.argument(prefix, variables)?];
        while let Some(space) = self.lexer.space_before_more() {
            words.push(self.argument(space, variables)?);
        }
        Ok(words)
    }

    /// The rest of the logical line as one argument, inner blanks kept.
    fn line_argument(
        &mut self,
        prefix: Space,
        variables: bool,
    ) -> Result<Arc<Argument>, ParseError> {
        let start = self.lexer.position();
        let contents = self
            .lexer
            .line_fragments(variables)
            .map_err(|err| self.unterminated_quote(err))?;
        Ok(Arc::new(Argument {
            prefix,
            meta: self.meta_since(start),
            contents,
        }))
    }

    fn flags(&mut self) -> Result<Vec<Arc<Flag>>, ParseError> {
        let mut flags = Vec::new();
        loop {
            let save = self.lexer.position();
            let space = self.lexer.inline_space();
            if !self.lexer.starts_with("--") {
                self.lexer.reset(save);
                return Ok(flags);
            }
            flags.push(self.flag(space)?);
        }
    }

    fn flag(&mut self, prefix: Space) -> Result<Arc<Flag>, ParseError> {
        let start = self.lexer.position();
        let Some(name) = self.lexer.flag_name() else {
            return Err(self.invalid_flag(start));
        };

        let value = if self.lexer.peek() == '=' {
            self.lexer.consume();
            Some(self.argument(Space::EMPTY, true)?)
        } else if self.lexer.at_word_boundary() {
            None
        } else {
            return Err(self.invalid_flag(start));
        };

        Ok(Arc::new(Flag {
            prefix,
            meta: self.meta_since(start),
            name: name.to_string(),
            value,
        }))
    }

    fn invalid_flag(&mut self, start: usize) -> ParseError {
        self.lexer.reset(start);
        let text = self.lexer.raw_token();
        self.error(
            ParseErrorKind::InvalidFlag {
                text: text.to_string(),
            },
            start,
            self.lexer.position(),
        )
    }

    fn from(
        &mut self,
        prefix: Space,
        keyword: &str,
        start: usize,
    ) -> Result<Arc<crate::From>, ParseError> {
        let flags = self.flags()?;
        let space = self.required_space(keyword, "an image reference", start)?;

        let image_start = self.lexer.position();
        let contents = self.word(true)?;
        let image_span = Span::from_bounds(image_start, self.lexer.position());
        let (image, tag, digest) = split_image_reference(contents);

        let alias = match self.lexer.space_before_more() {
            None => None,
            Some(space) => Some(self.stage_alias(space, keyword, start)?),
        };

        if self.lexer.space_before_more().is_some() {
            let extra_start = self.lexer.position();
            let text = self.lexer.raw_token();
            return Err(self.error(
                ParseErrorKind::UnexpectedArgument {
                    instruction: keyword.to_ascii_uppercase(),
                    text: text.to_string(),
                },
                extra_start,
                self.lexer.position(),
            ));
        }

        Ok(Arc::new(crate::From {
            prefix,
            meta: self.meta_since(start),
            keyword: keyword.to_string(),
            flags,
            image: Arc::new(Argument {
                prefix: space,
                meta: Meta::with_range(image_span),
                contents: image,
            }),
            tag: tag.map(|contents| Arc::new(Argument::new(Space::EMPTY, contents))),
            digest: digest.map(|contents| Arc::new(Argument::new(Space::EMPTY, contents))),
            alias,
        }))
    }

    fn stage_alias(
        &mut self,
        prefix: Space,
        keyword: &str,
        start: usize,
    ) -> Result<Arc<StageAlias>, ParseError> {
        let alias_start = self.lexer.position();
        let as_keyword = self.lexer.raw_token();
        if !as_keyword.eq_ignore_ascii_case("AS") {
            return Err(self.error(
                ParseErrorKind::UnexpectedArgument {
                    instruction: keyword.to_ascii_uppercase(),
                    text: as_keyword.to_string(),
                },
                alias_start,
                self.lexer.position(),
            ));
        }
        let Some(name_space) = self.lexer.space_before_more() else {
            return Err(self.error(
                ParseErrorKind::MissingArgument {
                    instruction: keyword.to_ascii_uppercase(),
                    expected: "a stage name after AS",
                },
                start,
                self.lexer.position(),
            ));
        };
        let name = self.argument(name_space, true)?;
        Ok(Arc::new(StageAlias {
            prefix,
            meta: self.meta_since(alias_start),
            keyword: as_keyword.to_string(),
            name,
        }))
    }

    fn instruction(
        &mut self,
        kind: InstructionKind,
        prefix: Space,
        keyword: &str,
        start: usize,
    ) -> Result<Instruction, ParseError> {
        let instruction = match kind {
            InstructionKind::Run => {
                let flags = self.flags()?;
                let space = self.required_space(keyword, "a command", start)?;
                let command = self.command_form(space)?;
                Instruction::Run(Arc::new(Run {
                    prefix,
                    meta: self.meta_since(start),
                    keyword: keyword.to_string(),
                    flags,
                    command,
                }))
            }
            InstructionKind::Cmd => Instruction::Cmd(self.cmd(prefix, keyword, start)?),
            InstructionKind::Entrypoint => {
                let space = self.required_space(keyword, "a command", start)?;
                let command = self.command_form(space)?;
                Instruction::Entrypoint(Arc::new(Entrypoint {
                    prefix,
                    meta: self.meta_since(start),
                    keyword: keyword.to_string(),
                    command,
                }))
            }
            InstructionKind::Shell => {
                let space = self.required_space(keyword, "a shell", start)?;
                let command = self.command_form(space)?;
                Instruction::Shell(Arc::new(Shell {
                    prefix,
                    meta: self.meta_since(start),
                    keyword: keyword.to_string(),
                    command,
                }))
            }
            InstructionKind::Volume => {
                let space = self.required_space(keyword, "a path", start)?;
                let paths = self.command_form(space)?;
                Instruction::Volume(Arc::new(Volume {
                    prefix,
                    meta: self.meta_since(start),
                    keyword: keyword.to_string(),
                    paths,
                }))
            }
            InstructionKind::Add => {
                let flags = self.flags()?;
                let space = self.required_space(keyword, "a source and a destination", start)?;
                let operands = self.operands(space, keyword, start)?;
                Instruction::Add(Arc::new(Add {
                    prefix,
                    meta: self.meta_since(start),
                    keyword: keyword.to_string(),
                    flags,
                    operands,
                }))
            }
            InstructionKind::Copy => {
                let flags = self.flags()?;
                let space = self.required_space(keyword, "a source and a destination", start)?;
                let operands = self.operands(space, keyword, start)?;
                Instruction::Copy(Arc::new(Copy {
                    prefix,
                    meta: self.meta_since(start),
                    keyword: keyword.to_string(),
                    flags,
                    operands,
                }))
            }
            InstructionKind::Arg => {
                let space = self.required_space(keyword, "a name", start)?;
                let pairs = self.pairs(kind, space, keyword, start)?;
                Instruction::Arg(Arc::new(Arg {
                    prefix,
                    meta: self.meta_since(start),
                    keyword: keyword.to_string(),
                    pairs,
                }))
            }
            InstructionKind::Env => {
                let space = self.required_space(keyword, "a name and a value", start)?;
                let pairs = self.pairs(kind, space, keyword, start)?;
                Instruction::Env(Arc::new(Env {
                    prefix,
                    meta: self.meta_since(start),
                    keyword: keyword.to_string(),
                    pairs,
                }))
            }
            InstructionKind::Label => {
                let space = self.required_space(keyword, "a key=value pair", start)?;
                let pairs = self.pairs(kind, space, keyword, start)?;
                Instruction::Label(Arc::new(Label {
                    prefix,
                    meta: self.meta_since(start),
                    keyword: keyword.to_string(),
                    pairs,
                }))
            }
            InstructionKind::Expose => {
                let space = self.required_space(keyword, "a port", start)?;
                let ports = self.words(space, true)?;
                Instruction::Expose(Arc::new(Expose {
                    prefix,
                    meta: self.meta_since(start),
                    keyword: keyword.to_string(),
                    ports,
                }))
            }
            InstructionKind::Workdir => {
                let space = self.required_space(keyword, "a path", start)?;
                let path = self.line_argument(space, true)?;
                Instruction::Workdir(Arc::new(Workdir {
                    prefix,
                    meta: self.meta_since(start),
                    keyword: keyword.to_string(),
                    path,
                }))
            }
            InstructionKind::User => {
                let space = self.required_space(keyword, "a user", start)?;
                let user = self.line_argument(space, true)?;
                Instruction::User(Arc::new(User {
                    prefix,
                    meta: self.meta_since(start),
                    keyword: keyword.to_string(),
                    user,
                }))
            }
            InstructionKind::Stopsignal => {
                let space = self.required_space(keyword, "a signal", start)?;
                let signal = self.line_argument(space, true)?;
                Instruction::Stopsignal(Arc::new(Stopsignal {
                    prefix,
                    meta: self.meta_since(start),
                    keyword: keyword.to_string(),
                    signal,
                }))
            }
            InstructionKind::Maintainer => {
                let space = self.required_space(keyword, "a name", start)?;
                let name = self.line_argument(space, false)?;
                Instruction::Maintainer(Arc::new(Maintainer {
                    prefix,
                    meta: self.meta_since(start),
                    keyword: keyword.to_string(),
                    name,
                }))
            }
            InstructionKind::Onbuild => {
                let space = self.required_space(keyword, "an instruction", start)?;
                let trigger = self.trigger(space, keyword)?;
                Instruction::Onbuild(Arc::new(Onbuild {
                    prefix,
                    meta: self.meta_since(start),
                    keyword: keyword.to_string(),
                    trigger,
                }))
            }
            InstructionKind::Healthcheck => {
                let flags = self.flags()?;
                let space = self.required_space(keyword, "NONE or CMD", start)?;
                let check = self.healthcheck_check(space, keyword)?;
                Instruction::Healthcheck(Arc::new(Healthcheck {
                    prefix,
                    meta: self.meta_since(start),
                    keyword: keyword.to_string(),
                    flags,
                    check,
                }))
            }
        };
        Ok(instruction)
    }

    fn cmd(&mut self, prefix: Space, keyword: &str, start: usize) -> Result<Arc<Cmd>, ParseError> {
        let space = self.required_space(keyword, "a command", start)?;
        let command = self.command_form(space)?;
        Ok(Arc::new(Cmd {
            prefix,
            meta: self.meta_since(start),
            keyword: keyword.to_string(),
            command,
        }))
    }

    fn trigger(&mut self, prefix: Space, onbuild: &str) -> Result<Instruction, ParseError> {
        let start = self.lexer.position();
        let keyword = self.keyword(start)?;
        let kind = InstructionKind::from_keyword(keyword)
            .filter(|kind| !matches!(kind, InstructionKind::Onbuild | InstructionKind::Maintainer));
        let Some(kind) = kind else {
            return Err(self.error(
                ParseErrorKind::UnexpectedArgument {
                    instruction: onbuild.to_ascii_uppercase(),
                    text: keyword.to_string(),
                },
                start,
                self.lexer.position(),
            ));
        };
        self.instruction(kind, prefix, keyword, start)
    }

    fn healthcheck_check(
        &mut self,
        prefix: Space,
        healthcheck: &str,
    ) -> Result<HealthcheckCheck, ParseError> {
        let start = self.lexer.position();
        let word = self.lexer.keyword();
        let at_boundary = self.lexer.at_word_boundary();

        if at_boundary && word.eq_ignore_ascii_case("NONE") {
            let none = Arc::new(Argument {
                prefix,
                meta: self.meta_since(start),
                contents: vec![ArgumentContent::plain(word)],
            });
            if self.lexer.space_before_more().is_some() {
                let extra_start = self.lexer.position();
                let text = self.lexer.raw_token();
                return Err(self.error(
                    ParseErrorKind::UnexpectedArgument {
                        instruction: healthcheck.to_ascii_uppercase(),
                        text: text.to_string(),
                    },
                    extra_start,
                    self.lexer.position(),
                ));
            }
            return Ok(HealthcheckCheck::None(none));
        }

        if at_boundary && word.eq_ignore_ascii_case("CMD") {
            return Ok(HealthcheckCheck::Cmd(self.cmd(prefix, word, start)?));
        }

        self.lexer.reset(start);
        let text = self.lexer.raw_token();
        Err(self.error(
            ParseErrorKind::UnexpectedArgument {
                instruction: healthcheck.to_ascii_uppercase(),
                text: text.to_string(),
            },
            start,
            self.lexer.position(),
        ))
    }

    fn command_form(&mut self, prefix: Space) -> Result<CommandForm, ParseError> {
        let start = self.lexer.position();

        if self.lexer.peek() == '[' {
            if let Some(form) = self.exec_form(prefix.clone()) {
                return Ok(CommandForm::Exec(Arc::new(form)));
            }
            self.lexer.reset(start);
        }

        if self.lexer.starts_with("<<") {
            if let Some(form) = self.heredoc_form(prefix.clone())? {
                return Ok(CommandForm::Heredoc(Arc::new(form)));
            }
        }

        let text = self.shell_text()?;
        Ok(CommandForm::Shell(Arc::new(ShellForm {
            prefix,
            meta: self.meta_since(start),
            argument: Arc::new(Argument::plain(Space::EMPTY, text)),
        })))
    }

    fn operands(
        &mut self,
        prefix: Space,
        keyword: &str,
        start: usize,
    ) -> Result<Operands, ParseError> {
        let operands_start = self.lexer.position();

        if self.lexer.peek() == '[' {
            if let Some(form) = self.exec_form(prefix.clone()) {
                return Ok(Operands::Exec(Arc::new(form)));
            }
            self.lexer.reset(operands_start);
        }

        if self.lexer.starts_with("<<") {
            if let Some(form) = self.heredoc_form(prefix.clone())? {
                return Ok(Operands::Heredoc(Arc::new(form)));
            }
        }

        let mut sources = self.words(prefix, true)?;
        match sources.pop() {
            Some(destination) if !sources.is_empty() => Ok(Operands::Paths {
                sources,
                destination,
            }),
            _ => Err(self.error(
                ParseErrorKind::MissingArgument {
                    instruction: keyword.to_ascii_uppercase(),
                    expected: "a source and a destination",
                },
                start,
                self.lexer.position(),
            )),
        }
    }

    /// Try to read a JSON array that ends the instruction.
    ///
    /// Returns `None` (cursor left wherever it stopped) for anything that is
    /// not a well-formed array of strings; the caller falls back to shell form.
    fn exec_form(&mut self, prefix: Space) -> Option<ExecForm> {
        let start = self.lexer.position();
        self.lexer.consume();

        let mut items = Vec::new();
        let closing = loop {
            let item_prefix = self.lexer.inline_space();
            if items.is_empty() && self.lexer.peek() == ']' {
                self.lexer.consume();
                break item_prefix;
            }

            let item_start = self.lexer.position();
            let raw = self.lexer.json_string()?;
            let value: String = serde_json::from_str(raw).ok()?;
            let meta = self.meta_since(item_start);
            let trailing = self.lexer.inline_space();

            let mut item = ExecItem {
                prefix: item_prefix,
                meta,
                raw: raw.to_string(),
                value,
                trailing: Space::EMPTY,
            };
            match self.lexer.peek() {
                ',' => {
                    self.lexer.consume();
                    item.trailing = trailing;
                    items.push(Arc::new(item));
                }
                ']' => {
                    self.lexer.consume();
                    items.push(Arc::new(item));
                    break trailing;
                }
                _ => return None,
            }
        };

        if self.lexer.space_before_more().is_some() {
            return None;
        }

        Some(ExecForm {
            prefix,
            meta: self.meta_since(start),
            items,
            closing,
        })
    }

    fn heredoc_form(&mut self, prefix: Space) -> Result<Option<HeredocForm>, ParseError> {
        let start = self.lexer.position();
        let Some((opening, first)) = self.lexer.heredoc_opening() else {
            return Ok(None);
        };

        let mut pending = vec![first.clone()];
        let destination = match self.lexer.space_before_more() {
            None => None,
            Some(space) => {
                let text_start = self.lexer.position();
                let (_, more) = self.lexer.line_text();
                if more.is_empty() {
                    self.lexer.trim_trailing_blanks(text_start);
                }
                pending.extend(more);
                let text = self.lexer.slice(text_start, self.lexer.position());
                Some(Arc::new(Argument {
                    prefix: space,
                    meta: self.meta_since(text_start),
                    contents: vec![ArgumentContent::plain(text)],
                }))
            }
        };

        let body_start = self.lexer.position();
        self.heredoc_bodies(&pending)?;
        let body = self.lexer.slice(body_start, self.lexer.position());

        Ok(Some(HeredocForm {
            prefix,
            meta: self.meta_since(start),
            opening: opening.to_string(),
            delimiter: first.delimiter,
            strip_tabs: first.strip_tabs,
            destination,
            body: body.to_string(),
        }))
    }

    fn heredoc_bodies(&mut self, heredocs: &[PendingHeredoc]) -> Result<(), ParseError> {
        for heredoc in heredocs {
            let start = self.lexer.position();
            if !self.lexer.heredoc_body(heredoc) {
                return Err(self.error(
                    ParseErrorKind::UnterminatedHeredoc {
                        delimiter: heredoc.delimiter.clone(),
                    },
                    start,
                    self.lexer.position(),
                ));
            }
        }
        Ok(())
    }

    /// Free text to the end of the logical line plus any heredoc bodies it
    /// opens. Trailing blanks are left for the next prefix.
    fn shell_text(&mut self) -> Result<String, ParseError> {
        let start = self.lexer.position();
        let (_, heredocs) = self.lexer.line_text();
        if heredocs.is_empty() {
            self.lexer.trim_trailing_blanks(start);
        } else {
            self.heredoc_bodies(&heredocs)?;
        }
        Ok(self.lexer.slice(start, self.lexer.position()).to_string())
    }

    fn pairs(
        &mut self,
        kind: InstructionKind,
        prefix: Space,
        keyword: &str,
        start: usize,
    ) -> Result<Vec<Arc<KeyValue>>, ParseError> {
        let mut pairs = Vec::new();
        let mut space = prefix;

        loop {
            let pair_start = self.lexer.position();
            let contents = self.word(true)?;

            let pair = match split_assignment(&contents) {
                Some((key, value)) => KeyValue {
                    prefix: space,
                    meta: self.meta_since(pair_start),
                    key: Arc::new(Argument::new(Space::EMPTY, key)),
                    separator: Separator::Equals,
                    value: Some(Arc::new(Argument::new(Space::EMPTY, value))),
                },
                None if kind == InstructionKind::Arg => KeyValue {
                    prefix: space,
                    meta: self.meta_since(pair_start),
                    key: Arc::new(Argument::new(Space::EMPTY, contents)),
                    separator: Separator::None,
                    value: None,
                },
                None if kind == InstructionKind::Env && pairs.is_empty() => {
                    let key = Arc::new(Argument {
                        prefix: Space::EMPTY,
                        meta: self.meta_since(pair_start),
                        contents,
                    });
                    let Some(value_space) = self.lexer.space_before_more() else {
                        return Err(self.error(
                            ParseErrorKind::MissingArgument {
                                instruction: keyword.to_ascii_uppercase(),
                                expected: "a value",
                            },
                            start,
                            self.lexer.position(),
                        ));
                    };
                    let value = self.line_argument(value_space, true)?;
                    pairs.push(Arc::new(KeyValue {
                        prefix: space,
                        meta: self.meta_since(pair_start),
                        key,
                        separator: Separator::Whitespace,
                        value: Some(value),
                    }));
                    return Ok(pairs);
                }
                None => {
                    let text = contents.iter().map(ArgumentContent::source).collect();
                    return Err(self.error(
                        ParseErrorKind::InvalidKeyValue {
                            instruction: keyword.to_ascii_uppercase(),
                            text,
                        },
                        pair_start,
                        self.lexer.position(),
                    ));
                }
            };
            pairs.push(Arc::new(pair));

            match self.lexer.space_before_more() {
                Some(next) => space = next,
                None => return Ok(pairs),
            }
        }
    }
}

/// Split a word at the first `=` outside quotes and variables.
fn split_assignment(
    contents: &[ArgumentContent],
) -> Option<(Vec<ArgumentContent>, Vec<ArgumentContent>)> {
    let (idx, at) = contents.iter().enumerate().find_map(|(idx, content)| match content {
        ArgumentContent::Plain(text) => text.find('=').map(|at| (idx, at)),
        _ => None,
    })?;
    let (key, value) = split_fragments(contents, idx, at);
    if key.is_empty() {
        return None;
    }
    Some((key, value))
}

/// Split `contents` around the one-byte separator at `at` inside the plain
/// fragment `idx`.
fn split_fragments(
    contents: &[ArgumentContent],
    idx: usize,
    at: usize,
) -> (Vec<ArgumentContent>, Vec<ArgumentContent>) {
    let mut before = contents[..idx].to_vec();
    let mut after = Vec::new();
    if let ArgumentContent::Plain(text) = &contents[idx] {
        if at > 0 {
            before.push(ArgumentContent::plain(&text[..at]));
        }
        if at + 1 < text.len() {
            after.push(ArgumentContent::plain(&text[at + 1..]));
        }
    }
    after.extend_from_slice(&contents[idx + 1..]);
    (before, after)
}

type ImageParts = (
    Vec<ArgumentContent>,
    Option<Vec<ArgumentContent>>,
    Option<Vec<ArgumentContent>>,
);

/// Split an image word into name, tag, and digest.
///
/// The digest starts at the first `@`; when present the tag is left inside
/// the name. Otherwise the tag starts at the last `:` with no `/` after it,
/// so `registry:5000/app` has no tag.
fn split_image_reference(contents: Vec<ArgumentContent>) -> ImageParts {
    if matches!(contents.as_slice(), [ArgumentContent::Quoted { .. }]) {
        return (contents, None, None);
    }

    let digest_at = contents.iter().enumerate().find_map(|(idx, content)| match content {
        ArgumentContent::Plain(text) => text.find('@').map(|at| (idx, at)),
        _ => None,
    });
    if let Some((idx, at)) = digest_at {
        let (name, digest) = split_fragments(&contents, idx, at);
        if name.is_empty() {
            return (contents, None, None);
        }
        return (name, None, Some(digest));
    }

    let mut seen_slash = false;
    for (idx, content) in contents.iter().enumerate().rev() {
        match content {
            ArgumentContent::Plain(text) => {
                if let Some(colon) = text.rfind(':') {
                    if !seen_slash && !text[colon + 1..].contains('/') {
                        let (name, tag) = split_fragments(&contents, idx, colon);
                        if !name.is_empty() {
                            return (name, Some(tag), None);
                        }
                    }
                    break;
                }
                seen_slash |= text.contains('/');
            }
            ArgumentContent::Quoted { text, .. } => seen_slash |= text.contains('/'),
            ArgumentContent::Variable { .. } => {}
        }
    }

    (contents, None, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(text: &str) -> ArgumentContent {
        ArgumentContent::plain(text)
    }

    fn var(name: &str) -> ArgumentContent {
        ArgumentContent::Variable {
            name: name.into(),
            braced: true,
        }
    }

    mod image_reference {
        use super::*;

        #[test]
        fn name_and_tag() {
            let (name, tag, digest) = split_image_reference(vec![plain("ubuntu:22.04")]);
            assert_eq!(name, vec![plain("ubuntu")]);
            assert_eq!(tag, Some(vec![plain("22.04")]));
            assert_eq!(digest, None);
        }

        #[test]
        fn registry_port_is_not_a_tag() {
            let (name, tag, _) = split_image_reference(vec![plain("localhost:5000/app")]);
            assert_eq!(name, vec![plain("localhost:5000/app")]);
            assert_eq!(tag, None);
        }

        #[test]
        fn digest_keeps_tag_in_name() {
            let (name, tag, digest) =
                split_image_reference(vec![plain("nginx:1.25@sha256:0123abcd")]);
            assert_eq!(name, vec![plain("nginx:1.25")]);
            assert_eq!(tag, None);
            assert_eq!(digest, Some(vec![plain("sha256:0123abcd")]));
        }

        #[test]
        fn variables_stay_whole() {
            let (name, tag, _) = split_image_reference(vec![
                var("REGISTRY"),
                plain("/image:"),
                var("VERSION"),
                plain("-suffix"),
            ]);
            assert_eq!(name, vec![var("REGISTRY"), plain("/image")]);
            assert_eq!(tag, Some(vec![var("VERSION"), plain("-suffix")]));
        }
    }

    #[test]
    fn assignment_splits_at_first_equals() {
        let (key, value) = split_assignment(&[plain("A=b=c")]).unwrap();
        assert_eq!(key, vec![plain("A")]);
        assert_eq!(value, vec![plain("b=c")]);
        assert_eq!(split_assignment(&[plain("=x")]), None);
        assert_eq!(split_assignment(&[plain("NAME")]), None);
    }
}
