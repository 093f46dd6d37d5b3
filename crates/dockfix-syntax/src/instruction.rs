use std::fmt;
use std::sync::Arc;

use crate::Argument;
use crate::CommandForm;
use crate::ExecForm;
use crate::Flag;
use crate::HeredocForm;
use crate::KeyValue;
use crate::Meta;
use crate::NodeId;
use crate::Space;

/// Keyword of an instruction inside a stage.
///
/// `FROM` is not listed: it opens a stage and lives on [`crate::Stage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InstructionKind {
    Add,
    Arg,
    Cmd,
    Copy,
    Entrypoint,
    Env,
    Expose,
    Healthcheck,
    Label,
    Maintainer,
    Onbuild,
    Run,
    Shell,
    Stopsignal,
    User,
    Volume,
    Workdir,
}

impl InstructionKind {
    pub const ALL: [InstructionKind; 17] = [
        InstructionKind::Add,
        InstructionKind::Arg,
        InstructionKind::Cmd,
        InstructionKind::Copy,
        InstructionKind::Entrypoint,
        InstructionKind::Env,
        InstructionKind::Expose,
        InstructionKind::Healthcheck,
        InstructionKind::Label,
        InstructionKind::Maintainer,
        InstructionKind::Onbuild,
        InstructionKind::Run,
        InstructionKind::Shell,
        InstructionKind::Stopsignal,
        InstructionKind::User,
        InstructionKind::Volume,
        InstructionKind::Workdir,
    ];

    /// Canonical upper-case keyword.
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            InstructionKind::Add => "ADD",
            InstructionKind::Arg => "ARG",
            InstructionKind::Cmd => "CMD",
            InstructionKind::Copy => "COPY",
            InstructionKind::Entrypoint => "ENTRYPOINT",
            InstructionKind::Env => "ENV",
            InstructionKind::Expose => "EXPOSE",
            InstructionKind::Healthcheck => "HEALTHCHECK",
            InstructionKind::Label => "LABEL",
            InstructionKind::Maintainer => "MAINTAINER",
            InstructionKind::Onbuild => "ONBUILD",
            InstructionKind::Run => "RUN",
            InstructionKind::Shell => "SHELL",
            InstructionKind::Stopsignal => "STOPSIGNAL",
            InstructionKind::User => "USER",
            InstructionKind::Volume => "VOLUME",
            InstructionKind::Workdir => "WORKDIR",
        }
    }

    /// Case-insensitive keyword lookup.
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.keyword().eq_ignore_ascii_case(keyword))
    }

    /// CMD and ENTRYPOINT close a stage's runtime configuration; new
    /// instructions are inserted before them.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, InstructionKind::Cmd | InstructionKind::Entrypoint)
    }
}

impl fmt::Display for InstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub prefix: Space,
    pub meta: Meta,
    pub keyword: String,
    pub flags: Vec<Arc<Flag>>,
    pub command: CommandForm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmd {
    pub prefix: Space,
    pub meta: Meta,
    pub keyword: String,
    pub command: CommandForm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entrypoint {
    pub prefix: Space,
    pub meta: Meta,
    pub keyword: String,
    pub command: CommandForm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shell {
    pub prefix: Space,
    pub meta: Meta,
    pub keyword: String,
    pub command: CommandForm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    pub prefix: Space,
    pub meta: Meta,
    pub keyword: String,
    pub paths: CommandForm,
}

/// Sources and destination of ADD or COPY.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operands {
    Paths {
        sources: Vec<Arc<Argument>>,
        destination: Arc<Argument>,
    },
    Exec(Arc<ExecForm>),
    Heredoc(Arc<HeredocForm>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Add {
    pub prefix: Space,
    pub meta: Meta,
    pub keyword: String,
    pub flags: Vec<Arc<Flag>>,
    pub operands: Operands,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Copy {
    pub prefix: Space,
    pub meta: Meta,
    pub keyword: String,
    pub flags: Vec<Arc<Flag>>,
    pub operands: Operands,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arg {
    pub prefix: Space,
    pub meta: Meta,
    pub keyword: String,
    pub pairs: Vec<Arc<KeyValue>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Env {
    pub prefix: Space,
    pub meta: Meta,
    pub keyword: String,
    pub pairs: Vec<Arc<KeyValue>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub prefix: Space,
    pub meta: Meta,
    pub keyword: String,
    pub pairs: Vec<Arc<KeyValue>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expose {
    pub prefix: Space,
    pub meta: Meta,
    pub keyword: String,
    pub ports: Vec<Arc<Argument>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workdir {
    pub prefix: Space,
    pub meta: Meta,
    pub keyword: String,
    pub path: Arc<Argument>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub prefix: Space,
    pub meta: Meta,
    pub keyword: String,
    pub user: Arc<Argument>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stopsignal {
    pub prefix: Space,
    pub meta: Meta,
    pub keyword: String,
    pub signal: Arc<Argument>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Maintainer {
    pub prefix: Space,
    pub meta: Meta,
    pub keyword: String,
    pub name: Arc<Argument>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Onbuild {
    pub prefix: Space,
    pub meta: Meta,
    pub keyword: String,
    pub trigger: Instruction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthcheckCheck {
    /// `HEALTHCHECK NONE`; the argument is the `NONE` word as written.
    None(Arc<Argument>),
    Cmd(Arc<Cmd>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Healthcheck {
    pub prefix: Space,
    pub meta: Meta,
    pub keyword: String,
    pub flags: Vec<Arc<Flag>>,
    pub check: HealthcheckCheck,
}

/// One instruction of a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Add(Arc<Add>),
    Arg(Arc<Arg>),
    Cmd(Arc<Cmd>),
    Copy(Arc<Copy>),
    Entrypoint(Arc<Entrypoint>),
    Env(Arc<Env>),
    Expose(Arc<Expose>),
    Healthcheck(Arc<Healthcheck>),
    Label(Arc<Label>),
    Maintainer(Arc<Maintainer>),
    Onbuild(Arc<Onbuild>),
    Run(Arc<Run>),
    Shell(Arc<Shell>),
    Stopsignal(Arc<Stopsignal>),
    User(Arc<User>),
    Volume(Arc<Volume>),
    Workdir(Arc<Workdir>),
}

/// Expand `$body` once per variant with `$node` bound to the inner `Arc`.
macro_rules! each_variant {
    ($value:expr, $node:ident => $body:expr) => {
        match $value {
            Instruction::Add($node) => $body,
            Instruction::Arg($node) => $body,
            Instruction::Cmd($node) => $body,
            Instruction::Copy($node) => $body,
            Instruction::Entrypoint($node) => $body,
            Instruction::Env($node) => $body,
            Instruction::Expose($node) => $body,
            Instruction::Healthcheck($node) => $body,
            Instruction::Label($node) => $body,
            Instruction::Maintainer($node) => $body,
            Instruction::Onbuild($node) => $body,
            Instruction::Run($node) => $body,
            Instruction::Shell($node) => $body,
            Instruction::Stopsignal($node) => $body,
            Instruction::User($node) => $body,
            Instruction::Volume($node) => $body,
            Instruction::Workdir($node) => $body,
        }
    };
}

/// Same as `each_variant!`, but rebuilds the instruction from a modified
/// clone of the inner node.
macro_rules! map_variant {
    ($value:expr, $node:ident => $body:expr) => {
        match $value {
            Instruction::Add(inner) => { let mut $node = (**inner).clone(); $body; Instruction::Add(Arc::new($node)) }
            Instruction::Arg(inner) => { let mut $node = (**inner).clone(); $body; Instruction::Arg(Arc::new($node)) }
            Instruction::Cmd(inner) => { let mut $node = (**inner).clone(); $body; Instruction::Cmd(Arc::new($node)) }
            Instruction::Copy(inner) => { let mut $node = (**inner).clone(); $body; Instruction::Copy(Arc::new($node)) }
            Instruction::Entrypoint(inner) => { let mut $node = (**inner).clone(); $body; Instruction::Entrypoint(Arc::new($node)) }
            Instruction::Env(inner) => { let mut $node = (**inner).clone(); $body; Instruction::Env(Arc::new($node)) }
            Instruction::Expose(inner) => { let mut $node = (**inner).clone(); $body; Instruction::Expose(Arc::new($node)) }
            Instruction::Healthcheck(inner) => { let mut $node = (**inner).clone(); $body; Instruction::Healthcheck(Arc::new($node)) }
            Instruction::Label(inner) => { let mut $node = (**inner).clone(); $body; Instruction::Label(Arc::new($node)) }
            Instruction::Maintainer(inner) => { let mut $node = (**inner).clone(); $body; Instruction::Maintainer(Arc::new($node)) }
            Instruction::Onbuild(inner) => { let mut $node = (**inner).clone(); $body; Instruction::Onbuild(Arc::new($node)) }
            Instruction::Run(inner) => { let mut $node = (**inner).clone(); $body; Instruction::Run(Arc::new($node)) }
            Instruction::Shell(inner) => { let mut $node = (**inner).clone(); $body; Instruction::Shell(Arc::new($node)) }
            Instruction::Stopsignal(inner) => { let mut $node = (**inner).clone(); $body; Instruction::Stopsignal(Arc::new($node)) }
            Instruction::User(inner) => { let mut $node = (**inner).clone(); $body; Instruction::User(Arc::new($node)) }
            Instruction::Volume(inner) => { let mut $node = (**inner).clone(); $body; Instruction::Volume(Arc::new($node)) }
            Instruction::Workdir(inner) => { let mut $node = (**inner).clone(); $body; Instruction::Workdir(Arc::new($node)) }
        }
    };
}

impl Instruction {
    #[must_use]
    pub fn kind(&self) -> InstructionKind {
        match self {
            Instruction::Add(_) => InstructionKind::Add,
            Instruction::Arg(_) => InstructionKind::Arg,
            Instruction::Cmd(_) => InstructionKind::Cmd,
            Instruction::Copy(_) => InstructionKind::Copy,
            Instruction::Entrypoint(_) => InstructionKind::Entrypoint,
            Instruction::Env(_) => InstructionKind::Env,
            Instruction::Expose(_) => InstructionKind::Expose,
            Instruction::Healthcheck(_) => InstructionKind::Healthcheck,
            Instruction::Label(_) => InstructionKind::Label,
            Instruction::Maintainer(_) => InstructionKind::Maintainer,
            Instruction::Onbuild(_) => InstructionKind::Onbuild,
            Instruction::Run(_) => InstructionKind::Run,
            Instruction::Shell(_) => InstructionKind::Shell,
            Instruction::Stopsignal(_) => InstructionKind::Stopsignal,
            Instruction::User(_) => InstructionKind::User,
            Instruction::Volume(_) => InstructionKind::Volume,
            Instruction::Workdir(_) => InstructionKind::Workdir,
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &Space {
        each_variant!(self, node => &node.prefix)
    }

    #[must_use]
    pub fn meta(&self) -> &Meta {
        each_variant!(self, node => &node.meta)
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.meta().id()
    }

    /// The keyword as written in the source, original casing kept.
    #[must_use]
    pub fn keyword(&self) -> &str {
        each_variant!(self, node => node.keyword.as_str())
    }

    #[must_use]
    pub fn with_prefix(&self, prefix: Space) -> Instruction {
        map_variant!(self, node => node.prefix = prefix)
    }

    #[must_use]
    pub fn with_keyword(&self, keyword: impl Into<String>) -> Instruction {
        let keyword = keyword.into();
        map_variant!(self, node => node.keyword = keyword)
    }

    /// Identity comparison: same variant pointing at the same allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Instruction) -> bool {
        match (self, other) {
            (Instruction::Add(a), Instruction::Add(b)) => Arc::ptr_eq(a, b),
            (Instruction::Arg(a), Instruction::Arg(b)) => Arc::ptr_eq(a, b),
            (Instruction::Cmd(a), Instruction::Cmd(b)) => Arc::ptr_eq(a, b),
            (Instruction::Copy(a), Instruction::Copy(b)) => Arc::ptr_eq(a, b),
            (Instruction::Entrypoint(a), Instruction::Entrypoint(b)) => Arc::ptr_eq(a, b),
            (Instruction::Env(a), Instruction::Env(b)) => Arc::ptr_eq(a, b),
            (Instruction::Expose(a), Instruction::Expose(b)) => Arc::ptr_eq(a, b),
            (Instruction::Healthcheck(a), Instruction::Healthcheck(b)) => Arc::ptr_eq(a, b),
            (Instruction::Label(a), Instruction::Label(b)) => Arc::ptr_eq(a, b),
            (Instruction::Maintainer(a), Instruction::Maintainer(b)) => Arc::ptr_eq(a, b),
            (Instruction::Onbuild(a), Instruction::Onbuild(b)) => Arc::ptr_eq(a, b),
            (Instruction::Run(a), Instruction::Run(b)) => Arc::ptr_eq(a, b),
            (Instruction::Shell(a), Instruction::Shell(b)) => Arc::ptr_eq(a, b),
            (Instruction::Stopsignal(a), Instruction::Stopsignal(b)) => Arc::ptr_eq(a, b),
            (Instruction::User(a), Instruction::User(b)) => Arc::ptr_eq(a, b),
            (Instruction::Volume(a), Instruction::Volume(b)) => Arc::ptr_eq(a, b),
            (Instruction::Workdir(a), Instruction::Workdir(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Pairs of an ENV, LABEL, or ARG instruction.
    #[must_use]
    pub fn pairs(&self) -> Option<&[Arc<KeyValue>]> {
        match self {
            Instruction::Arg(node) => Some(&node.pairs),
            Instruction::Env(node) => Some(&node.pairs),
            Instruction::Label(node) => Some(&node.pairs),
            _ => None,
        }
    }

    /// Flags of instructions that take them.
    #[must_use]
    pub fn flags(&self) -> &[Arc<Flag>] {
        match self {
            Instruction::Add(node) => &node.flags,
            Instruction::Copy(node) => &node.flags,
            Instruction::Healthcheck(node) => &node.flags,
            Instruction::Run(node) => &node.flags,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ShellForm;

    fn run(text: &str) -> Instruction {
        Instruction::Run(Arc::new(Run {
            prefix: Space::EMPTY,
            meta: Meta::new(),
            keyword: "run".into(),
            flags: Vec::new(),
            command: CommandForm::Shell(Arc::new(ShellForm::new(Space::single(), text))),
        }))
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(
            InstructionKind::from_keyword("entrypoint"),
            Some(InstructionKind::Entrypoint)
        );
        assert_eq!(
            InstructionKind::from_keyword("HealthCheck"),
            Some(InstructionKind::Healthcheck)
        );
        assert_eq!(InstructionKind::from_keyword("FROM"), None);
        assert_eq!(InstructionKind::from_keyword("RUNX"), None);
    }

    #[test]
    fn with_prefix_keeps_identity_and_kind() {
        let original = run("make");
        let moved = original.with_prefix(Space::newline());
        assert_eq!(moved.kind(), InstructionKind::Run);
        assert_eq!(moved.id(), original.id());
        assert_eq!(moved.prefix(), &Space::newline());
        assert!(!moved.ptr_eq(&original));
        assert_eq!(moved.keyword(), "run");
    }

    #[test]
    fn with_keyword_changes_only_keyword() {
        let upper = run("make").with_keyword("RUN");
        assert_eq!(upper.keyword(), "RUN");
        assert!(upper.flags().is_empty());
        assert!(upper.pairs().is_none());
    }
}
