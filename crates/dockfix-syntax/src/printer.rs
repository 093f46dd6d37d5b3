use std::sync::Arc;

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
use crate::Expose;
use crate::Flag;
use crate::Healthcheck;
use crate::HealthcheckCheck;
use crate::HeredocForm;
use crate::Instruction;
use crate::KeyValue;
use crate::Label;
use crate::Maintainer;
use crate::Onbuild;
use crate::Operands;
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

/// Write a node back out as source text.
///
/// Printing a freshly parsed document reproduces its input byte for byte.
pub trait Print {
    fn print_to(&self, out: &mut String);

    #[must_use]
    fn print(&self) -> String {
        let mut out = String::new();
        self.print_to(&mut out);
        out
    }
}

impl<T: Print + ?Sized> Print for Arc<T> {
    fn print_to(&self, out: &mut String) {
        (**self).print_to(out);
    }
}

impl<T: Print> Print for Option<T> {
    fn print_to(&self, out: &mut String) {
        if let Some(node) = self {
            node.print_to(out);
        }
    }
}

impl<T: Print> Print for [T] {
    fn print_to(&self, out: &mut String) {
        for node in self {
            node.print_to(out);
        }
    }
}

impl<T: Print> Print for Vec<T> {
    fn print_to(&self, out: &mut String) {
        self.as_slice().print_to(out);
    }
}

impl Print for Space {
    fn print_to(&self, out: &mut String) {
        out.push_str(self.as_str());
    }
}

impl Print for Document {
    fn print_to(&self, out: &mut String) {
        self.preamble.print_to(out);
        self.stages.print_to(out);
        self.eof.print_to(out);
    }
}

impl Print for Stage {
    fn print_to(&self, out: &mut String) {
        self.from.print_to(out);
        self.instructions.print_to(out);
    }
}

impl Print for crate::From {
    fn print_to(&self, out: &mut String) {
        self.prefix.print_to(out);
        out.push_str(&self.keyword);
        self.flags.print_to(out);
        self.image.print_to(out);
        if let Some(tag) = &self.tag {
            out.push(':');
            tag.print_to(out);
        }
        if let Some(digest) = &self.digest {
            out.push('@');
            digest.print_to(out);
        }
        self.alias.print_to(out);
    }
}

impl Print for StageAlias {
    fn print_to(&self, out: &mut String) {
        self.prefix.print_to(out);
        out.push_str(&self.keyword);
        self.name.print_to(out);
    }
}

impl Print for ArgumentContent {
    fn print_to(&self, out: &mut String) {
        out.push_str(&self.source());
    }
}

impl Print for Argument {
    fn print_to(&self, out: &mut String) {
        self.prefix.print_to(out);
        self.contents.print_to(out);
    }
}

impl Print for Flag {
    fn print_to(&self, out: &mut String) {
        self.prefix.print_to(out);
        out.push_str("--");
        out.push_str(&self.name);
        if let Some(value) = &self.value {
            out.push('=');
            value.print_to(out);
        }
    }
}

impl Print for KeyValue {
    fn print_to(&self, out: &mut String) {
        self.prefix.print_to(out);
        self.key.print_to(out);
        if self.separator == Separator::Equals {
            out.push('=');
        }
        self.value.print_to(out);
    }
}

impl Print for CommandForm {
    fn print_to(&self, out: &mut String) {
        match self {
            CommandForm::Shell(form) => form.print_to(out),
            CommandForm::Exec(form) => form.print_to(out),
            CommandForm::Heredoc(form) => form.print_to(out),
        }
    }
}

impl Print for ShellForm {
    fn print_to(&self, out: &mut String) {
        self.prefix.print_to(out);
        self.argument.print_to(out);
    }
}

impl Print for ExecForm {
    fn print_to(&self, out: &mut String) {
        self.prefix.print_to(out);
        out.push('[');
        let last = self.items.len().saturating_sub(1);
        for (idx, item) in self.items.iter().enumerate() {
            item.prefix.print_to(out);
            out.push_str(&item.raw);
            item.trailing.print_to(out);
            if idx != last {
                out.push(',');
            }
        }
        self.closing.print_to(out);
        out.push(']');
    }
}

impl Print for HeredocForm {
    fn print_to(&self, out: &mut String) {
        self.prefix.print_to(out);
        out.push_str(&self.opening);
        self.destination.print_to(out);
        out.push_str(&self.body);
    }
}

impl Print for Operands {
    fn print_to(&self, out: &mut String) {
        match self {
            Operands::Paths {
                sources,
                destination,
            } => {
                sources.print_to(out);
                destination.print_to(out);
            }
            Operands::Exec(form) => form.print_to(out),
            Operands::Heredoc(form) => form.print_to(out),
        }
    }
}

impl Print for HealthcheckCheck {
    fn print_to(&self, out: &mut String) {
        match self {
            HealthcheckCheck::None(word) => word.print_to(out),
            HealthcheckCheck::Cmd(cmd) => cmd.print_to(out),
        }
    }
}

impl Print for Instruction {
    fn print_to(&self, out: &mut String) {
        match self {
            Instruction::Add(node) => node.print_to(out),
            Instruction::Arg(node) => node.print_to(out),
            Instruction::Cmd(node) => node.print_to(out),
            Instruction::Copy(node) => node.print_to(out),
            Instruction::Entrypoint(node) => node.print_to(out),
            Instruction::Env(node) => node.print_to(out),
            Instruction::Expose(node) => node.print_to(out),
            Instruction::Healthcheck(node) => node.print_to(out),
            Instruction::Label(node) => node.print_to(out),
            Instruction::Maintainer(node) => node.print_to(out),
            Instruction::Onbuild(node) => node.print_to(out),
            Instruction::Run(node) => node.print_to(out),
            Instruction::Shell(node) => node.print_to(out),
            Instruction::Stopsignal(node) => node.print_to(out),
            Instruction::User(node) => node.print_to(out),
            Instruction::Volume(node) => node.print_to(out),
            Instruction::Workdir(node) => node.print_to(out),
        }
    }
}

/// `prefix keyword <fields...>` for every instruction struct.
macro_rules! print_instruction {
    ($ty:ty => $($field:ident),*) => {
        impl Print for $ty {
            fn print_to(&self, out: &mut String) {
                self.prefix.print_to(out);
                out.push_str(&self.keyword);
                $(self.$field.print_to(out);)*
            }
        }
    };
}

print_instruction!(Run => flags, command);
print_instruction!(Cmd => command);
print_instruction!(Entrypoint => command);
print_instruction!(Shell => command);
print_instruction!(Volume => paths);
print_instruction!(Add => flags, operands);
print_instruction!(Copy => flags, operands);
print_instruction!(Arg => pairs);
print_instruction!(Env => pairs);
print_instruction!(Label => pairs);
print_instruction!(Expose => ports);
print_instruction!(Workdir => path);
print_instruction!(User => user);
print_instruction!(Stopsignal => signal);
print_instruction!(Maintainer => name);
print_instruction!(Onbuild => trigger);
print_instruction!(Healthcheck => flags, check);
