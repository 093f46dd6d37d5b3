use std::sync::Arc;

use dockfix_rewrite::options;
use dockfix_rewrite::Iso;
use dockfix_rewrite::IsoVisitor;
use dockfix_rewrite::OptionKind;
use dockfix_rewrite::OptionSpec;
use dockfix_rewrite::OptionsError;
use dockfix_rewrite::Recipe;
use dockfix_rewrite::RecipeDescriptor;
use dockfix_rewrite::VisitContext;
use dockfix_rewrite::Visitor;
use dockfix_syntax::Argument;
use dockfix_syntax::Cmd;
use dockfix_syntax::CommandForm;
use dockfix_syntax::Flag;
use dockfix_syntax::Healthcheck;
use dockfix_syntax::HealthcheckCheck;
use dockfix_syntax::Instruction;
use dockfix_syntax::InstructionKind;
use dockfix_syntax::Meta;
use dockfix_syntax::ShellForm;
use dockfix_syntax::Space;
use dockfix_syntax::Stage;
use serde::Deserialize;

use crate::stage;

pub static DESCRIPTOR: RecipeDescriptor = RecipeDescriptor {
    name: "add-healthcheck",
    display_name: "Add HEALTHCHECK",
    description: "Add a HEALTHCHECK to a stage that has none.",
    options: &[
        OptionSpec::new("cmd", OptionKind::String, "Shell command that checks the container.")
            .example("curl -f http://localhost/ || exit 1")
            .required(),
        OptionSpec::new("interval", OptionKind::String, "Time between checks.").example("30s"),
        OptionSpec::new("timeout", OptionKind::String, "Time a check may take.").example("3s"),
        OptionSpec::new(
            "start_period",
            OptionKind::String,
            "Grace period after the container starts.",
        )
        .example("5s"),
        OptionSpec::new(
            "retries",
            OptionKind::Integer,
            "Consecutive failures before the container is unhealthy.",
        )
        .example("3"),
        OptionSpec::new(
            "stage",
            OptionKind::String,
            "Stage alias or index to edit. Defaults to the final stage.",
        ),
    ],
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddHealthcheck {
    pub cmd: Option<String>,
    pub interval: Option<String>,
    pub timeout: Option<String>,
    pub start_period: Option<String>,
    pub retries: Option<u32>,
    pub stage: Option<String>,
}

/// Go-style duration: one or more `<digits><unit>` groups, like `1m30s`.
fn is_duration(text: &str) -> bool {
    const UNITS: &[&str] = &["ns", "us", "ms", "s", "m", "h"];
    let mut rest = text;
    if rest.is_empty() {
        return false;
    }
    while !rest.is_empty() {
        let digits = rest.len()
            - rest
                .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.')
                .len();
        if digits == 0 {
            return false;
        }
        rest = &rest[digits..];
        // Longest unit first so `ms` is not read as `m`.
        let Some(unit) = UNITS
            .iter()
            .filter(|unit| rest.starts_with(**unit))
            .max_by_key(|unit| unit.len())
        else {
            return false;
        };
        rest = &rest[unit.len()..];
    }
    true
}

impl AddHealthcheck {
    fn flags(&self) -> Vec<Arc<Flag>> {
        let retries = self.retries.map(|retries| retries.to_string());
        [
            ("interval", self.interval.as_deref()),
            ("timeout", self.timeout.as_deref()),
            ("start-period", self.start_period.as_deref()),
            ("retries", retries.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, value)| {
            let value = Argument::plain(Space::EMPTY, value?);
            Some(Arc::new(Flag::new(Space::single(), name, Some(value))))
        })
        .collect()
    }
}

impl Recipe for AddHealthcheck {
    fn descriptor(&self) -> &'static RecipeDescriptor {
        &DESCRIPTOR
    }

    fn validate(&self) -> Result<(), OptionsError> {
        options::require(DESCRIPTOR.name, "cmd", self.cmd.as_deref())?;
        for (name, value) in [
            ("interval", &self.interval),
            ("timeout", &self.timeout),
            ("start_period", &self.start_period),
        ] {
            if value.as_deref().is_some_and(|value| !is_duration(value)) {
                return Err(OptionsError::new(
                    DESCRIPTOR.name,
                    &[name],
                    format!("{name} must be a duration such as 30s or 1m30s"),
                ));
            }
        }
        Ok(())
    }

    fn visitor(&self) -> Option<Box<dyn Visitor>> {
        Some(Box::new(Iso(AddCheck {
            cmd: self.cmd.clone()?,
            flags: self.flags(),
            stage: self.stage.clone(),
        })))
    }
}

struct AddCheck {
    cmd: String,
    flags: Vec<Arc<Flag>>,
    stage: Option<String>,
}

impl IsoVisitor for AddCheck {
    fn visit_stage(&mut self, target: &Arc<Stage>, cx: &mut VisitContext) -> Arc<Stage> {
        let has_check = target
            .instructions
            .iter()
            .any(|instruction| instruction.kind() == InstructionKind::Healthcheck);
        if has_check || !cx.is_target_stage(self.stage.as_deref()) {
            return Arc::clone(target);
        }

        let keyword = stage::keyword_like(target, InstructionKind::Healthcheck);
        let check = Cmd {
            prefix: Space::single(),
            meta: Meta::new(),
            keyword: stage::keyword_like(target, InstructionKind::Cmd),
            command: CommandForm::Shell(Arc::new(ShellForm::new(
                Space::single(),
                self.cmd.as_str(),
            ))),
        };
        let index = stage::insertion_index(target, InstructionKind::Healthcheck);
        stage::insert_at(target, index, |prefix| {
            Instruction::Healthcheck(Arc::new(Healthcheck {
                prefix,
                meta: Meta::new(),
                keyword,
                flags: self.flags.clone(),
                check: HealthcheckCheck::Cmd(Arc::new(check)),
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::rewrite_noop;
    use crate::testing::rewrite_test;

    fn check(cmd: &str) -> AddHealthcheck {
        AddHealthcheck {
            cmd: Some(cmd.to_string()),
            ..AddHealthcheck::default()
        }
    }

    #[test]
    fn added_before_cmd_with_flags() {
        let recipe = AddHealthcheck {
            interval: Some("30s".to_string()),
            timeout: Some("3s".to_string()),
            retries: Some(3),
            ..check("curl -f http://localhost/ || exit 1")
        };
        rewrite_test(
            &recipe,
            "FROM nginx\nCOPY site /usr/share/nginx/html\nCMD [\"nginx\", \"-g\", \"daemon off;\"]\n",
            "FROM nginx\nCOPY site /usr/share/nginx/html\nHEALTHCHECK --interval=30s --timeout=3s --retries=3 CMD curl -f http://localhost/ || exit 1\nCMD [\"nginx\", \"-g\", \"daemon off;\"]\n",
        );
    }

    #[test]
    fn existing_checks_win() {
        rewrite_noop(&check("true"), "FROM alpine\nHEALTHCHECK NONE\n");
        rewrite_noop(&check("true"), "FROM alpine\nHEALTHCHECK CMD wget -q localhost\n");
    }

    #[test]
    fn durations() {
        assert!(is_duration("30s"));
        assert!(is_duration("1m30s"));
        assert!(is_duration("1.5h"));
        assert!(is_duration("250ms"));
        assert!(!is_duration("30"));
        assert!(!is_duration("s"));
        assert!(!is_duration(""));

        let bad = AddHealthcheck {
            interval: Some("soon".to_string()),
            ..check("true")
        };
        assert_eq!(
            bad.validate().unwrap_err().to_string(),
            "add-healthcheck: interval must be a duration such as 30s or 1m30s"
        );
    }
}
