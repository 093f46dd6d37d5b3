use dockfix_rewrite::Iso;
use dockfix_rewrite::OptionKind;
use dockfix_rewrite::OptionSpec;
use dockfix_rewrite::OptionsError;
use dockfix_rewrite::Recipe;
use dockfix_rewrite::RecipeDescriptor;
use dockfix_rewrite::Visitor;
use dockfix_syntax::InstructionKind;
use serde::Deserialize;

use crate::upsert;
use crate::upsert::Upsert;

pub static DESCRIPTOR: RecipeDescriptor = RecipeDescriptor {
    name: "add-or-update-env",
    display_name: "Add or update an environment variable",
    description: "Add an ENV variable to a stage, or change the value of an existing one.",
    options: &[
        OptionSpec::new("key", OptionKind::String, "Variable name.")
            .example("PYTHONUNBUFFERED")
            .required(),
        OptionSpec::new("value", OptionKind::String, "Variable value.")
            .example("1")
            .required(),
        OptionSpec::new(
            "overwrite_existing",
            OptionKind::Boolean,
            "Replace the value when the variable is already set to another one.",
        ),
        OptionSpec::new(
            "stage",
            OptionKind::String,
            "Stage alias or index to edit. Defaults to the final stage.",
        ),
    ],
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddOrUpdateEnv {
    pub key: Option<String>,
    pub value: Option<String>,
    #[serde(default)]
    pub overwrite_existing: bool,
    pub stage: Option<String>,
}

impl Recipe for AddOrUpdateEnv {
    fn descriptor(&self) -> &'static RecipeDescriptor {
        &DESCRIPTOR
    }

    fn validate(&self) -> Result<(), OptionsError> {
        upsert::validate(DESCRIPTOR.name, self.key.as_deref(), self.value.as_deref())?;
        if self.key.as_deref().is_some_and(|key| key.contains('=')) {
            return Err(OptionsError::new(
                DESCRIPTOR.name,
                &["key"],
                "key must not contain '='",
            ));
        }
        Ok(())
    }

    fn visitor(&self) -> Option<Box<dyn Visitor>> {
        Some(Box::new(Iso(Upsert {
            kind: InstructionKind::Env,
            key: self.key.clone()?,
            value: self.value.clone()?,
            overwrite_existing: self.overwrite_existing,
            stage: self.stage.clone(),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::rewrite_noop;
    use crate::testing::rewrite_test;

    fn env(key: &str, value: &str, overwrite_existing: bool) -> AddOrUpdateEnv {
        AddOrUpdateEnv {
            key: Some(key.to_string()),
            value: Some(value.to_string()),
            overwrite_existing,
            stage: None,
        }
    }

    #[test]
    fn inserted_next_to_other_env() {
        rewrite_test(
            &env("PYTHONUNBUFFERED", "1", false),
            "FROM python\nENV PATH=/app/bin:$PATH\nWORKDIR /app\nCMD [\"python\"]\n",
            "FROM python\nENV PATH=/app/bin:$PATH\nENV PYTHONUNBUFFERED=1\nWORKDIR /app\nCMD [\"python\"]\n",
        );
    }

    #[test]
    fn legacy_form_is_updated_in_place() {
        let input = "FROM node\nENV NODE_ENV development\n";
        rewrite_noop(&env("NODE_ENV", "production", false), input);
        rewrite_test(
            &env("NODE_ENV", "production", true),
            input,
            "FROM node\nENV NODE_ENV production\n",
        );
    }

    #[test]
    fn indentation_follows_the_previous_instruction() {
        rewrite_test(
            &env("A", "1", false),
            "FROM alpine\n    RUN make\n    ENTRYPOINT [\"app\"]\n",
            "FROM alpine\n    RUN make\n    ENV A=1\n    ENTRYPOINT [\"app\"]\n",
        );
    }

    #[test]
    fn keys_are_validated() {
        assert!(env("A=B", "1", false).validate().is_err());
        assert!(env("A B", "1", false).validate().is_err());
        assert!(env("A", "", false).validate().is_ok());
    }
}
