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
    name: "add-or-update-label",
    display_name: "Add or update a label",
    description: "Add a LABEL to a stage, or change the value of an existing one.",
    options: &[
        OptionSpec::new("key", OptionKind::String, "Label key.")
            .example("org.opencontainers.image.version")
            .required(),
        OptionSpec::new("value", OptionKind::String, "Label value.")
            .example("1.2.3")
            .required(),
        OptionSpec::new(
            "overwrite_existing",
            OptionKind::Boolean,
            "Replace the value when the label already exists with another one.",
        ),
        OptionSpec::new(
            "stage",
            OptionKind::String,
            "Stage alias or index to edit. Defaults to the final stage.",
        )
        .example("runtime"),
    ],
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddOrUpdateLabel {
    pub key: Option<String>,
    pub value: Option<String>,
    #[serde(default)]
    pub overwrite_existing: bool,
    pub stage: Option<String>,
}

impl AddOrUpdateLabel {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            value: Some(value.into()),
            ..Self::default()
        }
    }
}

impl Recipe for AddOrUpdateLabel {
    fn descriptor(&self) -> &'static RecipeDescriptor {
        &DESCRIPTOR
    }

    fn validate(&self) -> Result<(), OptionsError> {
        upsert::validate(DESCRIPTOR.name, self.key.as_deref(), self.value.as_deref())
    }

    fn visitor(&self) -> Option<Box<dyn Visitor>> {
        Some(Box::new(Iso(Upsert {
            kind: InstructionKind::Label,
            key: self.key.clone()?,
            value: self.value.clone()?,
            overwrite_existing: self.overwrite_existing,
            stage: self.stage.clone(),
        })))
    }
}
