use dockfix_rewrite::OptionKind;
use dockfix_rewrite::OptionSpec;
use dockfix_rewrite::Recipe;
use dockfix_rewrite::RecipeDescriptor;
use serde::Deserialize;

use crate::label::AddOrUpdateLabel;

const fn annotation(
    name: &'static str,
    description: &'static str,
    example: &'static str,
) -> OptionSpec {
    OptionSpec::new(name, OptionKind::String, description).example(example)
}

pub static DESCRIPTOR: RecipeDescriptor = RecipeDescriptor {
    name: "add-oci-image-labels",
    display_name: "Add OCI image labels",
    description: "Add the standard `org.opencontainers.image.*` labels. Each option that is set \
                  becomes one label; blank options are skipped.",
    options: &[
        annotation("title", "Human-readable title of the image.", "My App"),
        annotation("description", "Human-readable description of the software.", "Serves the API"),
        annotation("version", "Version of the packaged software.", "1.2.3"),
        annotation("revision", "Source control revision the image was built from.", "4f1c2a9"),
        annotation("created", "Build date and time, RFC 3339.", "2024-01-01T00:00:00Z"),
        annotation("source", "URL of the source code.", "https://github.com/acme/app"),
        annotation("url", "URL with information about the image.", "https://acme.example"),
        annotation("documentation", "URL of the documentation.", "https://docs.acme.example"),
        annotation("vendor", "Distributing entity.", "Acme Inc."),
        annotation("licenses", "SPDX license expression.", "Apache-2.0"),
        OptionSpec::new(
            "overwrite_existing",
            OptionKind::Boolean,
            "Replace labels that already exist with another value.",
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
pub struct AddOciImageLabels {
    pub title: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    pub revision: Option<String>,
    pub created: Option<String>,
    pub source: Option<String>,
    pub url: Option<String>,
    pub documentation: Option<String>,
    pub vendor: Option<String>,
    pub licenses: Option<String>,
    #[serde(default)]
    pub overwrite_existing: bool,
    pub stage: Option<String>,
}

impl AddOciImageLabels {
    fn labels(&self) -> [(&'static str, Option<&str>); 10] {
        [
            ("title", self.title.as_deref()),
            ("description", self.description.as_deref()),
            ("version", self.version.as_deref()),
            ("revision", self.revision.as_deref()),
            ("created", self.created.as_deref()),
            ("source", self.source.as_deref()),
            ("url", self.url.as_deref()),
            ("documentation", self.documentation.as_deref()),
            ("vendor", self.vendor.as_deref()),
            ("licenses", self.licenses.as_deref()),
        ]
    }
}

impl Recipe for AddOciImageLabels {
    fn descriptor(&self) -> &'static RecipeDescriptor {
        &DESCRIPTOR
    }

    fn sub_recipes(&self) -> Vec<Box<dyn Recipe>> {
        self.labels()
            .into_iter()
            .filter_map(|(name, value)| {
                let value = value.filter(|value| !value.trim().is_empty())?;
                Some(Box::new(AddOrUpdateLabel {
                    key: Some(format!("org.opencontainers.image.{name}")),
                    value: Some(value.to_string()),
                    overwrite_existing: self.overwrite_existing,
                    stage: self.stage.clone(),
                }) as Box<dyn Recipe>)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::rewrite_noop;
    use crate::testing::rewrite_test;

    #[test]
    fn expands_only_set_options() {
        let recipe = AddOciImageLabels {
            title: Some("app".to_string()),
            version: Some("1.2.3".to_string()),
            vendor: Some("  ".to_string()),
            ..AddOciImageLabels::default()
        };
        let names: Vec<String> = recipe
            .sub_recipes()
            .iter()
            .map(|sub| sub.name().to_string())
            .collect();
        assert_eq!(names, vec!["add-or-update-label", "add-or-update-label"]);

        rewrite_test(
            &recipe,
            "FROM alpine\nCMD [\"app\"]\n",
            "FROM alpine\nLABEL org.opencontainers.image.title=app\nLABEL org.opencontainers.image.version=1.2.3\nCMD [\"app\"]\n",
        );
    }

    #[test]
    fn nothing_set_is_a_no_op() {
        rewrite_noop(&AddOciImageLabels::default(), "FROM alpine\n");
    }
}
