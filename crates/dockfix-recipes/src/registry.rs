//! Name to recipe lookup for configuration files and the command line.

use dockfix_rewrite::Recipe;
use dockfix_rewrite::RecipeDescriptor;
use dockfix_rewrite::RecipeError;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::add_to_copy;
use crate::change_base_image;
use crate::combine_run;
use crate::env;
use crate::exec_form;
use crate::expose;
use crate::healthcheck;
use crate::instruction_case;
use crate::label;
use crate::maintainer;
use crate::no_install_recommends;
use crate::oci_labels;
use crate::package_cleanup;
use crate::user;

type Build = fn(Value) -> Result<Box<dyn Recipe>, serde_json::Error>;

fn build<R>(options: Value) -> Result<Box<dyn Recipe>, serde_json::Error>
where
    R: Recipe + DeserializeOwned + 'static,
{
    Ok(Box::new(serde_json::from_value::<R>(options)?))
}

static RECIPES: &[(&RecipeDescriptor, Build)] = &[
    (&change_base_image::DESCRIPTOR, build::<change_base_image::ChangeBaseImage>),
    (&combine_run::DESCRIPTOR, build::<combine_run::CombineRunInstructions>),
    (&package_cleanup::DESCRIPTOR, build::<package_cleanup::AddPackageCacheCleanup>),
    (&label::DESCRIPTOR, build::<label::AddOrUpdateLabel>),
    (&env::DESCRIPTOR, build::<env::AddOrUpdateEnv>),
    (&oci_labels::DESCRIPTOR, build::<oci_labels::AddOciImageLabels>),
    (&add_to_copy::DESCRIPTOR, build::<add_to_copy::ReplaceAddWithCopy>),
    (&exec_form::DESCRIPTOR, build::<exec_form::ConvertToExecForm>),
    (&user::DESCRIPTOR, build::<user::AddUserInstruction>),
    (&healthcheck::DESCRIPTOR, build::<healthcheck::AddHealthcheck>),
    (&expose::ADD_DESCRIPTOR, build::<expose::AddExposedPort>),
    (&expose::REMOVE_DESCRIPTOR, build::<expose::RemoveExposedPort>),
    (&instruction_case::DESCRIPTOR, build::<instruction_case::NormalizeInstructionCase>),
    (&maintainer::DESCRIPTOR, build::<maintainer::ReplaceMaintainerWithLabel>),
    (&no_install_recommends::DESCRIPTOR, build::<no_install_recommends::AddNoInstallRecommends>),
];

/// Every recipe this crate provides, in listing order.
pub fn catalog() -> impl Iterator<Item = &'static RecipeDescriptor> {
    RECIPES.iter().map(|(descriptor, _)| *descriptor)
}

#[must_use]
pub fn descriptor(name: &str) -> Option<&'static RecipeDescriptor> {
    catalog().find(|descriptor| descriptor.name == name)
}

/// Build a recipe from its name and a JSON object of options.
///
/// `null` counts as no options. The recipe is not validated here; the
/// engine does that before running it.
pub fn recipe_from_options(name: &str, options: Value) -> Result<Box<dyn Recipe>, RecipeError> {
    let Some((descriptor, build)) = RECIPES.iter().find(|(descriptor, _)| descriptor.name == name)
    else {
        return Err(RecipeError::UnknownRecipe {
            name: name.to_string(),
        });
    };
    let options = match options {
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other,
    };
    build(options).map_err(|source| RecipeError::InvalidOptions {
        recipe: descriptor.name.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn names_are_unique() {
        let mut names: Vec<_> = catalog().map(|descriptor| descriptor.name).collect();
        assert_eq!(names.len(), 15);
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 15);
    }

    #[test]
    fn listing_order() {
        let names: Vec<_> = catalog().map(|descriptor| descriptor.name).collect();
        insta::assert_snapshot!(names.join("\n"), @r"
        change-base-image
        combine-run-instructions
        add-package-cache-cleanup
        add-or-update-label
        add-or-update-env
        add-oci-image-labels
        replace-add-with-copy
        convert-to-exec-form
        add-user-instruction
        add-healthcheck
        add-exposed-port
        remove-exposed-port
        normalize-instruction-case
        replace-maintainer-with-label
        add-no-install-recommends
        ");
    }

    #[test]
    fn builds_with_options() {
        let recipe = recipe_from_options(
            "add-or-update-label",
            json!({"key": "team", "value": "infra", "overwrite_existing": true}),
        )
        .unwrap();
        assert_eq!(recipe.name(), "add-or-update-label");
        assert!(recipe.validate().is_ok());
    }

    #[test]
    fn null_means_no_options() {
        let recipe = recipe_from_options("replace-add-with-copy", Value::Null).unwrap();
        assert_eq!(recipe.name(), "replace-add-with-copy");
    }

    #[test]
    fn errors() {
        let unknown = recipe_from_options("make-it-fast", Value::Null).err().unwrap();
        assert_eq!(unknown.to_string(), "unknown recipe 'make-it-fast'");

        let typo = recipe_from_options("add-exposed-port", json!({"prot": "80"}))
            .err()
            .unwrap();
        assert_eq!(typo.diagnostic_code(), "R102");
        assert!(typo
            .to_string()
            .starts_with("invalid options for add-exposed-port: unknown field `prot`"));
    }

    #[test]
    fn descriptors_declare_every_field() {
        // Deserialising an object with every declared option must not trip
        // `deny_unknown_fields`.
        for descriptor in catalog() {
            let options: serde_json::Map<String, Value> = descriptor
                .options
                .iter()
                .map(|option| {
                    let value = match option.kind {
                        dockfix_rewrite::OptionKind::Boolean => json!(true),
                        dockfix_rewrite::OptionKind::Integer => json!(1),
                        dockfix_rewrite::OptionKind::StringList => json!([]),
                        dockfix_rewrite::OptionKind::String => json!("x"),
                    };
                    (option.name.to_string(), value)
                })
                .collect();
            assert!(
                recipe_from_options(descriptor.name, Value::Object(options)).is_ok(),
                "{}",
                descriptor.name
            );
        }
    }
}
