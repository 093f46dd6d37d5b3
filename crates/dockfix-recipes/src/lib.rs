//! The dockfix rule library.
//!
//! Each module holds one rule (two for EXPOSE): a static
//! [`RecipeDescriptor`](dockfix_rewrite::RecipeDescriptor), an options
//! struct deserialised from configuration, and the visitor that does the
//! work. [`registry`] maps rule names to constructors so callers can build
//! rules from configuration without naming the types.
//!
//! ## Rules
//!
//! - `change-base-image`: retarget matching FROM references
//! - `combine-run-instructions`: merge consecutive shell-form RUNs
//! - `add-package-cache-cleanup`: drop package manager caches after installs
//! - `add-or-update-label`, `add-or-update-env`, `add-oci-image-labels`
//! - `replace-add-with-copy`, `replace-maintainer-with-label`
//! - `convert-to-exec-form`, `normalize-instruction-case`
//! - `add-user-instruction`, `add-healthcheck`
//! - `add-exposed-port`, `remove-exposed-port`
//! - `add-no-install-recommends`

pub mod add_to_copy;
pub mod change_base_image;
pub mod combine_run;
pub mod env;
pub mod exec_form;
pub mod expose;
pub mod healthcheck;
pub mod instruction_case;
pub mod label;
pub mod maintainer;
pub mod no_install_recommends;
pub mod oci_labels;
pub mod package_cleanup;
pub mod registry;
mod shell;
mod stage;
#[cfg(test)]
mod testing;
mod upsert;
pub mod user;

pub use add_to_copy::ReplaceAddWithCopy;
pub use change_base_image::ChangeBaseImage;
pub use combine_run::CombineRunInstructions;
pub use env::AddOrUpdateEnv;
pub use exec_form::ConvertToExecForm;
pub use expose::AddExposedPort;
pub use expose::RemoveExposedPort;
pub use healthcheck::AddHealthcheck;
pub use instruction_case::NormalizeInstructionCase;
pub use label::AddOrUpdateLabel;
pub use maintainer::ReplaceMaintainerWithLabel;
pub use no_install_recommends::AddNoInstallRecommends;
pub use oci_labels::AddOciImageLabels;
pub use package_cleanup::AddPackageCacheCleanup;
pub use registry::catalog;
pub use registry::recipe_from_options;
pub use user::AddUserInstruction;
