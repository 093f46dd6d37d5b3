use std::path::Path;
use std::path::PathBuf;

use config::Config;
use config::ConfigError as ExternalConfigError;
use config::File;
use config::FileFormat;
use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

/// File names discovery matches when `files` is not configured.
pub const DEFAULT_FILES: &[&str] = &["Dockerfile", "Dockerfile.*", "*.Dockerfile", "Containerfile"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration build/deserialize error")]
    Config(#[from] ExternalConfigError),
    #[error("Config file {} does not exist", .0.display())]
    MissingFile(PathBuf),
}

/// One `[[recipes]]` table: a recipe name and its options.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RecipeEntry {
    pub name: String,
    #[serde(default)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub debug: bool,
    /// Gitignore-style patterns for file discovery.
    pub files: Vec<String>,
    /// Recipes to run, in order.
    pub recipes: Vec<RecipeEntry>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            files: DEFAULT_FILES.iter().map(|pattern| (*pattern).to_string()).collect(),
            recipes: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings for a project, with `explicit` (from `--config`)
    /// taking precedence over everything else.
    pub fn new(project_root: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let user_config_file = ProjectDirs::from("dev", "dockfix", "dockfix")
            .map(|proj_dirs| proj_dirs.config_dir().join("dockfix.toml"));

        Self::load_from_paths(project_root, user_config_file.as_deref(), explicit)
    }

    fn load_from_paths(
        project_root: &Path,
        user_config_path: Option<&Path>,
        explicit: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = user_config_path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        builder = builder.add_source(
            File::from(project_root.join(".dockfix.toml"))
                .format(FileFormat::Toml)
                .required(false),
        );

        builder = builder.add_source(
            File::from(project_root.join("dockfix.toml"))
                .format(FileFormat::Toml)
                .required(false),
        );

        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(ConfigError::MissingFile(path.to_path_buf()));
            }
            tracing::debug!(path = %path.display(), "loading explicit config file");
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }

        let config = builder.build()?;
        let settings = config.try_deserialize()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    fn debug(on: bool) -> Settings {
        Settings {
            debug: on,
            ..Settings::default()
        }
    }

    mod defaults {
        use super::*;

        #[test]
        fn test_load_no_files() {
            let dir = tempdir().unwrap();
            let settings = Settings::load_from_paths(dir.path(), None, None).unwrap();
            assert_eq!(settings, Settings::default());
            assert_eq!(settings.files, DEFAULT_FILES);
            assert!(settings.recipes.is_empty());
        }
    }

    mod project_files {
        use super::*;

        #[test]
        fn test_load_dockfix_toml_only() {
            let dir = tempdir().unwrap();
            fs::write(dir.path().join("dockfix.toml"), "debug = true").unwrap();
            let settings = Settings::load_from_paths(dir.path(), None, None).unwrap();
            assert_eq!(settings, debug(true));
        }

        #[test]
        fn test_load_dot_dockfix_toml_only() {
            let dir = tempdir().unwrap();
            fs::write(dir.path().join(".dockfix.toml"), "debug = true").unwrap();
            let settings = Settings::load_from_paths(dir.path(), None, None).unwrap();
            assert_eq!(settings, debug(true));
        }

        #[test]
        fn test_recipes_keep_their_order_and_options() {
            let dir = tempdir().unwrap();
            let content = r#"
files = ["build/*.Dockerfile"]

[[recipes]]
name = "change-base-image"
options = { old_image_name = "ubuntu:20.04", new_tag = "22.04" }

[[recipes]]
name = "add-healthcheck"

[recipes.options]
cmd = "curl -f http://localhost/"
retries = 3
"#;
            fs::write(dir.path().join("dockfix.toml"), content).unwrap();
            let settings = Settings::load_from_paths(dir.path(), None, None).unwrap();

            assert_eq!(settings.files, vec!["build/*.Dockerfile"]);
            let names: Vec<&str> = settings.recipes.iter().map(|r| r.name.as_str()).collect();
            assert_eq!(names, vec!["change-base-image", "add-healthcheck"]);
            assert_eq!(
                settings.recipes[0].options.get("new_tag"),
                Some(&serde_json::Value::from("22.04"))
            );
            assert_eq!(
                settings.recipes[1].options.get("retries"),
                Some(&serde_json::Value::from(3))
            );
        }

        #[test]
        fn test_recipe_without_options() {
            let dir = tempdir().unwrap();
            let content = "[[recipes]]\nname = \"replace-add-with-copy\"\n";
            fs::write(dir.path().join(".dockfix.toml"), content).unwrap();
            let settings = Settings::load_from_paths(dir.path(), None, None).unwrap();
            assert_eq!(
                settings.recipes,
                vec![RecipeEntry {
                    name: "replace-add-with-copy".to_string(),
                    options: serde_json::Map::new(),
                }]
            );
        }
    }

    mod priority {
        use super::*;

        #[test]
        fn test_project_priority_dockfix_overrides_dot_dockfix() {
            let dir = tempdir().unwrap();
            fs::write(dir.path().join(".dockfix.toml"), "debug = false").unwrap();
            fs::write(dir.path().join("dockfix.toml"), "debug = true").unwrap();
            let settings = Settings::load_from_paths(dir.path(), None, None).unwrap();
            assert_eq!(settings, debug(true));
        }

        #[test]
        fn test_user_priority_project_overrides_user() {
            let user_dir = tempdir().unwrap();
            let project_dir = tempdir().unwrap();
            let user_conf_path = user_dir.path().join("dockfix.toml");
            fs::write(&user_conf_path, "debug = true").unwrap();
            fs::write(project_dir.path().join(".dockfix.toml"), "debug = false").unwrap();

            let settings =
                Settings::load_from_paths(project_dir.path(), Some(&user_conf_path), None).unwrap();
            assert_eq!(settings, debug(false));
        }

        #[test]
        fn test_explicit_file_wins() {
            let project_dir = tempdir().unwrap();
            let other_dir = tempdir().unwrap();
            fs::write(project_dir.path().join("dockfix.toml"), "debug = false").unwrap();
            let explicit = other_dir.path().join("ci.toml");
            fs::write(&explicit, "debug = true").unwrap();

            let settings =
                Settings::load_from_paths(project_dir.path(), None, Some(&explicit)).unwrap();
            assert_eq!(settings, debug(true));
        }
    }

    mod user_config {
        use super::*;

        #[test]
        fn test_load_user_config_only() {
            let user_dir = tempdir().unwrap();
            let project_dir = tempdir().unwrap();
            let user_conf_path = user_dir.path().join("dockfix.toml");
            fs::write(&user_conf_path, "debug = true").unwrap();

            let settings =
                Settings::load_from_paths(project_dir.path(), Some(&user_conf_path), None).unwrap();
            assert_eq!(settings, debug(true));
        }

        #[test]
        fn test_no_user_config_file_present() {
            let user_dir = tempdir().unwrap();
            let project_dir = tempdir().unwrap();
            let user_conf_path = user_dir.path().join("dockfix.toml");
            fs::write(project_dir.path().join("dockfix.toml"), "debug = true").unwrap();

            let settings =
                Settings::load_from_paths(project_dir.path(), Some(&user_conf_path), None).unwrap();
            assert_eq!(settings, debug(true));
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn test_invalid_toml_content() {
            let dir = tempdir().unwrap();
            fs::write(dir.path().join("dockfix.toml"), "debug = not_a_boolean").unwrap();
            let result = Settings::load_from_paths(dir.path(), None, None);
            assert!(matches!(result.unwrap_err(), ConfigError::Config(_)));
        }

        #[test]
        fn test_unknown_recipe_field() {
            let dir = tempdir().unwrap();
            let content = "[[recipes]]\nname = \"x\"\noptoins = {}\n";
            fs::write(dir.path().join("dockfix.toml"), content).unwrap();
            let result = Settings::load_from_paths(dir.path(), None, None);
            assert!(matches!(result.unwrap_err(), ConfigError::Config(_)));
        }

        #[test]
        fn test_missing_explicit_file() {
            let dir = tempdir().unwrap();
            let missing = dir.path().join("nope.toml");
            let result = Settings::load_from_paths(dir.path(), None, Some(&missing));
            assert!(matches!(
                result.unwrap_err(),
                ConfigError::MissingFile(path) if path == missing
            ));
        }
    }
}
