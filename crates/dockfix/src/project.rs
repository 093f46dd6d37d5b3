use anyhow::Context;
use anyhow::Result;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use dockfix_conf::Settings;
use dockfix_recipes::recipe_from_options;
use dockfix_rewrite::Recipe;
use dockfix_workspace::walk_files;
use dockfix_workspace::FileMatcher;

use crate::args::WalkArgs;

/// The directory dockfix runs in and the settings that apply there.
pub struct Project {
    pub root: Utf8PathBuf,
    pub settings: Settings,
}

impl Project {
    pub fn load(config: Option<&Utf8Path>) -> Result<Self> {
        let root = resolve_project_root()?;
        let settings = Settings::new(root.as_std_path(), config.map(Utf8Path::as_std_path))
            .context("Failed to load settings")?;
        Ok(Self { root, settings })
    }

    /// Build files under `paths`, or under the project root when none are
    /// given.
    pub fn files(&self, paths: &[Utf8PathBuf], walk: &WalkArgs) -> Result<Vec<Utf8PathBuf>> {
        let matcher = FileMatcher::new(self.settings.files.as_slice())
            .context("Invalid `files` setting")?;
        let resolved: Vec<Utf8PathBuf> = if paths.is_empty() {
            vec![self.root.clone()]
        } else {
            paths
                .iter()
                .map(|p| {
                    if p.is_relative() {
                        self.root.join(p)
                    } else {
                        p.clone()
                    }
                })
                .collect()
        };
        Ok(walk_files(&resolved, &matcher, &walk.options()))
    }

    /// The `[[recipes]]` from the settings, in order.
    pub fn configured_recipes(&self) -> Result<Vec<Box<dyn Recipe>>> {
        self.settings
            .recipes
            .iter()
            .map(|entry| {
                let options = serde_json::Value::Object(entry.options.clone());
                recipe_from_options(&entry.name, options)
                    .with_context(|| format!("Invalid recipe in settings: {}", entry.name))
            })
            .collect()
    }

    /// Path for messages: relative to the root when it is inside it.
    pub fn display<'a>(&self, path: &'a Utf8Path) -> &'a Utf8Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

fn resolve_project_root() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    // Discovered files are canonical; the root has to be too for
    // `display` to strip it.
    let cwd = dunce::canonicalize(&cwd).unwrap_or(cwd);
    Utf8PathBuf::from_path_buf(cwd)
        .map_err(|_| anyhow::anyhow!("Current directory is not valid UTF-8"))
}
