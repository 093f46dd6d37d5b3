use camino::Utf8Path;
use camino::Utf8PathBuf;
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;

use crate::FileMatcher;

/// Options controlling how `walk_files` traverses directories.
///
/// Mirrors ripgrep's file-filtering flags and maps onto the `ignore`
/// crate's `WalkBuilder`.
#[derive(Clone, Debug, Default)]
pub struct WalkOptions {
    /// Include hidden files and directories (those starting with `.`).
    pub hidden: bool,
    /// Gitignore-style globs applied on top of the matcher. Prefix with `!`
    /// to exclude; later globs win.
    pub globs: Vec<String>,
    /// Disable all ignore files (`.gitignore`, `.ignore`, etc.).
    pub no_ignore: bool,
    pub follow_links: bool,
    /// Maximum directory recursion depth. `None` means unlimited.
    pub max_depth: Option<usize>,
}

/// Walk the given paths and collect build files.
///
/// A path naming a file is taken as is, whatever its name: the user asked
/// for it. Directories are walked recursively and only files accepted by
/// `matcher` (against their path relative to the directory) are kept.
///
/// Returns a sorted, deduplicated list of absolute paths.
#[must_use]
pub fn walk_files(
    paths: &[Utf8PathBuf],
    matcher: &FileMatcher,
    options: &WalkOptions,
) -> Vec<Utf8PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            let resolved = dunce_utf8(path).unwrap_or_else(|_| path.clone());
            files.push(resolved);
            continue;
        }

        if !path.is_dir() {
            tracing::warn!(%path, "no such file or directory");
            continue;
        }

        let mut builder = WalkBuilder::new(path.as_std_path());
        // standard_filters first: it resets hidden, gitignore, etc.
        builder
            .standard_filters(!options.no_ignore)
            .hidden(!options.hidden)
            .follow_links(options.follow_links);

        if let Some(depth) = options.max_depth {
            builder.max_depth(Some(depth));
        }

        if !options.globs.is_empty() {
            let mut overrides = OverrideBuilder::new(path.as_std_path());
            for glob in &options.globs {
                if let Err(err) = overrides.add(glob) {
                    tracing::warn!(%glob, %err, "skipping invalid glob");
                }
            }
            match overrides.build() {
                Ok(built) => {
                    builder.overrides(built);
                }
                Err(err) => tracing::warn!(%err, "ignoring globs"),
            }
        }

        for entry in builder.build().filter_map(Result::ok) {
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let Some(utf8) = Utf8Path::from_path(entry.path()) else {
                tracing::debug!(path = %entry.path().display(), "skipping non-UTF-8 path");
                continue;
            };
            let relative = utf8.strip_prefix(path).unwrap_or(utf8);
            if matcher.matches(relative) {
                let resolved = dunce_utf8(utf8).unwrap_or_else(|_| utf8.to_owned());
                files.push(resolved);
            }
        }
    }

    files.sort();
    files.dedup();
    files
}

fn dunce_utf8(path: &Utf8Path) -> std::io::Result<Utf8PathBuf> {
    let canonical = dunce::canonicalize(path.as_std_path())?;
    Utf8PathBuf::from_path_buf(canonical)
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidData, "non-UTF-8 path"))
}
