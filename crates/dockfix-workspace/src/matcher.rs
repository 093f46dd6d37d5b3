use camino::Utf8Path;
use globset::GlobBuilder;
use globset::GlobSet;
use globset::GlobSetBuilder;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid file pattern '{pattern}'")]
pub struct PatternError {
    pub pattern: String,
    #[source]
    pub source: globset::Error,
}

/// Which files are build files.
///
/// A pattern without `/` is matched against the file name, so `Dockerfile.*`
/// finds `svc/Dockerfile.dev`. A pattern with `/` is matched against the
/// path relative to the directory being walked.
#[derive(Debug, Clone)]
pub struct FileMatcher {
    names: GlobSet,
    paths: GlobSet,
}

impl FileMatcher {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, PatternError> {
        let mut names = GlobSetBuilder::new();
        let mut paths = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = GlobBuilder::new(pattern.trim_start_matches('/'))
                .literal_separator(true)
                .build()
                .map_err(|source| PatternError {
                    pattern: pattern.to_string(),
                    source,
                })?;
            if pattern.contains('/') {
                paths.add(glob);
            } else {
                names.add(glob);
            }
        }
        let build = |builder: GlobSetBuilder| {
            builder.build().map_err(|source| PatternError {
                pattern: patterns.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(", "),
                source,
            })
        };
        Ok(Self {
            names: build(names)?,
            paths: build(paths)?,
        })
    }

    #[must_use]
    pub fn matches(&self, relative: &Utf8Path) -> bool {
        relative
            .file_name()
            .is_some_and(|name| self.names.is_match(name))
            || self.paths.is_match(relative.as_std_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> FileMatcher {
        FileMatcher::new(&["Dockerfile", "Dockerfile.*", "*.Dockerfile", "Containerfile"]).unwrap()
    }

    #[test]
    fn names_match_at_any_depth() {
        let matcher = defaults();
        assert!(matcher.matches(Utf8Path::new("Dockerfile")));
        assert!(matcher.matches(Utf8Path::new("services/api/Dockerfile.prod")));
        assert!(matcher.matches(Utf8Path::new("build/base.Dockerfile")));
        assert!(matcher.matches(Utf8Path::new("Containerfile")));
        assert!(!matcher.matches(Utf8Path::new("Dockerfiles/README.md")));
        assert!(!matcher.matches(Utf8Path::new(".dockerignore")));
    }

    #[test]
    fn paths_are_anchored() {
        let matcher = FileMatcher::new(&["docker/*.df"]).unwrap();
        assert!(matcher.matches(Utf8Path::new("docker/app.df")));
        assert!(!matcher.matches(Utf8Path::new("other/docker/app.df")));
        assert!(!matcher.matches(Utf8Path::new("docker/nested/app.df")));
    }

    #[test]
    fn bad_patterns_are_reported() {
        let err = FileMatcher::new(&["Dockerfile", "[oops"]).unwrap_err();
        assert_eq!(err.pattern, "[oops");
        assert_eq!(err.to_string(), "invalid file pattern '[oops'");
    }
}
