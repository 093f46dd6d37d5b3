use std::fmt;

use globset::GlobBuilder;
use globset::GlobMatcher;

/// A wildcard pattern over image names, tags, and digests.
///
/// `*` matches any run of characters, `/` included, so `*/app` matches
/// `registry.example.com/team/app`.
#[derive(Clone)]
pub struct Glob {
    pattern: String,
    matcher: GlobMatcher,
}

impl Glob {
    pub fn new(pattern: &str) -> Result<Self, globset::Error> {
        let matcher = GlobBuilder::new(pattern)
            .literal_separator(false)
            .build()?
            .compile_matcher();
        Ok(Self {
            pattern: pattern.to_string(),
            matcher,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    #[must_use]
    pub fn is_match(&self, candidate: &str) -> bool {
        self.matcher.is_match(candidate)
    }

    /// Match a candidate whose variables were rendered as `*`.
    ///
    /// Neither side is known to be more specific, so a candidate built from
    /// variables also matches when it, read as a pattern, matches this
    /// pattern's text.
    #[must_use]
    pub fn matches_wildcarded(&self, candidate: &str, from_variable: bool) -> bool {
        if self.is_match(candidate) {
            return true;
        }
        from_variable
            && Glob::new(candidate).is_ok_and(|reverse| reverse.is_match(&self.pattern))
    }
}

impl fmt::Debug for Glob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Glob").field(&self.pattern).finish()
    }
}

impl PartialEq for Glob {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Eq for Glob {}
