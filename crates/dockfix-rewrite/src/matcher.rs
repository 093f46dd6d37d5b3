use std::sync::Arc;

use dockfix_syntax::From;

use crate::Glob;
use crate::Iso;
use crate::IsoVisitor;
use crate::VisitContext;

/// Split `name[:tag][@digest]` text into its parts.
///
/// The digest starts at the first `@`; the tag at the last `:` that is not
/// followed by a `/`, so a registry port stays part of the name.
#[must_use]
pub fn split_reference(text: &str) -> (&str, Option<&str>, Option<&str>) {
    let (rest, digest) = match text.split_once('@') {
        Some((name, digest)) if !name.is_empty() => (name, Some(digest)),
        _ => (text, None),
    };
    match rest.rfind(':') {
        Some(colon) if colon > 0 && !rest[colon + 1..].contains('/') => {
            (&rest[..colon], Some(&rest[colon + 1..]), digest)
        }
        _ => (rest, None, digest),
    }
}

/// One part of an image reference with variables rendered as `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencePart {
    pub text: String,
    pub from_variable: bool,
}

impl ReferencePart {
    fn new(text: &str, from_variable: bool) -> Self {
        Self {
            text: text.to_string(),
            from_variable,
        }
    }
}

/// The name, tag, and digest of a FROM as they are matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub name: ReferencePart,
    pub tag: Option<ReferencePart>,
    pub digest: Option<ReferencePart>,
}

impl ImageReference {
    /// Read the reference of a FROM, splitting any tag or digest the parser
    /// left inside the image argument (a lone quoted string, or a tag in
    /// front of a digest).
    ///
    /// `None` when some part cannot be rendered for matching.
    #[must_use]
    pub fn of(from: &From) -> Option<Self> {
        let image = from.image.wildcard()?;
        let image_variable = from.image.has_variable();
        let (name, tag, digest) = split_reference(&image);

        let mut reference = Self {
            name: ReferencePart::new(name, image_variable),
            tag: tag.map(|tag| ReferencePart::new(tag, image_variable)),
            digest: digest.map(|digest| ReferencePart::new(digest, image_variable)),
        };
        if let Some(tag) = &from.tag {
            reference.tag = Some(ReferencePart::new(&tag.wildcard()?, tag.has_variable()));
        }
        if let Some(digest) = &from.digest {
            reference.digest = Some(ReferencePart::new(
                &digest.wildcard()?,
                digest.has_variable(),
            ));
        }
        Some(reference)
    }

    #[must_use]
    pub fn is_scratch(&self) -> bool {
        !self.name.from_variable && self.name.text.eq_ignore_ascii_case("scratch")
    }
}

/// Fluent predicate over FROM instructions.
///
/// Every constraint left unset matches anything. A glob set for a part the
/// reference does not have is matched against the empty string, so `*`
/// still matches an untagged image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FromMatcher {
    image_name: Option<Glob>,
    tag: Option<Glob>,
    digest: Option<Glob>,
    platform: Option<String>,
    exclude_scratch: bool,
}

impl FromMatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn image_name(mut self, glob: Glob) -> Self {
        self.image_name = Some(glob);
        self
    }

    #[must_use]
    pub fn tag(mut self, glob: Glob) -> Self {
        self.tag = Some(glob);
        self
    }

    #[must_use]
    pub fn digest(mut self, glob: Glob) -> Self {
        self.digest = Some(glob);
        self
    }

    /// Require `--platform` to equal this value exactly.
    #[must_use]
    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    #[must_use]
    pub fn exclude_scratch(mut self) -> Self {
        self.exclude_scratch = true;
        self
    }

    #[must_use]
    pub fn matches(&self, from: &From) -> bool {
        let Some(reference) = ImageReference::of(from) else {
            tracing::trace!(image = %from.image.text(), "image reference cannot be matched");
            return false;
        };
        if self.exclude_scratch && reference.is_scratch() {
            return false;
        }
        if let Some(glob) = &self.image_name {
            if !glob.matches_wildcarded(&reference.name.text, reference.name.from_variable) {
                return false;
            }
        }
        if !part_matches(self.tag.as_ref(), reference.tag.as_ref())
            || !part_matches(self.digest.as_ref(), reference.digest.as_ref())
        {
            return false;
        }
        match &self.platform {
            Some(platform) => from
                .flag("platform")
                .and_then(|flag| flag.literal())
                .is_some_and(|value| &value == platform),
            None => true,
        }
    }

    /// A visitor that hands every matching FROM to `rewrite`.
    pub fn as_visitor<F>(self, rewrite: F) -> Iso<FromRewrite<F>>
    where
        F: FnMut(&Arc<From>, &VisitContext) -> Arc<From>,
    {
        Iso(FromRewrite {
            matcher: self,
            rewrite,
        })
    }
}

fn part_matches(glob: Option<&Glob>, part: Option<&ReferencePart>) -> bool {
    match (glob, part) {
        (None, _) => true,
        (Some(glob), Some(part)) => glob.matches_wildcarded(&part.text, part.from_variable),
        (Some(glob), None) => glob.is_match(""),
    }
}

/// `FROM build` after `FROM ... AS build` starts from that stage, not from
/// an image.
fn names_earlier_stage(from: &From, cx: &VisitContext) -> bool {
    if from.tag.is_some() || from.digest.is_some() {
        return false;
    }
    from.image
        .literal()
        .is_some_and(|name| cx.names_earlier_stage(&name))
}

pub struct FromRewrite<F> {
    matcher: FromMatcher,
    rewrite: F,
}

impl<F> IsoVisitor for FromRewrite<F>
where
    F: FnMut(&Arc<From>, &VisitContext) -> Arc<From>,
{
    fn visit_from(&mut self, from: &Arc<From>, cx: &mut VisitContext) -> Arc<From> {
        if names_earlier_stage(from, cx) {
            tracing::trace!(image = %from.image.text(), "FROM refers to an earlier stage");
            return Arc::clone(from);
        }
        if self.matcher.matches(from) {
            (self.rewrite)(from, cx)
        } else {
            Arc::clone(from)
        }
    }
}
