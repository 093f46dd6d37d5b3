//! Point FROM instructions at a different image, tag, digest, or platform.

use std::sync::Arc;

use dockfix_rewrite::options;
use dockfix_rewrite::split_reference;
use dockfix_rewrite::FromMatcher;
use dockfix_rewrite::Glob;
use dockfix_rewrite::OptionKind;
use dockfix_rewrite::OptionSpec;
use dockfix_rewrite::OptionsError;
use dockfix_rewrite::Recipe;
use dockfix_rewrite::RecipeDescriptor;
use dockfix_rewrite::Visitor;
use dockfix_syntax::Argument;
use dockfix_syntax::ArgumentContent;
use dockfix_syntax::Flag;
use dockfix_syntax::From;
use dockfix_syntax::Quote;
use dockfix_syntax::Space;
use serde::Deserialize;

pub static DESCRIPTOR: RecipeDescriptor = RecipeDescriptor {
    name: "change-base-image",
    display_name: "Change base image",
    description: "Change the image, tag, digest, or platform of matching FROM instructions. \
                  An empty new tag, digest, or platform removes it.",
    options: &[
        OptionSpec::new(
            "old_image_name",
            OptionKind::String,
            "Glob over the image to replace, optionally with `:tag` or `@digest`.",
        )
        .example("ubuntu:20.*")
        .required(),
        OptionSpec::new(
            "new_image_name",
            OptionKind::String,
            "Replacement image name, optionally with a tag or digest.",
        )
        .example("ubuntu:22.04"),
        OptionSpec::new("new_tag", OptionKind::String, "Tag to set; empty to remove.")
            .example("22.04"),
        OptionSpec::new("new_digest", OptionKind::String, "Digest to set; empty to remove.")
            .example("sha256:4f5a..."),
        OptionSpec::new(
            "old_platform",
            OptionKind::String,
            "Only change FROMs whose --platform is exactly this.",
        )
        .example("linux/amd64"),
        OptionSpec::new("new_platform", OptionKind::String, "Platform to set; empty to remove.")
            .example("linux/arm64"),
    ],
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangeBaseImage {
    pub old_image_name: Option<String>,
    pub new_image_name: Option<String>,
    pub new_tag: Option<String>,
    pub new_digest: Option<String>,
    pub old_platform: Option<String>,
    pub new_platform: Option<String>,
}

impl ChangeBaseImage {
    fn matcher(&self) -> Option<FromMatcher> {
        let pattern = self.old_image_name.as_deref()?;
        let (name, tag, digest) = split_reference(pattern);

        let mut matcher = FromMatcher::new().image_name(Glob::new(name).ok()?);
        if let Some(tag) = tag {
            matcher = matcher.tag(Glob::new(tag).ok()?);
        }
        if let Some(digest) = digest {
            matcher = matcher.digest(Glob::new(digest).ok()?);
        }
        if let Some(platform) = &self.old_platform {
            matcher = matcher.platform(platform);
        }
        if !name.eq_ignore_ascii_case("scratch") {
            matcher = matcher.exclude_scratch();
        }
        Some(matcher)
    }

    fn edits(&self) -> ReferenceEdits {
        let new_name = self
            .new_image_name
            .as_deref()
            .filter(|name| !name.trim().is_empty());
        let (name, tag, digest) = match new_name {
            Some(reference) => {
                let (name, tag, digest) = split_reference(reference);
                (Some(name.to_string()), tag, digest)
            }
            None => (None, None, None),
        };

        let mut edits = ReferenceEdits {
            name,
            tag: Edit::from_option(self.new_tag.as_deref().or(tag)),
            digest: Edit::from_option(self.new_digest.as_deref().or(digest)),
            platform: Edit::from_option(self.new_platform.as_deref()),
        };
        // An explicit option overrides whatever the new name carried.
        if self.new_tag.is_some() && self.new_digest.is_none() && digest.is_some() {
            edits.digest = Edit::Keep;
        }
        if self.new_digest.is_some() && self.new_tag.is_none() && tag.is_some() {
            edits.tag = Edit::Keep;
        }
        edits
    }
}

impl Recipe for ChangeBaseImage {
    fn descriptor(&self) -> &'static RecipeDescriptor {
        &DESCRIPTOR
    }

    fn validate(&self) -> Result<(), OptionsError> {
        let name = DESCRIPTOR.name;
        options::require(name, "old_image_name", self.old_image_name.as_deref())?;
        if let Some(pattern) = self.old_image_name.as_deref() {
            let (image, tag, digest) = split_reference(pattern);
            options::valid_glob(name, "old_image_name", Some(image))?;
            options::valid_glob(name, "old_image_name", tag)?;
            options::valid_glob(name, "old_image_name", digest)?;
        }
        options::require_any(
            name,
            &[
                ("new_image_name", self.new_image_name.is_some()),
                ("new_tag", self.new_tag.is_some()),
                ("new_digest", self.new_digest.is_some()),
                ("new_platform", self.new_platform.is_some()),
            ],
        )?;
        options::mutually_exclusive(
            name,
            ("new_tag", self.new_tag.as_deref().is_some_and(|tag| !tag.is_empty())),
            (
                "new_digest",
                self.new_digest.as_deref().is_some_and(|digest| !digest.is_empty()),
            ),
        )
    }

    fn visitor(&self) -> Option<Box<dyn Visitor>> {
        let matcher = self.matcher()?;
        let edits = self.edits();
        Some(Box::new(
            matcher.as_visitor(move |from, _cx| edits.apply(from)),
        ))
    }
}

/// What to do with one optional part of a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Edit {
    Keep,
    Remove,
    Set(String),
}

impl Edit {
    /// Absent keeps, empty removes, anything else sets.
    fn from_option(value: Option<&str>) -> Self {
        match value {
            None => Edit::Keep,
            Some("") => Edit::Remove,
            Some(value) => Edit::Set(value.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
struct ReferenceEdits {
    name: Option<String>,
    tag: Edit,
    digest: Edit,
    platform: Edit,
}

/// Name, tag, and digest as argument fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Parts {
    name: Vec<ArgumentContent>,
    tag: Option<Vec<ArgumentContent>>,
    digest: Option<Vec<ArgumentContent>>,
}

impl ReferenceEdits {
    fn apply(&self, from: &Arc<From>) -> Arc<From> {
        let edited = match from.image.sole_quote() {
            Some(quote) => self.apply_quoted(from, quote),
            None => self.apply_fragments(from),
        };
        let edited = From {
            flags: self.platform_flags(&from.flags),
            ..edited
        };

        if edited == **from {
            Arc::clone(from)
        } else {
            tracing::trace!(
                from = %from.reference(),
                to = %edited.reference(),
                "changing base image"
            );
            Arc::new(edited)
        }
    }

    fn edit(&self, parts: &mut Parts) {
        if let Some(name) = &self.name {
            parts.name = vec![ArgumentContent::plain(name)];
        }
        let set_tag = match &self.tag {
            Edit::Keep => false,
            Edit::Remove => {
                parts.tag = None;
                false
            }
            Edit::Set(tag) => {
                parts.tag = Some(vec![ArgumentContent::plain(tag)]);
                true
            }
        };
        match &self.digest {
            Edit::Keep => {
                if set_tag {
                    parts.digest = None;
                }
            }
            Edit::Remove => parts.digest = None,
            Edit::Set(digest) => {
                parts.digest = Some(vec![ArgumentContent::plain(digest)]);
                if !set_tag {
                    parts.tag = None;
                }
            }
        }
    }

    /// `FROM 'name:tag'` stays one quoted string.
    fn apply_quoted(&self, from: &From, quote: Quote) -> From {
        let text = from.image.unquoted();
        let (name, tag, digest) = split_reference(&text);
        let mut parts = Parts {
            name: vec![ArgumentContent::plain(name)],
            tag: tag.map(|tag| vec![ArgumentContent::plain(tag)]),
            digest: digest.map(|digest| vec![ArgumentContent::plain(digest)]),
        };
        self.edit(&mut parts);

        let mut reference = fragments_text(&parts.name);
        if let Some(tag) = &parts.tag {
            reference.push(':');
            reference.push_str(&fragments_text(tag));
        }
        if let Some(digest) = &parts.digest {
            reference.push('@');
            reference.push_str(&fragments_text(digest));
        }
        From {
            image: Arc::new(
                from.image
                    .with_contents(vec![ArgumentContent::quoted(reference, quote)]),
            ),
            ..from.clone()
        }
    }

    fn apply_fragments(&self, from: &From) -> From {
        let (name, embedded_tag) = match &from.tag {
            Some(_) => (from.image.contents.clone(), None),
            None => split_tag(&from.image.contents),
        };
        let mut parts = Parts {
            name,
            tag: from
                .tag
                .as_ref()
                .map(|tag| tag.contents.clone())
                .or(embedded_tag),
            digest: from.digest.as_ref().map(|digest| digest.contents.clone()),
        };
        self.edit(&mut parts);

        let (image, tag) = match (&parts.tag, &parts.digest) {
            (Some(tag), Some(_)) => {
                let mut image = parts.name.clone();
                image.push(ArgumentContent::plain(":"));
                image.extend(tag.iter().cloned());
                (image, None)
            }
            _ => (parts.name.clone(), parts.tag.clone()),
        };

        From {
            image: Arc::new(from.image.with_contents(merge_plain(image))),
            tag: tag.map(|contents| rebuild(from.tag.as_ref(), contents)),
            digest: parts
                .digest
                .map(|contents| rebuild(from.digest.as_ref(), contents)),
            ..from.clone()
        }
    }

    fn platform_flags(&self, flags: &[Arc<Flag>]) -> Vec<Arc<Flag>> {
        match &self.platform {
            Edit::Keep => flags.to_vec(),
            Edit::Remove => flags
                .iter()
                .filter(|flag| flag.name != "platform")
                .cloned()
                .collect(),
            Edit::Set(platform) => {
                let value = Argument::plain(Space::EMPTY, platform.as_str());
                let mut flags = flags.to_vec();
                match flags.iter().position(|flag| flag.name == "platform") {
                    Some(idx) => {
                        let existing = &flags[idx];
                        let value = match &existing.value {
                            Some(old) if old.unquoted() == *platform => Arc::clone(old),
                            Some(old) => Arc::new(old.with_contents(value.contents)),
                            None => Arc::new(value),
                        };
                        flags[idx] = Arc::new(Flag {
                            value: Some(value),
                            ..(**existing).clone()
                        });
                    }
                    None => flags.insert(
                        0,
                        Arc::new(Flag::new(Space::single(), "platform", Some(value))),
                    ),
                }
                flags
            }
        }
    }
}

/// Keep the original argument's prefix and identity when there was one.
fn rebuild(original: Option<&Arc<Argument>>, contents: Vec<ArgumentContent>) -> Arc<Argument> {
    let contents = merge_plain(contents);
    match original {
        Some(original) if original.contents == contents => Arc::clone(original),
        Some(original) => Arc::new(original.with_contents(contents)),
        None => Arc::new(Argument::new(Space::EMPTY, contents)),
    }
}

/// Split a tag left inside the image (`node:20` in front of a digest).
fn split_tag(
    contents: &[ArgumentContent],
) -> (Vec<ArgumentContent>, Option<Vec<ArgumentContent>>) {
    let mut seen_slash = false;
    for (idx, content) in contents.iter().enumerate().rev() {
        match content {
            ArgumentContent::Plain(text) => {
                if let Some(colon) = text.rfind(':') {
                    if seen_slash || text[colon + 1..].contains('/') || (idx == 0 && colon == 0) {
                        break;
                    }
                    let mut name = contents[..idx].to_vec();
                    name.push(ArgumentContent::plain(&text[..colon]));
                    let mut tag = vec![ArgumentContent::plain(&text[colon + 1..])];
                    tag.extend_from_slice(&contents[idx + 1..]);
                    return (merge_plain(name), Some(merge_plain(tag)));
                }
                seen_slash |= text.contains('/');
            }
            ArgumentContent::Quoted { text, .. } => seen_slash |= text.contains('/'),
            ArgumentContent::Variable { .. } => {}
        }
    }
    (contents.to_vec(), None)
}

/// Join neighbouring plain fragments and drop empty ones, the shape the
/// parser produces.
fn merge_plain(contents: Vec<ArgumentContent>) -> Vec<ArgumentContent> {
    let mut merged: Vec<ArgumentContent> = Vec::with_capacity(contents.len());
    for content in contents {
        match (merged.last_mut(), content) {
            (_, ArgumentContent::Plain(text)) if text.is_empty() => {}
            (Some(ArgumentContent::Plain(last)), ArgumentContent::Plain(text)) => {
                last.push_str(&text);
            }
            (_, content) => merged.push(content),
        }
    }
    merged
}

fn fragments_text(contents: &[ArgumentContent]) -> String {
    contents
        .iter()
        .map(|content| match content {
            ArgumentContent::Plain(text) | ArgumentContent::Quoted { text, .. } => text.clone(),
            variable @ ArgumentContent::Variable { .. } => variable.source(),
        })
        .collect()
}
