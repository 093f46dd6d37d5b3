use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use dockfix_source::Span;
use serde::Serialize;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a tree node.
///
/// Minted once when a node is created and carried unchanged through every
/// copy-and-replace of that node, so a later pass can find "the same" node
/// in a rewritten tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(u64);

impl NodeId {
    #[must_use]
    pub fn fresh() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Marker {
    /// Byte range the node occupied in the text it was parsed from.
    Range(Span),
    Custom { key: String, value: String },
}

/// Open, order-independent annotations attached to a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Markers(Vec<Marker>);

impl Markers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a marker, replacing any marker of the same kind (or same custom key).
    #[must_use]
    pub fn with(mut self, marker: Marker) -> Self {
        self.0.retain(|existing| !same_slot(existing, &marker));
        self.0.push(marker);
        self
    }

    #[must_use]
    pub fn range(&self) -> Option<Span> {
        self.0.iter().find_map(|marker| match marker {
            Marker::Range(span) => Some(*span),
            Marker::Custom { .. } => None,
        })
    }

    #[must_use]
    pub fn custom(&self, key: &str) -> Option<&str> {
        self.0.iter().find_map(|marker| match marker {
            Marker::Custom { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.0.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn same_slot(a: &Marker, b: &Marker) -> bool {
    match (a, b) {
        (Marker::Range(_), Marker::Range(_)) => true,
        (Marker::Custom { key: a, .. }, Marker::Custom { key: b, .. }) => a == b,
        _ => false,
    }
}

/// Identity and markers of a node.
///
/// Compares equal to every other `Meta`: two trees with the same shape and
/// text are structurally equal regardless of where they came from.
#[derive(Debug, Clone)]
pub struct Meta {
    id: NodeId,
    markers: Markers,
}

impl Meta {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: NodeId::fresh(),
            markers: Markers::new(),
        }
    }

    #[must_use]
    pub fn with_range(span: Span) -> Self {
        Self {
            id: NodeId::fresh(),
            markers: Markers::new().with(Marker::Range(span)),
        }
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn markers(&self) -> &Markers {
        &self.markers
    }

    #[must_use]
    pub fn with_marker(&self, marker: Marker) -> Self {
        Self {
            id: self.id,
            markers: self.markers.clone().with(marker),
        }
    }
}

impl Default for Meta {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Meta {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for Meta {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = NodeId::fresh();
        let b = NodeId::fresh();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }

    #[test]
    fn markers_replace_same_slot() {
        let markers = Markers::new()
            .with(Marker::Range(Span::new(0, 4)))
            .with(Marker::Custom {
                key: "recipe".into(),
                value: "a".into(),
            })
            .with(Marker::Range(Span::new(2, 4)))
            .with(Marker::Custom {
                key: "recipe".into(),
                value: "b".into(),
            });

        assert_eq!(markers.range(), Some(Span::new(2, 4)));
        assert_eq!(markers.custom("recipe"), Some("b"));
        assert_eq!(markers.iter().count(), 2);
    }

    #[test]
    fn meta_never_affects_equality() {
        let a = Meta::with_range(Span::new(0, 1));
        let b = Meta::new();
        assert_ne!(a.id(), b.id());
        assert_eq!(a, b);
    }

    #[test]
    fn with_marker_keeps_identity() {
        let meta = Meta::new();
        let marked = meta.with_marker(Marker::Custom {
            key: "k".into(),
            value: "v".into(),
        });
        assert_eq!(meta.id(), marked.id());
        assert_eq!(marked.markers().custom("k"), Some("v"));
    }
}
