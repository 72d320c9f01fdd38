//! Level labels.
//!
//! A level identifies a floor of a building ("0", "1", "-1", "UG"). Labels are
//! case-sensitive text, may be empty (unset, ground default) and never exceed
//! [`MAX_LEVEL_BYTES`] encoded bytes. An edge connecting two floors carries
//! both labels joined by [`LEVEL_SEPARATOR`], e.g. `"0;1"`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Separator joining the two sides of a transition label
pub const LEVEL_SEPARATOR: char = ';';

/// Largest label the dictionary can store (one length byte)
pub const MAX_LEVEL_BYTES: usize = 255;

/// Truncates `label` to at most [`MAX_LEVEL_BYTES`] bytes on a char boundary.
///
/// Returns the label unchanged (borrowed) when it already fits.
pub fn truncate_label(label: &str) -> &str {
    if label.len() <= MAX_LEVEL_BYTES {
        return label;
    }
    let mut end = MAX_LEVEL_BYTES;
    while !label.is_char_boundary(end) {
        end -= 1;
    }
    &label[..end]
}

/// An immutable level label.
///
/// Cheap to clone: the text is shared. Construction truncates overlong labels
/// and logs the truncation.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Level(Arc<str>);

impl Level {
    /// Creates a level label, truncating it to [`MAX_LEVEL_BYTES`] if needed
    pub fn new(label: impl AsRef<str>) -> Self {
        let label = label.as_ref();
        let kept = truncate_label(label);
        if kept.len() != label.len() {
            tracing::warn!(
                original_bytes = label.len(),
                truncated_bytes = kept.len(),
                "Level label too long, truncated"
            );
        }
        Self(Arc::from(kept))
    }

    /// The empty ("unset") level
    pub fn unset() -> Self {
        Self::default()
    }

    /// Label text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the empty label
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if this label joins two levels
    pub fn is_transition(&self) -> bool {
        self.0.contains(LEVEL_SEPARATOR)
    }

    /// Parses the label into an [`EdgeLevel`] view
    pub fn as_edge_level(&self) -> EdgeLevel<'_> {
        EdgeLevel::parse(&self.0)
    }
}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Level({:?})", &*self.0)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Level {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<String> for Level {
    fn from(label: String) -> Self {
        Self::new(label)
    }
}

impl AsRef<str> for Level {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Level {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Level {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for Level {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Self::new(label))
    }
}

/// Borrowed view of an edge's level value.
///
/// `Single("")` is the unset level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeLevel<'a> {
    /// Both ends on the same floor
    Single(&'a str),
    /// Edge connecting two floors (stairs, elevator link)
    Transition(&'a str, &'a str),
}

impl<'a> EdgeLevel<'a> {
    /// Splits a stored label at the first separator
    pub fn parse(label: &'a str) -> Self {
        match label.split_once(LEVEL_SEPARATOR) {
            Some((from, to)) => Self::Transition(from, to),
            None => Self::Single(label),
        }
    }

    /// Derives an edge level from its two endpoint labels.
    ///
    /// An unset endpoint does not create a transition: the edge takes the
    /// label of the endpoint that has one.
    pub fn from_endpoints(base: &'a str, adj: &'a str) -> Self {
        if base == adj || adj.is_empty() {
            Self::Single(base)
        } else if base.is_empty() {
            Self::Single(adj)
        } else {
            Self::Transition(base, adj)
        }
    }

    /// True if `level` is this edge's level or one side of its transition
    #[inline]
    pub fn touches(&self, level: &str) -> bool {
        match *self {
            Self::Single(l) => l == level,
            Self::Transition(from, to) => from == level || to == level,
        }
    }

    /// True for a level-transition edge
    pub fn is_transition(&self) -> bool {
        matches!(self, Self::Transition(..))
    }

    /// Owned label (sides joined by the separator)
    pub fn to_level(&self) -> Level {
        Level::new(self.to_string())
    }
}

impl fmt::Display for EdgeLevel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(l) => f.write_str(l),
            Self::Transition(from, to) => write!(f, "{from}{LEVEL_SEPARATOR}{to}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundary() {
        // 'é' is two bytes; 200 of them = 400 bytes
        let long = "é".repeat(200);
        let kept = truncate_label(&long);
        assert!(kept.len() <= MAX_LEVEL_BYTES);
        assert_eq!(kept.len(), 254);
        assert!(long.starts_with(kept));
    }

    #[test]
    fn test_short_label_untouched() {
        assert_eq!(truncate_label("-1"), "-1");
        assert_eq!(Level::new("UG").as_str(), "UG");
    }

    #[test]
    fn test_parse_transition() {
        assert_eq!(EdgeLevel::parse("0;1"), EdgeLevel::Transition("0", "1"));
        assert_eq!(EdgeLevel::parse("2"), EdgeLevel::Single("2"));
        assert_eq!(EdgeLevel::parse(""), EdgeLevel::Single(""));
    }

    #[test]
    fn test_touches() {
        let stairs = EdgeLevel::parse("0;1");
        assert!(stairs.touches("0"));
        assert!(stairs.touches("1"));
        assert!(!stairs.touches("2"));

        assert!(!EdgeLevel::parse("0;1").touches("0;1"));

        assert!(EdgeLevel::Single("2").touches("2"));
        assert!(!EdgeLevel::Single("2").touches("20"));
    }

    #[test]
    fn test_from_endpoints() {
        assert_eq!(EdgeLevel::from_endpoints("1", "1"), EdgeLevel::Single("1"));
        assert_eq!(EdgeLevel::from_endpoints("0", "1"), EdgeLevel::Transition("0", "1"));
        assert_eq!(EdgeLevel::from_endpoints("", "1"), EdgeLevel::Single("1"));
        assert_eq!(EdgeLevel::from_endpoints("1", ""), EdgeLevel::Single("1"));
        assert_eq!(EdgeLevel::from_endpoints("0", "1").to_string(), "0;1");
    }

    #[test]
    fn test_level_is_case_sensitive() {
        assert_ne!(Level::new("eg"), Level::new("EG"));
        assert!(Level::new("0;1").is_transition());
        assert!(Level::unset().is_empty());
    }
}
