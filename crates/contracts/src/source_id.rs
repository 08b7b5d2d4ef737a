//! SourceId - identifier for devices, buffers and tracked tools
//!
//! Ids are fixed at configuration time and then cloned into every log line,
//! metric label and buffer stats snapshot, so the string is shared via `Arc<str>`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// Shared, immutable name of an acquisition source.
///
/// # Examples
/// ```
/// use contracts::SourceId;
///
/// let probe: SourceId = "us_probe".into();
/// let copy = probe.clone();
/// assert_eq!(probe, copy);
/// assert_eq!(copy, "us_probe");
/// ```
#[derive(Clone, Default)]
pub struct SourceId(Arc<str>);

impl SourceId {
    #[inline]
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Transform name in the `FromToTo` style used by tracker channels.
    pub fn transform_name(from: &str, to: &str) -> Self {
        Self(Arc::from(format!("{from}To{to}")))
    }
}

impl Deref for SourceId {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SourceId {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SourceId {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SourceId {
    #[inline]
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for SourceId {
    #[inline]
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceId({:?})", &*self.0)
    }
}

impl PartialEq for SourceId {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for SourceId {}

// Ordered like `str` so `BTreeMap<SourceId, _>` can be queried by `&str`.
impl Ord for SourceId {
    #[inline]
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for SourceId {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq<str> for SourceId {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for SourceId {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

// Must agree with `str`'s hash so `HashMap<SourceId, _>` can be queried by `&str`.
impl Hash for SourceId {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl Serialize for SourceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SourceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_clone_shares_storage() {
        let a: SourceId = "tracker_a".into();
        let b = a.clone();
        assert_eq!(a.as_str().as_ptr(), b.as_str().as_ptr());
    }

    #[test]
    fn test_lookup_by_str() {
        let mut buffers: HashMap<SourceId, usize> = HashMap::new();
        buffers.insert("probe".into(), 1);
        buffers.insert("reference".into(), 2);
        assert_eq!(buffers.get("reference"), Some(&2));
    }

    #[test]
    fn test_transform_name() {
        assert_eq!(SourceId::transform_name("Stylus", "Tracker"), "StylusToTracker");
    }

    #[test]
    fn test_serde_as_plain_string() {
        let id: SourceId = "stylus".into();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"stylus\"");
        let back: SourceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
