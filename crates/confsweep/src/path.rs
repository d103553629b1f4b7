use serde::{Deserialize, Serialize};
use std::fmt;

/// A mapping key in a config tree.
///
/// Keys are matched strictly by type: `Key::Int(42)` never matches `Key::Str("42")`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl Key {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Key::Str(s) => Some(s),
            Key::Int(_) => None,
        }
    }

    pub fn as_index(&self) -> Option<usize> {
        match self {
            Key::Int(i) => usize::try_from(*i).ok(),
            Key::Str(_) => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{i}"),
            Key::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Str(value.to_owned())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Str(value)
    }
}

impl From<&String> for Key {
    fn from(value: &String) -> Self {
        Key::Str(value.clone())
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Int(value.into())
    }
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        Key::Int(value as i64)
    }
}

/// An ordered walk of keys from the root of a config tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyPath(Vec<Key>);

/// Path addressing the leaf an override replaces.
pub type OverridePath = KeyPath;

impl KeyPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn keys(&self) -> &[Key] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&Key> {
        self.0.last()
    }

    pub fn push(&mut self, key: impl Into<Key>) {
        self.0.push(key.into());
    }

    pub fn pop(&mut self) -> Option<Key> {
        self.0.pop()
    }

    /// Returns a copy of this path with `key` appended.
    pub fn child(&self, key: impl Into<Key>) -> Self {
        let mut path = self.clone();
        path.push(key);
        path
    }

    /// The first `len` keys of this path.
    pub fn prefix(&self, len: usize) -> Self {
        Self(self.0[..len.min(self.0.len())].to_vec())
    }

    /// Dot-joined rendering without the `<root>` placeholder.
    pub fn dotted(&self) -> String {
        self.0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", self.dotted())
        }
    }
}

impl From<Vec<Key>> for KeyPath {
    fn from(keys: Vec<Key>) -> Self {
        Self(keys)
    }
}

impl From<Key> for KeyPath {
    fn from(key: Key) -> Self {
        Self(vec![key])
    }
}

impl From<&str> for KeyPath {
    fn from(key: &str) -> Self {
        Self(vec![key.into()])
    }
}

impl<K: Into<Key>, const N: usize> From<[K; N]> for KeyPath {
    fn from(keys: [K; N]) -> Self {
        Self(keys.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<Key> + Clone> From<&[K]> for KeyPath {
    fn from(keys: &[K]) -> Self {
        Self(keys.iter().cloned().map(Into::into).collect())
    }
}

impl FromIterator<Key> for KeyPath {
    fn from_iter<I: IntoIterator<Item = Key>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a KeyPath {
    type Item = &'a Key;
    type IntoIter = std::slice::Iter<'a, Key>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_deserialize_by_json_type() {
        let path: KeyPath = serde_json::from_value(json!(["1a", 42, "42"])).unwrap();
        assert_eq!(
            path.keys(),
            &[Key::from("1a"), Key::Int(42), Key::Str("42".to_owned())]
        );
    }

    #[test]
    fn path_serializes_as_plain_array() {
        let path = KeyPath::from(vec![Key::from("model"), Key::from(3)]);
        assert_eq!(serde_json::to_value(&path).unwrap(), json!(["model", 3]));
    }

    #[test]
    fn display_joins_with_dots() {
        assert_eq!(KeyPath::from(["a", "b"]).to_string(), "a.b");
        assert_eq!(KeyPath::root().to_string(), "<root>");
    }

    #[test]
    fn negative_int_is_not_an_index() {
        assert_eq!(Key::Int(-1).as_index(), None);
        assert_eq!(Key::Int(2).as_index(), Some(2));
    }
}
