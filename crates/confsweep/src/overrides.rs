use crate::error::OverrideError;
use crate::node::ConfigNode;
use crate::path::OverridePath;
use crate::value::oversized_integer;
use derive_more::{Deref, DerefMut, From, IntoIterator};
use serde::{Deserialize, Serialize};

/// A single point mutation: replace the leaf at `path` with `value`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, derive_new::new)]
pub struct OverrideEntry {
    #[serde(rename = "node")]
    #[new(into)]
    pub path: OverridePath,
    #[new(into)]
    pub value: serde_json::Value,
}

/// Overrides applied together to realize one experiment variant.
#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, Deref, DerefMut, From, IntoIterator,
)]
#[serde(transparent)]
pub struct OverrideSet(Vec<OverrideEntry>);

impl OverrideSet {
    pub fn new(entries: Vec<OverrideEntry>) -> Self {
        Self(entries)
    }

    pub fn single(path: impl Into<OverridePath>, value: impl Into<serde_json::Value>) -> Self {
        Self(vec![OverrideEntry::new(path, value)])
    }

    pub fn from_json(text: &str) -> Result<Self, OverrideError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// This set followed by the entries of `other`.
    pub fn concat(&self, other: &OverrideSet) -> OverrideSet {
        self.iter().chain(other.iter()).cloned().collect()
    }
}

impl FromIterator<OverrideEntry> for OverrideSet {
    fn from_iter<I: IntoIterator<Item = OverrideEntry>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a OverrideSet {
    type Item = &'a OverrideEntry;
    type IntoIter = std::slice::Iter<'a, OverrideEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Replaces the node at `path` in place.
///
/// Every key along the path must already exist; integer keys also index sequences.
/// A path running into a prebuilt list, tuple or map leaf continues inside it, and the
/// element there is replaced by `value` as plain data. `value` is stored as given and
/// is not built.
pub fn override_leaf(
    tree: &mut ConfigNode,
    path: &OverridePath,
    value: impl Into<ConfigNode>,
) -> Result<(), OverrideError> {
    if path.is_empty() {
        return Err(OverrideError::EmptyPath);
    }
    let not_found = |depth: usize| OverrideError::PathNotFound {
        key: path.keys()[depth].clone(),
        path: path.prefix(depth + 1),
    };

    let mut node = tree;
    for (depth, key) in path.keys().iter().enumerate() {
        if let ConfigNode::Leaf(leaf) = &mut *node {
            let mut target = leaf;
            for (depth, key) in path.keys().iter().enumerate().skip(depth) {
                target = target.child_mut(key).ok_or_else(|| not_found(depth))?;
            }
            log::debug!("Overriding '{path}' inside a prebuilt value");
            *target = value.into().into_value();
            return Ok(());
        }
        node = node.child_mut(key).ok_or_else(|| not_found(depth))?;
    }

    log::debug!("Overriding '{path}'");
    *node = value.into();
    Ok(())
}

/// Applies every entry of `overrides` in order.
///
/// Fails on the first bad entry; entries before it stay applied. Use [`with_overrides`]
/// when a failed set must leave the tree untouched.
pub fn override_many(tree: &mut ConfigNode, overrides: &OverrideSet) -> Result<(), OverrideError> {
    for entry in overrides {
        if let Some(value) = oversized_integer(&entry.value) {
            return Err(OverrideError::IntegerOutOfRange {
                value,
                path: entry.path.clone(),
            });
        }
        override_leaf(tree, &entry.path, entry.value.clone())?;
    }
    Ok(())
}

/// Returns an overridden copy of `base`, leaving `base` as it was.
pub fn with_overrides(
    base: &ConfigNode,
    overrides: &OverrideSet,
) -> Result<ConfigNode, OverrideError> {
    let mut tree = base.clone();
    override_many(&mut tree, overrides)?;
    Ok(tree)
}

/// Parses a serialized override set and applies it.
pub fn override_from_json(tree: &mut ConfigNode, json: &str) -> Result<(), OverrideError> {
    let overrides = OverrideSet::from_json(json)?;
    override_many(tree, &overrides)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Key;
    use rstest::rstest;
    use serde_json::json;

    fn config() -> ConfigNode {
        ConfigNode::mapping([
            (
                Key::from("1a"),
                ConfigNode::from(json!({"2a": 0, "2b": 1, "2c": [2, 3, 4, 5]})),
            ),
            (Key::Int(42), ConfigNode::from("2d")),
        ])
    }

    fn path(keys: &[Key]) -> OverridePath {
        OverridePath::from(keys)
    }

    #[rstest]
    #[case(path(&["1a".into(), "2a".into()]), json!(17))]
    #[case(path(&["1a".into(), "2a".into()]), json!(18))]
    #[case(path(&["1a".into(), "2c".into()]), json!("blargh"))]
    #[case(path(&[42.into()]), json!(4))]
    #[case(path(&["1a".into(), "2c".into(), 1.into()]), json!({"nested": true}))]
    fn override_then_restore(#[case] path: OverridePath, #[case] value: serde_json::Value) {
        let mut tree = config();
        let old = tree.get(&path).cloned().unwrap();

        override_leaf(&mut tree, &path, value.clone()).unwrap();
        assert_eq!(tree.get(&path), Some(&ConfigNode::from(value)));

        override_leaf(&mut tree, &path, old).unwrap();
        assert_eq!(tree, config());
    }

    #[rstest]
    #[case(path(&["3a".into(), "2a".into()]), "3a", 1)]
    #[case(path(&["1a".into(), "2z".into()]), "2z", 2)]
    #[case(path(&["42".into()]), "42", 1)]
    #[case(path(&["1a".into(), "2a".into(), "x".into()]), "x", 3)]
    #[case(path(&["1a".into(), "2c".into(), 9.into()]), "9", 3)]
    fn missing_keys_are_reported(
        #[case] path: OverridePath,
        #[case] missing: &str,
        #[case] depth: usize,
    ) {
        let mut tree = config();
        match override_leaf(&mut tree, &path, 0).unwrap_err() {
            OverrideError::PathNotFound { key, path: prefix } => {
                assert_eq!(key.to_string(), missing);
                assert_eq!(prefix.len(), depth);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(tree, config());
    }

    #[test]
    fn overrides_reach_into_prebuilt_values() {
        use crate::value::Value;

        let mut layers = indexmap::IndexMap::new();
        layers.insert(Key::from("sizes"), Value::List(vec![Value::Int(8), Value::Int(16)]));
        let mut tree = ConfigNode::mapping([("model", ConfigNode::Leaf(Value::Map(layers)))]);

        let path = OverridePath::from(vec![Key::from("model"), Key::from("sizes"), Key::Int(1)]);
        override_leaf(&mut tree, &path, json!([1, 2])).unwrap();

        let model = tree.get(&"model".into()).and_then(ConfigNode::as_leaf).unwrap();
        let sizes = model.as_map().unwrap()[&Key::from("sizes")].as_list().unwrap();
        assert_eq!(
            sizes,
            [Value::Int(8), Value::List(vec![Value::Int(1), Value::Int(2)])]
        );

        let path = OverridePath::from(vec![Key::from("model"), Key::from("sizes"), Key::Int(5)]);
        match override_leaf(&mut tree, &path, 0).unwrap_err() {
            OverrideError::PathNotFound { key, path: prefix } => {
                assert_eq!(key, Key::Int(5));
                assert_eq!(prefix, path);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn oversized_integers_are_not_applied() {
        let mut tree = config();
        let json = json!([{"node": ["1a", "2a"], "value": u64::MAX}]).to_string();
        let err = override_from_json(&mut tree, &json).unwrap_err();
        assert!(matches!(err, OverrideError::IntegerOutOfRange { value: u64::MAX, .. }));
        assert_eq!(tree, config());
    }

    #[test]
    fn empty_path_is_rejected() {
        let mut tree = config();
        let err = override_leaf(&mut tree, &OverridePath::root(), 1).unwrap_err();
        assert!(matches!(err, OverrideError::EmptyPath));
    }

    #[test]
    fn override_many_applies_in_order() {
        let overrides = OverrideSet::new(vec![
            OverrideEntry::new(["1a", "2a"], 17),
            OverrideEntry::new(["1a", "2c"], "blargh"),
            OverrideEntry::new([42], 4),
            OverrideEntry::new(["1a", "2a"], 19),
        ]);
        let mut tree = config();
        override_many(&mut tree, &overrides).unwrap();
        assert_eq!(tree.get(&["1a", "2a"].into()), Some(&ConfigNode::from(19)));
        assert_eq!(tree.get(&["1a", "2c"].into()), Some(&ConfigNode::from("blargh")));
        assert_eq!(tree.get(&[42].into()), Some(&ConfigNode::from(4)));
    }

    #[test]
    fn override_many_fails_fast_keeping_earlier_entries() {
        let overrides = OverrideSet::new(vec![
            OverrideEntry::new(["1a", "2a"], 17),
            OverrideEntry::new(["nope"], 1),
            OverrideEntry::new(["1a", "2b"], 17),
        ]);
        let mut tree = config();
        assert!(override_many(&mut tree, &overrides).is_err());
        assert_eq!(tree.get(&["1a", "2a"].into()), Some(&ConfigNode::from(17)));
        assert_eq!(tree.get(&["1a", "2b"].into()), Some(&ConfigNode::from(1)));

        let base = config();
        assert!(with_overrides(&base, &overrides).is_err());
        assert_eq!(base, config());
    }

    #[test]
    fn overrides_from_json() {
        let json = json!([
            {"node": ["1a", "2a"], "value": 17},
            {"node": ["1a", "2c"], "value": "blargh"},
            {"node": [42], "value": 4},
        ])
        .to_string();
        let mut tree = config();
        override_from_json(&mut tree, &json).unwrap();
        assert_eq!(tree.get(&["1a", "2a"].into()), Some(&ConfigNode::from(17)));
        assert_eq!(tree.get(&[42].into()), Some(&ConfigNode::from(4)));

        let err = override_from_json(&mut tree, "{'node': ['1a']}").unwrap_err();
        assert!(matches!(err, OverrideError::Parse(_)));
    }

    #[test]
    fn sets_round_trip_through_json() {
        let set = OverrideSet::new(vec![
            OverrideEntry::new(["model", "lr"], 0.1),
            OverrideEntry::new(vec![Key::from("layers"), Key::Int(0)], json!({"units": 4})),
        ]);
        let text = set.to_json().unwrap();
        assert_eq!(
            text,
            r#"[{"node":["model","lr"],"value":0.1},{"node":["layers",0],"value":{"units":4}}]"#
        );
        assert_eq!(OverrideSet::from_json(&text).unwrap(), set);
    }
}
