use crate::error::LoadError;
use crate::path::{Key, KeyPath};
use crate::value::{Factory, Object, Value, oversized_integer};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs;
use std::path::Path;

/// Ordered, key-unique entries of a mapping node.
pub type Mapping = IndexMap<Key, ConfigNode>;

/// A node of a declarative config tree.
///
/// Mappings double as the encoding of the reserved constructor, module reference and
/// choice forms; see [`crate::Form`] for how they are told apart.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigNode {
    Leaf(Value),
    Sequence(Vec<ConfigNode>),
    Tuple(Vec<ConfigNode>),
    Mapping(Mapping),
}

impl ConfigNode {
    pub fn leaf(value: impl Into<Value>) -> Self {
        ConfigNode::Leaf(value.into())
    }

    pub fn sequence(items: impl IntoIterator<Item = ConfigNode>) -> Self {
        ConfigNode::Sequence(items.into_iter().collect())
    }

    pub fn tuple(items: impl IntoIterator<Item = ConfigNode>) -> Self {
        ConfigNode::Tuple(items.into_iter().collect())
    }

    pub fn mapping<K: Into<Key>>(entries: impl IntoIterator<Item = (K, ConfigNode)>) -> Self {
        ConfigNode::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn as_leaf(&self) -> Option<&Value> {
        match self {
            ConfigNode::Leaf(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            ConfigNode::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Direct child under `key`. Integer keys also index sequences and tuples.
    pub fn child(&self, key: &Key) -> Option<&ConfigNode> {
        match self {
            ConfigNode::Mapping(map) => map.get(key),
            ConfigNode::Sequence(items) | ConfigNode::Tuple(items) => items.get(key.as_index()?),
            ConfigNode::Leaf(_) => None,
        }
    }

    pub fn child_mut(&mut self, key: &Key) -> Option<&mut ConfigNode> {
        match self {
            ConfigNode::Mapping(map) => map.get_mut(key),
            ConfigNode::Sequence(items) | ConfigNode::Tuple(items) => {
                items.get_mut(key.as_index()?)
            }
            ConfigNode::Leaf(_) => None,
        }
    }

    /// Plain data view of the tree. Reserved forms are kept as maps, not built.
    pub fn into_value(self) -> Value {
        match self {
            ConfigNode::Leaf(value) => value,
            ConfigNode::Sequence(items) => {
                Value::List(items.into_iter().map(ConfigNode::into_value).collect())
            }
            ConfigNode::Tuple(items) => {
                Value::Tuple(items.into_iter().map(ConfigNode::into_value).collect())
            }
            ConfigNode::Mapping(map) => Value::Map(
                map.into_iter()
                    .map(|(key, node)| (key, node.into_value()))
                    .collect(),
            ),
        }
    }

    /// Node at the end of `path`, or `None` if any key along the way is absent.
    pub fn get(&self, path: &KeyPath) -> Option<&ConfigNode> {
        path.keys()
            .iter()
            .try_fold(self, |node, key| node.child(key))
    }

    pub fn get_mut(&mut self, path: &KeyPath) -> Option<&mut ConfigNode> {
        path.keys()
            .iter()
            .try_fold(self, |node, key| node.child_mut(key))
    }

    /// Converts the tree back to JSON. Fails on integer mapping keys, opaque leaves and
    /// non-finite floats.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        use serde_json::Value as Json;
        Some(match self {
            ConfigNode::Leaf(value) => value.to_json()?,
            ConfigNode::Sequence(items) | ConfigNode::Tuple(items) => Json::Array(
                items
                    .iter()
                    .map(ConfigNode::to_json)
                    .collect::<Option<_>>()?,
            ),
            ConfigNode::Mapping(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| Some((k.as_str()?.to_owned(), v.to_json()?)))
                    .collect::<Option<_>>()?,
            ),
        })
    }

    pub fn from_json_str(text: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, LoadError> {
        let node: ConfigNode = toml::from_str(text)?;
        Ok(node)
    }

    /// Loads a tree from a `.json` or `.toml` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&text),
            Some("toml") => Self::from_toml_str(&text),
            other => Err(LoadError::UnsupportedFormat(
                other.unwrap_or_default().to_owned(),
            )),
        }
    }
}

impl Default for ConfigNode {
    fn default() -> Self {
        ConfigNode::Mapping(Mapping::new())
    }
}

impl From<serde_json::Value> for ConfigNode {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Array(items) => {
                ConfigNode::Sequence(items.into_iter().map(ConfigNode::from).collect())
            }
            Json::Object(map) => ConfigNode::Mapping(
                map.into_iter()
                    .map(|(k, v)| (Key::Str(k), ConfigNode::from(v)))
                    .collect(),
            ),
            scalar => ConfigNode::Leaf(Value::from(scalar)),
        }
    }
}

impl From<Value> for ConfigNode {
    fn from(value: Value) -> Self {
        ConfigNode::Leaf(value)
    }
}

impl From<Mapping> for ConfigNode {
    fn from(map: Mapping) -> Self {
        ConfigNode::Mapping(map)
    }
}

impl From<Factory> for ConfigNode {
    fn from(factory: Factory) -> Self {
        ConfigNode::Leaf(Value::Factory(factory))
    }
}

impl From<Object> for ConfigNode {
    fn from(object: Object) -> Self {
        ConfigNode::Leaf(Value::Object(object))
    }
}

macro_rules! impl_leaf_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ConfigNode {
                fn from(value: $ty) -> Self {
                    ConfigNode::Leaf(Value::from(value))
                }
            }
        )*
    };
}

impl_leaf_from!(bool, i32, i64, f64, &str, String);

impl<'de> Deserialize<'de> for ConfigNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        if let Some(n) = oversized_integer(&json) {
            return Err(serde::de::Error::custom(format!(
                "integer {n} does not fit in a 64-bit signed integer"
            )));
        }
        Ok(json.into())
    }
}

impl Serialize for ConfigNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json()
            .ok_or_else(|| {
                serde::ser::Error::custom("config tree holds values without a serialized form")
            })?
            .serialize(serializer)
    }
}
