use crate::path::Key;
use indexmap::IndexMap;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A fully realized value: what a config tree builds into, and what a leaf holds.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    /// Fixed-arity, immutable sequence. Never compares equal to a `List`.
    Tuple(Box<[Value]>),
    Map(IndexMap<Key, Value>),
    Factory(Factory),
    Object(Object),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<Key, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_factory(&self) -> Option<&Factory> {
        match self {
            Value::Factory(factory) => Some(factory),
            _ => None,
        }
    }

    /// Element of a list, tuple or map. Integer keys index lists and tuples.
    pub fn child_mut(&mut self, key: &Key) -> Option<&mut Value> {
        match self {
            Value::List(items) => items.get_mut(key.as_index()?),
            Value::Tuple(items) => items.get_mut(key.as_index()?),
            Value::Map(map) => map.get_mut(key),
            _ => None,
        }
    }

    /// Borrows the payload of an `Object` as `T`, if it is one.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Object(object) => object.downcast_ref(),
            _ => None,
        }
    }

    /// Short name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Map(_) => "map",
            Value::Factory(_) => "factory",
            Value::Object(_) => "object",
        }
    }

    /// Converts plain data back to JSON. Factories, objects and non-finite floats have no
    /// JSON form.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        use serde_json::Value as Json;
        Some(match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => Json::Number(serde_json::Number::from_f64(*f)?),
            Value::Str(s) => Json::String(s.clone()),
            Value::List(items) => {
                Json::Array(items.iter().map(Value::to_json).collect::<Option<_>>()?)
            }
            Value::Tuple(items) => {
                Json::Array(items.iter().map(Value::to_json).collect::<Option<_>>()?)
            }
            Value::Map(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| Some((k.to_string(), v.to_json()?)))
                    .collect::<Option<_>>()?,
            ),
            Value::Factory(_) | Value::Object(_) => return None,
        })
    }
}

/// First integer in `json` that an `i64` cannot hold.
///
/// Such integers would otherwise turn into lossy floats when converted to a [`Value`].
pub(crate) fn oversized_integer(json: &serde_json::Value) -> Option<u64> {
    use serde_json::Value as Json;
    match json {
        Json::Number(n) if n.as_i64().is_none() => n.as_u64(),
        Json::Array(items) => items.iter().find_map(oversized_integer),
        Json::Object(map) => map.values().find_map(oversized_integer),
        _ => None,
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::Str(s),
            Json::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (Key::Str(k), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Factory> for Value {
    fn from(factory: Factory) -> Self {
        Value::Factory(factory)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(object)
    }
}

/// Arguments handed to a factory: positional values in order, keyword values in key order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Args {
    pub positional: Vec<Value>,
    pub keyword: IndexMap<String, Value>,
}

impl Args {
    pub fn new(positional: Vec<Value>, keyword: IndexMap<String, Value>) -> Self {
        Self {
            positional,
            keyword,
        }
    }

    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    pub fn kwarg(&self, name: &str) -> Option<&Value> {
        self.keyword.get(name)
    }

    /// Looks up a keyword argument, failing with a readable message when absent.
    pub fn require(&self, name: &str) -> anyhow::Result<&Value> {
        self.kwarg(name)
            .ok_or_else(|| anyhow::anyhow!("missing keyword argument '{name}'"))
    }
}

type FactoryFn = dyn Fn(Args) -> anyhow::Result<Value> + Send + Sync;

/// A named callable that constructs a [`Value`] from [`Args`].
#[derive(Clone)]
pub struct Factory {
    name: Arc<str>,
    func: Arc<FactoryFn>,
}

impl Factory {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Args) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name.into()),
            func: Arc::new(func),
        }
    }

    /// Wraps a constructor of `T`; the built object is stored as an opaque [`Object`].
    pub fn object<T, F>(name: impl Into<String>, func: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(Args) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self::new(name, move |args| func(args).map(|obj| Value::Object(Object::new(obj))))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: Args) -> anyhow::Result<Value> {
        (self.func)(args)
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Factory({})", self.name)
    }
}

impl PartialEq for Factory {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

/// An opaque, pre-constructed object carried through a tree untouched.
#[derive(Clone)]
pub struct Object {
    type_name: String,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Object {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: tynm::type_name::<T>(),
            inner: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object<{}>", self.type_name)
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq)]
    struct Marker(u8);

    #[test]
    fn json_numbers_keep_integer_precision() {
        assert_eq!(Value::from(json!(3)), Value::Int(3));
        assert_eq!(Value::from(json!(0.5)), Value::Float(0.5));
    }

    #[test]
    fn non_finite_floats_have_no_json_form() {
        assert_eq!(Value::Float(1.5).to_json(), Some(json!(1.5)));
        assert_eq!(Value::Float(f64::NAN).to_json(), None);
        assert_eq!(Value::List(vec![Value::Float(f64::INFINITY)]).to_json(), None);
    }

    #[test]
    fn finds_integers_too_large_for_i64() {
        let big = i64::MAX as u64 + 1;
        assert_eq!(oversized_integer(&json!({"a": [1, {"b": big}]})), Some(big));
        assert_eq!(oversized_integer(&json!({"a": [i64::MAX, -1, 0.5]})), None);
    }

    #[test]
    fn list_and_tuple_are_distinct() {
        let list = Value::List(vec![Value::Int(1)]);
        let tuple = Value::Tuple(vec![Value::Int(1)].into_boxed_slice());
        assert_ne!(list, tuple);
        assert_eq!(list.to_json(), tuple.to_json());
    }

    #[test]
    fn objects_compare_by_identity() {
        let a = Object::new(Marker(1));
        let b = Object::new(Marker(1));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.downcast_ref::<Marker>(), Some(&Marker(1)));
        assert_eq!(a.type_name(), "Marker");
    }

    #[test]
    fn factories_without_json_form() {
        let factory = Factory::new("noop", |_| Ok(Value::Null));
        assert_eq!(Value::Factory(factory).to_json(), None);
    }

    #[test]
    fn require_reports_missing_kwarg() {
        let args = Args::default();
        let err = args.require("units").unwrap_err();
        assert_eq!(err.to_string(), "missing keyword argument 'units'");
    }
}
