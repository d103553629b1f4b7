use crate::error::Unresolved;
use crate::path::Key;
use crate::value::{Args, Factory, Value};
use std::collections::HashMap;

pub const BUILTINS: &str = "builtins";

/// A named table of attributes, resolved by `{module, method}` forms.
#[derive(Clone, Debug, Default)]
pub struct Module {
    name: String,
    attributes: HashMap<String, Value>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Adds a factory under `name`; the factory itself is named `<module>.<name>`.
    pub fn with_factory<F>(self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Args) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        let factory = Factory::new(format!("{}.{}", self.name, name), func);
        self.with_value(name, factory)
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

/// Explicit mapping from identifiers to factories and modules.
///
/// This is the only place names in a config tree are resolved; nothing is looked up
/// implicitly.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    factories: HashMap<String, Factory>,
    modules: HashMap<String, Module>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the `list`, `tuple` and `dict` factories, also exposed
    /// through the `builtins` module.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let module = [
            Factory::new("list", list),
            Factory::new("tuple", tuple),
            Factory::new("dict", dict),
        ]
        .into_iter()
        .fold(Module::new(BUILTINS), |module, factory| {
            let name = factory.name().to_owned();
            registry.insert_factory(factory.clone());
            module.with_value(name, factory)
        });
        registry.register_module(module);
        registry
    }

    pub fn register_factory<F>(&mut self, name: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(Args) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.insert_factory(Factory::new(name, func));
        self
    }

    pub fn insert_factory(&mut self, factory: Factory) -> &mut Self {
        let name = factory.name().to_owned();
        log::debug!("Registering factory '{name}'");
        if self.factories.insert(name.clone(), factory).is_some() {
            log::warn!("Factory '{name}' was already registered and has been replaced");
        }
        self
    }

    pub fn register_module(&mut self, module: Module) -> &mut Self {
        let name = module.name().to_owned();
        log::debug!(
            "Registering module '{name}' with {} attributes",
            module.attributes.len()
        );
        if self.modules.insert(name.clone(), module).is_some() {
            log::warn!("Module '{name}' was already registered and has been replaced");
        }
        self
    }

    pub fn factory(&self, name: &str) -> Result<&Factory, Unresolved> {
        self.factories
            .get(name)
            .ok_or_else(|| Unresolved::Factory(name.to_owned()))
    }

    pub fn module(&self, name: &str) -> Result<&Module, Unresolved> {
        self.modules
            .get(name)
            .ok_or_else(|| Unresolved::Module(name.to_owned()))
    }

    /// Looks up `method` on `module` without invoking it.
    pub fn resolve(&self, module: &str, method: &str) -> Result<&Value, Unresolved> {
        self.module(module)?
            .attribute(method)
            .ok_or_else(|| Unresolved::Attribute {
                module: module.to_owned(),
                attribute: method.to_owned(),
            })
    }

    /// Registered factory names, sorted.
    pub fn factory_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn module_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.modules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

fn list(args: Args) -> anyhow::Result<Value> {
    Ok(Value::List(args.positional))
}

fn tuple(args: Args) -> anyhow::Result<Value> {
    Ok(Value::Tuple(args.positional.into_boxed_slice()))
}

fn dict(args: Args) -> anyhow::Result<Value> {
    if !args.positional.is_empty() {
        anyhow::bail!(
            "dict takes keyword arguments only, got {} positional",
            args.positional.len()
        );
    }
    Ok(Value::Map(
        args.keyword
            .into_iter()
            .map(|(k, v)| (Key::Str(k), v))
            .collect(),
    ))
}
