use crate::error::BuildError;
use crate::form::{self, Form, FormKind};
use crate::node::{ConfigNode, Mapping};
use crate::path::{Key, KeyPath};
use crate::registry::Registry;
use crate::trace::{Trace, TraceEvent};
use crate::value::{Args, Factory, Value};
use indexmap::IndexMap;

pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Turns config trees into live values, resolving names against a [`Registry`].
#[derive(Clone, Copy, Debug)]
pub struct Builder<'r> {
    registry: &'r Registry,
    max_depth: usize,
}

impl<'r> Builder<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn build(&self, node: &ConfigNode) -> Result<Value, BuildError> {
        Walk::new(self, None).node(node)
    }

    /// Same as [`Builder::build`], recording every resolution step into `trace`.
    pub fn build_traced(&self, node: &ConfigNode, trace: &mut Trace) -> Result<Value, BuildError> {
        Walk::new(self, Some(trace)).node(node)
    }
}

/// Builds `node` with a fresh [`Builder`] over `registry`.
pub fn build(node: &ConfigNode, registry: &Registry) -> Result<Value, BuildError> {
    Builder::new(registry).build(node)
}

struct Walk<'b, 't> {
    registry: &'b Registry,
    max_depth: usize,
    depth: usize,
    path: KeyPath,
    trace: Option<&'t mut Trace>,
}

impl<'b, 't> Walk<'b, 't> {
    fn new(builder: &Builder<'b>, trace: Option<&'t mut Trace>) -> Self {
        Self {
            registry: builder.registry,
            max_depth: builder.max_depth,
            depth: 0,
            path: KeyPath::root(),
            trace,
        }
    }

    fn node(&mut self, node: &ConfigNode) -> Result<Value, BuildError> {
        if self.depth >= self.max_depth {
            return Err(BuildError::DepthExceeded {
                limit: self.max_depth,
                path: self.path.clone(),
            });
        }
        self.depth += 1;
        let result = match node {
            ConfigNode::Leaf(value) => Ok(value.clone()),
            ConfigNode::Sequence(items) => self.items(items).map(Value::List),
            ConfigNode::Tuple(items) => self
                .items(items)
                .map(|items| Value::Tuple(items.into_boxed_slice())),
            ConfigNode::Mapping(map) => self.mapping(map),
        };
        self.depth -= 1;
        result
    }

    /// Runs `f` with `key` appended to the current path.
    fn scoped<T>(
        &mut self,
        key: impl Into<Key>,
        f: impl FnOnce(&mut Self) -> Result<T, BuildError>,
    ) -> Result<T, BuildError> {
        self.path.push(key);
        let result = f(self);
        self.path.pop();
        result
    }

    fn record(&mut self, event: impl FnOnce(&KeyPath) -> TraceEvent) {
        if let Some(trace) = self.trace.as_deref_mut() {
            trace.record(event(&self.path));
        }
    }

    fn items(&mut self, items: &[ConfigNode]) -> Result<Vec<Value>, BuildError> {
        items
            .iter()
            .enumerate()
            .map(|(index, item)| self.scoped(index, |walk| walk.node(item)))
            .collect()
    }

    fn mapping(&mut self, map: &Mapping) -> Result<Value, BuildError> {
        match Form::classify(map) {
            Form::Constructor {
                constructor,
                args,
                kwargs,
            } => self.construct(constructor, args, kwargs),
            Form::ModuleRef { module, method } => self.module_ref(module, method),
            Form::Choice { choice, options } => self.choice(choice, options),
            Form::Plain(map) => map
                .iter()
                .map(|(key, value)| {
                    let built = self.scoped(key.clone(), |walk| walk.node(value))?;
                    Ok((key.clone(), built))
                })
                .collect::<Result<IndexMap<_, _>, _>>()
                .map(Value::Map),
        }
    }

    fn construct(
        &mut self,
        constructor: &ConfigNode,
        args: Option<&ConfigNode>,
        kwargs: Option<&ConfigNode>,
    ) -> Result<Value, BuildError> {
        let factory = self.factory(constructor)?;
        let positional = match args {
            Some(args) => self.scoped(form::ARGS, |walk| walk.positional(args))?,
            None => Vec::new(),
        };
        let keyword = match kwargs {
            Some(kwargs) => self.scoped(form::KWARGS, |walk| walk.keyword(kwargs))?,
            None => IndexMap::new(),
        };

        log::debug!("Constructor: {} at '{}'", factory.name(), self.path);
        self.record(|path| TraceEvent::Constructed {
            path: path.clone(),
            constructor: factory.name().to_owned(),
        });

        factory
            .call(Args::new(positional, keyword))
            .map_err(|cause| BuildError::Construction {
                constructor: factory.name().to_owned(),
                path: self.path.clone(),
                cause,
            })
    }

    fn factory(&mut self, constructor: &ConfigNode) -> Result<Factory, BuildError> {
        self.scoped(form::CONSTRUCTOR, |walk| match walk.node(constructor)? {
            Value::Factory(factory) => Ok(factory),
            Value::Str(name) => walk.registry.factory(&name).cloned().map_err(|target| {
                BuildError::ModuleResolution {
                    target,
                    path: walk.path.clone(),
                }
            }),
            other => Err(walk.invalid(
                FormKind::Constructor,
                format!("constructor resolved to a {} instead of a factory", other.kind()),
            )),
        })
    }

    fn positional(&mut self, args: &ConfigNode) -> Result<Vec<Value>, BuildError> {
        match args {
            ConfigNode::Sequence(items) | ConfigNode::Tuple(items) => self.items(items),
            other => match self.node(other)? {
                Value::List(items) => Ok(items),
                Value::Tuple(items) => Ok(items.into_vec()),
                value => Err(self.invalid(
                    FormKind::Constructor,
                    format!("args must be a sequence, got a {}", value.kind()),
                )),
            },
        }
    }

    fn keyword(&mut self, kwargs: &ConfigNode) -> Result<IndexMap<String, Value>, BuildError> {
        // The kwargs mapping itself is never classified: a keyword named `choice` is
        // just a keyword.
        let entries = match kwargs {
            ConfigNode::Mapping(map) => map
                .iter()
                .map(|(key, value)| {
                    let built = self.scoped(key.clone(), |walk| walk.node(value))?;
                    Ok((key.clone(), built))
                })
                .collect::<Result<Vec<_>, BuildError>>()?,
            other => match self.node(other)? {
                Value::Map(map) => map.into_iter().collect(),
                value => {
                    return Err(self.invalid(
                        FormKind::Constructor,
                        format!("kwargs must be a mapping, got a {}", value.kind()),
                    ));
                }
            },
        };

        entries
            .into_iter()
            .map(|(key, value)| match key {
                Key::Str(name) => Ok((name, value)),
                Key::Int(i) => Err(self.invalid(
                    FormKind::Constructor,
                    format!("keyword names must be strings, got {i}"),
                )),
            })
            .collect()
    }

    fn module_ref(
        &mut self,
        module: Option<&ConfigNode>,
        method: Option<&ConfigNode>,
    ) -> Result<Value, BuildError> {
        let module = self.string_field(FormKind::ModuleRef, form::MODULE, module)?;
        let method = self.string_field(FormKind::ModuleRef, form::METHOD, method)?;

        let value = self
            .registry
            .resolve(module, method)
            .map_err(|target| BuildError::ModuleResolution {
                target,
                path: self.path.clone(),
            })?
            .clone();

        log::debug!("Resolved {module}.{method} at '{}'", self.path);
        self.record(|path| TraceEvent::Resolved {
            path: path.clone(),
            module: module.to_owned(),
            method: method.to_owned(),
        });
        Ok(value)
    }

    fn choice(
        &mut self,
        choice: &ConfigNode,
        options: Option<&ConfigNode>,
    ) -> Result<Value, BuildError> {
        let key = match choice {
            ConfigNode::Leaf(Value::Str(s)) => Key::Str(s.clone()),
            ConfigNode::Leaf(Value::Int(i)) => Key::Int(*i),
            _ => {
                return Err(self.invalid(
                    FormKind::Choice,
                    "'choice' must be a string or integer".to_owned(),
                ));
            }
        };
        let options = match options {
            Some(ConfigNode::Mapping(options)) => options,
            Some(_) => {
                return Err(self.invalid(FormKind::Choice, "'options' must be a mapping".to_owned()));
            }
            None => return Err(self.missing(FormKind::Choice, form::OPTIONS)),
        };
        let Some(chosen) = options.get(&key) else {
            return Err(BuildError::MissingKey {
                form: FormKind::Choice,
                key: key.to_string(),
                path: self.path.child(form::OPTIONS),
            });
        };

        log::debug!("Choice '{key}' at '{}'", self.path);
        self.record(|path| TraceEvent::Chose {
            path: path.clone(),
            choice: key.clone(),
        });
        self.scoped(form::OPTIONS, |walk| walk.scoped(key, |walk| walk.node(chosen)))
    }

    fn string_field<'n>(
        &self,
        form: FormKind,
        key: &str,
        node: Option<&'n ConfigNode>,
    ) -> Result<&'n str, BuildError> {
        match node {
            Some(ConfigNode::Leaf(Value::Str(s))) => Ok(s),
            Some(_) => Err(self.invalid(form, format!("'{key}' must be a string"))),
            None => Err(self.missing(form, key)),
        }
    }

    fn missing(&self, form: FormKind, key: &str) -> BuildError {
        BuildError::MissingKey {
            form,
            key: key.to_owned(),
            path: self.path.clone(),
        }
    }

    fn invalid(&self, form: FormKind, reason: String) -> BuildError {
        BuildError::InvalidForm {
            form,
            path: self.path.clone(),
            reason,
        }
    }
}
