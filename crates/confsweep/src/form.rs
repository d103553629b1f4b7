use crate::node::{ConfigNode, Mapping};
use crate::path::Key;
use strum::Display;

pub const CONSTRUCTOR: &str = "constructor";
pub const ARGS: &str = "args";
pub const KWARGS: &str = "kwargs";
pub const MODULE: &str = "module";
pub const METHOD: &str = "method";
pub const CHOICE: &str = "choice";
pub const OPTIONS: &str = "options";

/// Which reserved shape a mapping node takes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum FormKind {
    #[strum(serialize = "constructor form")]
    Constructor,
    #[strum(serialize = "module reference")]
    ModuleRef,
    #[strum(serialize = "choice form")]
    Choice,
    #[strum(serialize = "mapping")]
    Plain,
}

/// Borrowed view of a mapping, classified by its reserved keys.
///
/// Precedence is `constructor`, then `module`/`method`, then `choice`. Companion keys
/// that are absent stay `None`; the construction engine decides whether that is an error.
#[derive(Debug)]
pub enum Form<'a> {
    Constructor {
        constructor: &'a ConfigNode,
        args: Option<&'a ConfigNode>,
        kwargs: Option<&'a ConfigNode>,
    },
    ModuleRef {
        module: Option<&'a ConfigNode>,
        method: Option<&'a ConfigNode>,
    },
    Choice {
        choice: &'a ConfigNode,
        options: Option<&'a ConfigNode>,
    },
    Plain(&'a Mapping),
}

impl<'a> Form<'a> {
    pub fn classify(map: &'a Mapping) -> Self {
        let get = |name: &str| map.get(&Key::from(name));

        if let Some(constructor) = get(CONSTRUCTOR) {
            return Form::Constructor {
                constructor,
                args: get(ARGS),
                kwargs: get(KWARGS),
            };
        }

        let (module, method) = (get(MODULE), get(METHOD));
        if module.is_some() || method.is_some() {
            return Form::ModuleRef { module, method };
        }

        if let Some(choice) = get(CHOICE) {
            return Form::Choice {
                choice,
                options: get(OPTIONS),
            };
        }

        Form::Plain(map)
    }

    pub fn kind(&self) -> FormKind {
        match self {
            Form::Constructor { .. } => FormKind::Constructor,
            Form::ModuleRef { .. } => FormKind::ModuleRef,
            Form::Choice { .. } => FormKind::Choice,
            Form::Plain(_) => FormKind::Plain,
        }
    }
}

/// Authoring helper for a `{constructor, args, kwargs}` mapping.
#[derive(Clone, Debug)]
pub struct ConstructorForm {
    constructor: ConfigNode,
    args: Vec<ConfigNode>,
    kwargs: Vec<(String, ConfigNode)>,
}

impl ConstructorForm {
    pub fn new(constructor: impl Into<ConfigNode>) -> Self {
        Self {
            constructor: constructor.into(),
            args: Vec::new(),
            kwargs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<ConfigNode>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = ConfigNode>) -> Self {
        self.args.extend(args);
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<ConfigNode>) -> Self {
        self.kwargs.push((name.into(), value.into()));
        self
    }
}

impl From<ConstructorForm> for ConfigNode {
    fn from(form: ConstructorForm) -> Self {
        let mut map = Mapping::new();
        map.insert(CONSTRUCTOR.into(), form.constructor);
        if !form.args.is_empty() {
            map.insert(ARGS.into(), ConfigNode::Sequence(form.args));
        }
        if !form.kwargs.is_empty() {
            map.insert(KWARGS.into(), ConfigNode::mapping(form.kwargs));
        }
        ConfigNode::Mapping(map)
    }
}

/// Authoring helper for a `{module, method}` mapping.
#[derive(Clone, Debug, derive_new::new)]
pub struct ModuleRef {
    #[new(into)]
    module: String,
    #[new(into)]
    method: String,
}

impl From<ModuleRef> for ConfigNode {
    fn from(form: ModuleRef) -> Self {
        ConfigNode::mapping([
            (MODULE, ConfigNode::from(form.module)),
            (METHOD, ConfigNode::from(form.method)),
        ])
    }
}

/// Authoring helper for a `{choice, options}` mapping.
#[derive(Clone, Debug)]
pub struct ChoiceForm {
    choice: Key,
    options: Mapping,
}

impl ChoiceForm {
    pub fn new(choice: impl Into<Key>) -> Self {
        Self {
            choice: choice.into(),
            options: Mapping::new(),
        }
    }

    pub fn option(mut self, key: impl Into<Key>, node: impl Into<ConfigNode>) -> Self {
        self.options.insert(key.into(), node.into());
        self
    }
}

impl From<ChoiceForm> for ConfigNode {
    fn from(form: ChoiceForm) -> Self {
        let choice = match form.choice {
            Key::Str(s) => ConfigNode::from(s),
            Key::Int(i) => ConfigNode::from(i),
        };
        ConfigNode::mapping([
            (CHOICE, choice),
            (OPTIONS, ConfigNode::Mapping(form.options)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn classify(json: serde_json::Value) -> FormKind {
        let node = ConfigNode::from(json);
        Form::classify(node.as_mapping().unwrap()).kind()
    }

    #[test]
    fn constructor_takes_precedence() {
        let kind = classify(json!({"choice": "a", "module": "m", "constructor": "list"}));
        assert_eq!(kind, FormKind::Constructor);
    }

    #[test]
    fn module_beats_choice() {
        assert_eq!(
            classify(json!({"choice": "a", "module": "m", "method": "f"})),
            FormKind::ModuleRef
        );
        assert_eq!(classify(json!({"method": "f"})), FormKind::ModuleRef);
    }

    #[test]
    fn options_alone_is_a_plain_key() {
        assert_eq!(classify(json!({"options": {"a": 1}})), FormKind::Plain);
        assert_eq!(classify(json!({"choice": "a"})), FormKind::Choice);
    }

    #[test]
    fn helpers_encode_reserved_keys() {
        let node: ConfigNode = ConstructorForm::new("dict").kwarg("x", 1).into();
        assert_eq!(
            node.to_json(),
            Some(json!({"constructor": "dict", "kwargs": {"x": 1}}))
        );
        let node: ConfigNode = ChoiceForm::new("k").option("k", 3).into();
        assert_eq!(node.to_json(), Some(json!({"choice": "k", "options": {"k": 3}})));
        let node: ConfigNode = ModuleRef::new("builtins", "list").into();
        assert_eq!(
            node.to_json(),
            Some(json!({"module": "builtins", "method": "list"}))
        );
    }
}
