use crate::form::FormKind;
use crate::path::{Key, KeyPath};
use std::fmt;

#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error("{form} at '{path}' is missing key '{key}'")]
    MissingKey {
        form: FormKind,
        key: String,
        path: KeyPath,
    },
    #[error("Failed to resolve {target} at '{path}'")]
    ModuleResolution { target: Unresolved, path: KeyPath },
    #[error("Constructor '{constructor}' failed at '{path}': {cause}")]
    Construction {
        constructor: String,
        path: KeyPath,
        cause: anyhow::Error,
    },
    #[error("Malformed {form} at '{path}': {reason}")]
    InvalidForm {
        form: FormKind,
        path: KeyPath,
        reason: String,
    },
    #[error("Config tree deeper than {limit} levels at '{path}'")]
    DepthExceeded { limit: usize, path: KeyPath },
}

impl BuildError {
    /// Path of the node that caused the failure.
    pub fn path(&self) -> &KeyPath {
        match self {
            BuildError::MissingKey { path, .. }
            | BuildError::ModuleResolution { path, .. }
            | BuildError::Construction { path, .. }
            | BuildError::InvalidForm { path, .. }
            | BuildError::DepthExceeded { path, .. } => path,
        }
    }
}

/// What a registry lookup failed to find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unresolved {
    Module(String),
    Attribute { module: String, attribute: String },
    Factory(String),
}

impl fmt::Display for Unresolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unresolved::Module(module) => write!(f, "module '{module}'"),
            Unresolved::Attribute { module, attribute } => {
                write!(f, "attribute '{attribute}' of module '{module}'")
            }
            Unresolved::Factory(name) => write!(f, "factory '{name}'"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum OverrideError {
    #[error("Override path must contain at least one key")]
    EmptyPath,
    #[error("Key '{key}' of path '{path}' is not in config")]
    PathNotFound { key: Key, path: KeyPath },
    #[error("Override of '{path}' holds integer {value}, which does not fit in an i64")]
    IntegerOutOfRange { value: u64, path: KeyPath },
    #[error("Invalid override set: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum SweepError {
    #[error("Cannot zip sweeps of different lengths: sweep {index} has {found} elements, expected {expected}")]
    LengthMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },
    #[error("Replacing '{from}' with '{to}' cannot be undone when reading the output back")]
    IrreversibleReplacement { from: String, to: String },
    #[error("No output directory given or configured")]
    NoOutputDir,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error("Unsupported config format '{0}', expected json or toml")]
    UnsupportedFormat(String),
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Build failed: {0}")]
    Build(#[from] BuildError),
    #[error("Override failed: {0}")]
    Override(#[from] OverrideError),
    #[error("Sweep failed: {0}")]
    Sweep(#[from] SweepError),
    #[error("Loading config failed: {0}")]
    Load(#[from] LoadError),
    #[error("Invalid settings: {0}")]
    Settings(#[from] crate::settings::SettingsError),
}
