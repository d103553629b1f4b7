//! Declarative config trees and parameter sweeps.
//!
//! A [`ConfigNode`] tree describes an object graph as data. [`Builder`] turns it into live
//! [`Value`]s, invoking [`Factory`]s named through a [`Registry`]. Sweeps of
//! [`OverrideSet`]s, composed with [`product`] and [`zipper`], produce one overridden tree
//! per experiment.

mod build;
#[cfg(feature = "cli")]
pub mod cli;
mod error;
mod form;
mod node;
mod overrides;
mod path;
mod registry;
mod settings;
mod sweep;
mod trace;
mod value;
mod writer;

pub use build::{Builder, DEFAULT_MAX_DEPTH, build};
pub use error::{BuildError, Error, LoadError, OverrideError, SweepError, Unresolved};
pub use form::{ChoiceForm, ConstructorForm, Form, FormKind, ModuleRef};
pub use node::{ConfigNode, Mapping};
pub use overrides::{
    OverrideEntry, OverrideSet, override_from_json, override_leaf, override_many, with_overrides,
};
pub use path::{Key, KeyPath, OverridePath};
pub use registry::{BUILTINS, Module, Registry};
pub use settings::{LogDirSettings, SettingsError, SweepSettings};
pub use sweep::{
    DEFAULT_LOG_DIR_KEY, LogDirNaming, Sweep, add_log_dir_sweep, add_log_dir_sweep_with,
    discrete, product, zipper,
};
pub use trace::{Trace, TraceEvent};
pub use value::{Args, Factory, Object, Value};
pub use writer::{OutputSettings, Replacement, SweepWriter, read_override_set};

pub type Result<T> = std::result::Result<T, Error>;
