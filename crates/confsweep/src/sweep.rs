//! Composable hyperparameter sweeps.
//!
//! A [`Sweep`] is an ordered list of [`OverrideSet`]s, one per experiment. Sweeps over a
//! single parameter come from [`discrete`] and are combined with [`product`] (every
//! combination) or [`zipper`] (element-wise).

use crate::error::{OverrideError, SweepError};
use crate::node::ConfigNode;
use crate::overrides::{OverrideSet, with_overrides};
use crate::path::OverridePath;
use derive_more::{Deref, DerefMut, From, IntoIterator};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub const DEFAULT_LOG_DIR_KEY: &str = "log_dir";

#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, Deref, DerefMut, From, IntoIterator,
)]
#[serde(transparent)]
pub struct Sweep(Vec<OverrideSet>);

impl Sweep {
    pub fn new(sets: Vec<OverrideSet>) -> Self {
        Self(sets)
    }

    /// One overridden copy of `base` per element, in sweep order.
    pub fn realize<'a>(
        &'a self,
        base: &'a ConfigNode,
    ) -> impl Iterator<Item = Result<ConfigNode, OverrideError>> + 'a {
        self.iter().map(move |set| with_overrides(base, set))
    }
}

impl FromIterator<OverrideSet> for Sweep {
    fn from_iter<I: IntoIterator<Item = OverrideSet>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Sweep {
    type Item = &'a OverrideSet;
    type IntoIter = std::slice::Iter<'a, OverrideSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Sweeps a single node over `values`.
///
/// A JSON array yields one element per item; any other value is a sweep of length one.
/// To sweep over array values, nest them: `json!([[1, 2], [3, 4]])`.
pub fn discrete(path: impl Into<OverridePath>, values: impl Into<serde_json::Value>) -> Sweep {
    let path = path.into();
    let values = match values.into() {
        serde_json::Value::Array(values) => values,
        value => vec![value],
    };
    values
        .into_iter()
        .map(|value| OverrideSet::single(path.clone(), value))
        .collect()
}

/// Cartesian product of `sweeps`.
///
/// The result has `len(sweeps[0]) * ... * len(sweeps[n-1])` elements; entries of earlier
/// sweeps come first in every element, and the first sweep varies slowest. A single
/// sweep is returned unchanged; no sweeps at all yield one empty override set.
pub fn product(sweeps: impl IntoIterator<Item = Sweep>) -> Sweep {
    let sweeps: Vec<Sweep> = sweeps.into_iter().collect();
    product_of(&sweeps)
}

fn product_of(sweeps: &[Sweep]) -> Sweep {
    match sweeps {
        [] => Sweep::new(vec![OverrideSet::default()]),
        [only] => only.clone(),
        [first, rest @ ..] => {
            let rest = product_of(rest);
            first
                .iter()
                .flat_map(|x| rest.iter().map(move |y| x.concat(y)))
                .collect()
        }
    }
}

/// Element-wise concatenation of sweeps that all have the same length.
pub fn zipper(sweeps: impl IntoIterator<Item = Sweep>) -> Result<Sweep, SweepError> {
    let sweeps: Vec<Sweep> = sweeps.into_iter().collect();
    let Some(expected) = sweeps.first().map(|sweep| sweep.len()) else {
        return Ok(Sweep::default());
    };
    if let Some((index, sweep)) = sweeps
        .iter()
        .enumerate()
        .find(|(_, sweep)| sweep.len() != expected)
    {
        return Err(SweepError::LengthMismatch {
            index,
            expected,
            found: sweep.len(),
        });
    }

    Ok((0..expected)
        .map(|i| sweeps.iter().flat_map(|sweep| sweep[i].iter().cloned()).collect())
        .collect())
}

/// Separators used to turn an override set into a directory name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogDirNaming {
    /// Between a node name and its value.
    pub value_separator: String,
    /// After each `name<value_separator>value` pair.
    pub entry_separator: String,
}

impl Default for LogDirNaming {
    fn default() -> Self {
        Self {
            value_separator: "_".to_owned(),
            entry_separator: ";".to_owned(),
        }
    }
}

impl LogDirNaming {
    fn name(&self, base: &str, set: &OverrideSet, full_path: bool) -> String {
        let mut name = base.to_owned();
        for entry in set {
            let node = match (full_path, entry.path.last()) {
                (false, Some(last)) => last.to_string(),
                _ => entry.path.dotted(),
            };
            name.push_str(&node);
            name.push_str(&self.value_separator);
            name.push_str(&render_value(&entry.value));
            name.push_str(&self.entry_separator);
        }
        name
    }
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Adds a log directory override, keyed by `key`, to every element of `sweep`.
///
/// `sweep` should only hold the parameters that vary, so names stay short. Names are
/// built from the last path segment of each entry; if that makes two names equal they
/// are rebuilt from full paths, and any name still shared gets a `#<n>` suffix, `n` being
/// the element index or the next number that keeps every name distinct.
pub fn add_log_dir_sweep(
    sweep: &Sweep,
    base: &str,
    key: impl Into<OverridePath>,
) -> Result<Sweep, SweepError> {
    add_log_dir_sweep_with(sweep, base, key, &LogDirNaming::default())
}

pub fn add_log_dir_sweep_with(
    sweep: &Sweep,
    base: &str,
    key: impl Into<OverridePath>,
    naming: &LogDirNaming,
) -> Result<Sweep, SweepError> {
    let mut names: Vec<String> = sweep
        .iter()
        .map(|set| naming.name(base, set, false))
        .collect();
    if has_duplicates(&names) {
        log::debug!("Short log directory names collide, using full node paths");
        names = sweep
            .iter()
            .map(|set| naming.name(base, set, true))
            .collect();
    }
    if has_duplicates(&names) {
        disambiguate(&mut names);
    }

    zipper([sweep.clone(), discrete(key, names)])
}

fn has_duplicates(names: &[String]) -> bool {
    let mut seen = HashSet::new();
    !names.iter().all(|name| seen.insert(name))
}

fn disambiguate(names: &mut [String]) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for name in names.iter() {
        *counts.entry(name.clone()).or_default() += 1;
    }
    // Suffixed names must not land on a name that is already unique.
    let mut taken: HashSet<String> = counts
        .iter()
        .filter(|(_, count)| **count == 1)
        .map(|(name, _)| name.clone())
        .collect();
    for (index, name) in names.iter_mut().enumerate() {
        if counts[name.as_str()] > 1 {
            log::warn!("Log directory '{name}' is shared by several sweep elements");
            let mut suffix = index;
            while taken.contains(&format!("{name}#{suffix}")) {
                suffix += 1;
            }
            name.push_str(&format!("#{suffix}"));
            taken.insert(name.clone());
        }
    }
}
