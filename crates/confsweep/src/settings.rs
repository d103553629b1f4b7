use crate::error::SweepError;
use crate::path::OverridePath;
use crate::sweep::{DEFAULT_LOG_DIR_KEY, LogDirNaming, Sweep, add_log_dir_sweep_with};
use crate::writer::{OutputSettings, SweepWriter};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{fs, io};

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogDirSettings {
    pub base: String,
    pub key: OverridePath,
    #[serde(flatten)]
    pub naming: LogDirNaming,
}

impl Default for LogDirSettings {
    fn default() -> Self {
        Self {
            base: String::new(),
            key: OverridePath::from(DEFAULT_LOG_DIR_KEY),
            naming: LogDirNaming::default(),
        }
    }
}

/// How a batch of sweep elements is named and persisted.
///
/// ```toml
/// dir = "sweeps/lr"
///
/// [output]
/// extension = "txt"
/// replace = [{ from = '"', to = "'" }]
///
/// [log_dir]
/// base = "logs/lr/"
/// key = ["trainer", "log_dir"]
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepSettings {
    /// Directory sweep elements are written to.
    pub dir: Option<PathBuf>,
    pub output: OutputSettings,
    /// When set, every element also overrides a log directory.
    pub log_dir: Option<LogDirSettings>,
}

impl SweepSettings {
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        log::debug!("Loading sweep settings from {}", path.display());
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn writer(&self) -> SweepWriter {
        SweepWriter::new(self.output.clone())
    }

    /// Adds the log directory override when configured, otherwise returns `sweep` as is.
    pub fn prepare(&self, sweep: &Sweep) -> Result<Sweep, SweepError> {
        match &self.log_dir {
            Some(log_dir) => add_log_dir_sweep_with(
                sweep,
                &log_dir.base,
                log_dir.key.clone(),
                &log_dir.naming,
            ),
            None => Ok(sweep.clone()),
        }
    }

    /// Prepares `sweep` and writes it to `dir`, or to the configured directory.
    pub fn write(
        &self,
        sweep: &Sweep,
        dir: Option<&Path>,
    ) -> Result<Vec<PathBuf>, crate::Error> {
        let dir = dir
            .or(self.dir.as_deref())
            .ok_or(SweepError::NoOutputDir)?
            .to_owned();
        let sweep = self.prepare(sweep)?;
        Ok(self.writer().write(&sweep, dir)?)
    }
}
