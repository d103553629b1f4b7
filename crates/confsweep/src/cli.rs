use crate::Error;
use crate::node::ConfigNode;
use crate::overrides::{OverrideSet, override_many};
use crate::writer::read_override_set;
use clap::Parser;
use std::path::PathBuf;

/// Arguments an experiment binary receives for one sweep element.
#[derive(Parser, Debug)]
#[command(
    name = "confsweep",
    version,
    about = "Apply one sweep element to a base config"
)]
pub struct LaunchArgs {
    /// Base config tree, `.json` or `.toml`.
    #[arg(long)]
    pub config: PathBuf,
    /// Serialized override set, e.g. `[{"node": ["lr"], "value": 0.1}]`.
    #[arg(long, default_value = "[]")]
    pub overrides: String,
    /// File written by a sweep writer; replaces `--overrides`.
    #[arg(long, conflicts_with = "overrides")]
    pub overrides_file: Option<PathBuf>,
}

impl LaunchArgs {
    pub fn override_set(&self) -> Result<OverrideSet, Error> {
        match &self.overrides_file {
            Some(path) => Ok(read_override_set(path)?),
            None => Ok(OverrideSet::from_json(&self.overrides)?),
        }
    }

    /// Loads the base tree and applies this element's overrides.
    pub fn load_tree(&self) -> Result<ConfigNode, Error> {
        let mut tree = ConfigNode::load(&self.config)?;
        let overrides = self.override_set()?;
        log::info!(
            "Applying {} overrides to {}",
            overrides.len(),
            self.config.display()
        );
        override_many(&mut tree, &overrides)?;
        Ok(tree)
    }
}

pub fn parse_launch_args() -> LaunchArgs {
    LaunchArgs::parse()
}

/// Logger for experiment binaries; `RUST_LOG` overrides the `info` default.
pub fn init_logger() -> env_logger::Builder {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format_timestamp(None);
    builder
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::path::KeyPath;
    use std::fs;

    #[test]
    fn test_parse_launch_args() {
        let args = vec![
            "confsweep",
            "--config",
            "base.json",
            "--overrides",
            r#"[{"node": ["lr"], "value": 0.1}]"#,
        ];
        let launch_args = LaunchArgs::try_parse_from(args).unwrap();
        assert_eq!(launch_args.config, PathBuf::from("base.json"));
        assert_eq!(launch_args.override_set().unwrap().len(), 1);
        assert!(launch_args.overrides_file.is_none());
    }

    #[test]
    fn overrides_and_file_conflict() {
        let args = [
            "confsweep",
            "--config",
            "base.json",
            "--overrides",
            "[]",
            "--overrides-file",
            "0.json",
        ];
        assert!(LaunchArgs::try_parse_from(args).is_err());
    }

    #[test]
    fn load_tree_applies_element_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("base.toml");
        fs::write(&config, "[trainer]\nlr = 0.0\nepochs = 3\n").unwrap();
        let element = dir.path().join("0.json");
        fs::write(&element, r#"[{"node": ["trainer", "lr"], "value": 0.5}]"#).unwrap();

        let args = LaunchArgs::try_parse_from([
            "confsweep",
            "--config",
            config.to_str().unwrap(),
            "--overrides-file",
            element.to_str().unwrap(),
        ])
        .unwrap();
        let tree = args.load_tree().unwrap();
        assert_eq!(
            tree.get(&KeyPath::from(["trainer", "lr"])),
            Some(&ConfigNode::from(0.5))
        );
        assert_eq!(
            tree.get(&KeyPath::from(["trainer", "epochs"])),
            Some(&ConfigNode::from(3))
        );
    }
}
