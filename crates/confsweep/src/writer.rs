use crate::error::SweepError;
use crate::overrides::OverrideSet;
use crate::sweep::Sweep;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A literal substitution applied to serialized text, for consumers that mangle
/// certain characters (e.g. a flag loader that strips double quotes).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, derive_new::new)]
pub struct Replacement {
    #[new(into)]
    pub from: String,
    #[new(into)]
    pub to: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Extension of each written file, without the dot.
    pub extension: String,
    pub pretty: bool,
    /// Applied in order after serialization. Reading back undoes them in reverse.
    pub replace: Vec<Replacement>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            extension: "json".to_owned(),
            pretty: false,
            replace: Vec::new(),
        }
    }
}

/// Persists a sweep as one `<index>.<extension>` file per element.
#[derive(Clone, Debug, Default)]
pub struct SweepWriter {
    settings: OutputSettings,
}

impl SweepWriter {
    pub fn new(settings: OutputSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &OutputSettings {
        &self.settings
    }

    /// Serialized text of one sweep element, replacements applied.
    ///
    /// A replacement whose target text already occurs in the output could not be undone
    /// by [`SweepWriter::parse`], so it is rejected.
    pub fn render(&self, set: &OverrideSet) -> Result<String, SweepError> {
        let text = if self.settings.pretty {
            serde_json::to_string_pretty(set)?
        } else {
            serde_json::to_string(set)?
        };
        self.settings.replace.iter().try_fold(text, |text, r| {
            if r.from.is_empty() || text.contains(&r.to) {
                return Err(SweepError::IrreversibleReplacement {
                    from: r.from.clone(),
                    to: r.to.clone(),
                });
            }
            Ok(text.replace(&r.from, &r.to))
        })
    }

    /// Parses text produced by [`SweepWriter::render`], undoing its replacements.
    pub fn parse(&self, text: &str) -> Result<OverrideSet, SweepError> {
        let text = self
            .settings
            .replace
            .iter()
            .rev()
            .fold(text.to_owned(), |text, r| text.replace(&r.to, &r.from));
        Ok(serde_json::from_str(&text)?)
    }

    pub fn file_name(&self, index: usize) -> String {
        format!("{index}.{}", self.settings.extension)
    }

    /// Writes every element of `sweep` into `dir`, creating it if needed.
    ///
    /// The whole sweep is rendered before the first file is written, so a serialization
    /// failure leaves `dir` untouched.
    pub fn write(&self, sweep: &Sweep, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, SweepError> {
        let dir = dir.as_ref();
        let rendered = sweep
            .iter()
            .map(|set| self.render(set))
            .collect::<Result<Vec<_>, _>>()?;

        log::info!("Writing {} sweep elements to {}", rendered.len(), dir.display());
        fs::create_dir_all(dir)?;

        let mut written = Vec::with_capacity(rendered.len());
        for (index, text) in rendered.into_iter().enumerate() {
            let path = dir.join(self.file_name(index));
            log::debug!("Writing sweep element {index} to {}", path.display());
            fs::write(&path, text)?;
            written.push(path);
        }

        log::info!("Finished writing sweep to {}", dir.display());
        Ok(written)
    }

    pub fn read(&self, path: impl AsRef<Path>) -> Result<OverrideSet, SweepError> {
        let text = fs::read_to_string(path)?;
        self.parse(&text)
    }
}

/// Reads one sweep element written with default settings.
pub fn read_override_set(path: impl AsRef<Path>) -> Result<OverrideSet, SweepError> {
    SweepWriter::default().read(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sweep::{discrete, product};

    fn sweep() -> Sweep {
        product([
            discrete(["model", "act"], vec!["relu", "tanh"]),
            discrete("lr", vec![0.1, 0.2]),
        ])
    }

    #[test]
    fn writes_one_file_per_element() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("sweep");
        let sweep = sweep();

        let paths = SweepWriter::default().write(&sweep, &out).unwrap();
        assert_eq!(paths.len(), 4);
        assert_eq!(paths[3], out.join("3.json"));

        let text = fs::read_to_string(&paths[0]).unwrap();
        assert_eq!(
            text,
            r#"[{"node":["model","act"],"value":"relu"},{"node":["lr"],"value":0.1}]"#
        );
        for (path, set) in paths.iter().zip(sweep.iter()) {
            assert_eq!(&read_override_set(path).unwrap(), set);
        }
    }

    #[test]
    fn replacements_are_a_consumer_setting() {
        let writer = SweepWriter::new(OutputSettings {
            extension: "txt".to_owned(),
            replace: vec![Replacement::new("\"", "'")],
            ..Default::default()
        });
        let sweep = sweep();
        let set = &sweep[0];
        let text = writer.render(set).unwrap();
        assert!(!text.contains('"'));
        assert!(text.starts_with("[{'node':['model','act']"));
        assert_eq!(&writer.parse(&text).unwrap(), set);
        assert_eq!(writer.file_name(2), "2.txt");
    }

    #[test]
    fn replacement_clashing_with_content_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SweepWriter::new(OutputSettings {
            replace: vec![Replacement::new("\"", "'")],
            ..Default::default()
        });
        let sweep = Sweep::new(vec![
            OverrideSet::single("name", "plain"),
            OverrideSet::single("name", "it's"),
        ]);

        let set = &sweep[0];
        assert_eq!(&writer.parse(&writer.render(set).unwrap()).unwrap(), set);

        let err = writer.render(&sweep[1]).unwrap_err();
        assert!(matches!(
            err,
            SweepError::IrreversibleReplacement { ref to, .. } if to == "'"
        ));
        let out = dir.path().join("sweep");
        assert!(writer.write(&sweep, &out).is_err());
        assert!(!out.exists());
    }

    #[test]
    fn pretty_output_still_parses() {
        let writer = SweepWriter::new(OutputSettings {
            pretty: true,
            ..Default::default()
        });
        let sweep = sweep();
        let set = &sweep[1];
        let text = writer.render(set).unwrap();
        assert!(text.contains('\n'));
        assert_eq!(&writer.parse(&text).unwrap(), set);
    }
}
