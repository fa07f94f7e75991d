// src/config/settings.rs

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::info;

use crate::error::GenError;

/// Which samples the generated SQL should read.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawSamples", into = "RawSamples")]
pub enum SampleSelection {
    /// `"*"`: every sample under the base prefix.
    #[default]
    All,
    Listed(Vec<String>),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawSamples {
    One(String),
    Many(Vec<String>),
}

impl TryFrom<RawSamples> for SampleSelection {
    type Error = String;

    fn try_from(raw: RawSamples) -> Result<Self, Self::Error> {
        match raw {
            RawSamples::One(s) if s == "*" => Ok(SampleSelection::All),
            RawSamples::One(s) => Err(format!(
                "expected \"*\" or a list of sample ids, got {:?}",
                s
            )),
            RawSamples::Many(ids) => SampleSelection::from_ids(ids),
        }
    }
}

impl From<SampleSelection> for RawSamples {
    fn from(s: SampleSelection) -> Self {
        match s {
            SampleSelection::All => RawSamples::One("*".into()),
            SampleSelection::Listed(ids) => RawSamples::Many(ids),
        }
    }
}

impl SampleSelection {
    /// Parse a CLI value: `*` or comma-separated ids, with the same rules as
    /// the settings file.
    pub fn parse(s: &str) -> Result<Self, GenError> {
        let ids: Vec<String> = s
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(String::from)
            .collect();
        Self::from_ids(ids).map_err(|reason| GenError::InvalidSetting {
            key: "samples".into(),
            reason,
        })
    }

    /// A lone `*` means every sample. An empty list is refused since it
    /// would read every sample without chunking.
    fn from_ids(ids: Vec<String>) -> Result<Self, String> {
        if ids.is_empty() {
            Err("sample list is empty; use \"*\" for every sample".into())
        } else if ids == ["*"] {
            Ok(SampleSelection::All)
        } else if ids.iter().any(|id| id == "*") {
            Err("\"*\" cannot be mixed with explicit sample ids".into())
        } else {
            Ok(SampleSelection::Listed(ids))
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, SampleSelection::All)
    }

    /// Ids as SQL string literals for `IN (...)` lists; `None` for all samples.
    pub fn quoted(&self) -> Option<Vec<String>> {
        match self {
            SampleSelection::All => None,
            SampleSelection::Listed(ids) => Some(
                ids.iter()
                    .map(|id| format!("'{}'", id.replace('\'', "''")))
                    .collect(),
            ),
        }
    }
}

/// Run-level parameters shared by every rendered script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSettings {
    /// HMAC key id placeholder for the storage secret.
    pub key_id: String,
    pub secret: String,
    /// Where result objects live, e.g. `gs://bucket/results/cMDv4/`.
    pub base_prefix: String,
    /// Directory the generated SQL writes parquet files into.
    pub outfile_prefix: String,
    pub temp_directory: String,
    pub memory_limit: String,
    pub threads: u32,
    pub samples: SampleSelection,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            key_id: "KEY_ID".into(),
            secret: "SECRET".into(),
            base_prefix: "gs://metagenomics-mac/results/cMDv4/".into(),
            outfile_prefix: "/shares/CIBIO-Storage/CM/scratch/users/kaelyn.long/retrieve/parquets/"
                .into(),
            temp_directory: "/tmp/duckdb_tmp".into(),
            memory_limit: "32GB".into(),
            threads: 8,
            samples: SampleSelection::All,
        }
    }
}

impl RunSettings {
    /// Load settings from YAML; missing keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GenError> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|e| GenError::config(&shown, e))?;
        let settings: RunSettings = if text.trim().is_empty() {
            RunSettings::default()
        } else {
            serde_yaml::from_str(&text).map_err(|e| GenError::config(&shown, e))?
        };
        settings.validate()?;
        info!(path = %path.display(), base_prefix = %settings.base_prefix, "loaded run settings");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), GenError> {
        if self.threads == 0 {
            return Err(GenError::InvalidSetting {
                key: "threads".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.base_prefix.trim().is_empty() {
            return Err(GenError::InvalidSetting {
                key: "base_prefix".into(),
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_fill_missing_keys() {
        let s: RunSettings = serde_yaml::from_str("threads: 2\nsamples: ['a', 'b']\n").unwrap();
        assert_eq!(s.threads, 2);
        assert_eq!(s.key_id, "KEY_ID");
        assert_eq!(s.samples, SampleSelection::Listed(vec!["a".into(), "b".into()]));
    }

    #[test]
    fn wildcard_samples() {
        let s: RunSettings = serde_yaml::from_str("samples: '*'\n").unwrap();
        assert!(s.samples.is_all());
        assert!(serde_yaml::from_str::<RunSettings>("samples: abc\n").is_err());
        assert!(serde_yaml::from_str::<RunSettings>("samples: ['*', 'a']\n").is_err());
    }

    #[test]
    fn empty_sample_list_is_rejected() {
        let err = serde_yaml::from_str::<RunSettings>("samples: []\n").unwrap_err();
        assert!(err.to_string().contains("sample list is empty"), "{}", err);

        let err = SampleSelection::parse(" , ").unwrap_err();
        assert!(matches!(err, GenError::InvalidSetting { ref key, .. } if key == "samples"));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_yaml::from_str::<RunSettings>("thread: 2\n").is_err());
    }

    #[test]
    fn parse_cli_samples() {
        assert_eq!(SampleSelection::parse("*").unwrap(), SampleSelection::All);
        assert_eq!(SampleSelection::parse(" * ").unwrap(), SampleSelection::All);
        assert_eq!(
            SampleSelection::parse("a, b,,c").unwrap(),
            SampleSelection::Listed(vec!["a".into(), "b".into(), "c".into()])
        );
    }

    #[test]
    fn cli_and_yaml_agree_on_mixed_wildcard() {
        assert!(SampleSelection::parse("a,*").is_err());
        assert!(SampleSelection::parse("").is_err());
        assert!(serde_yaml::from_str::<RunSettings>("samples: ['a', '*']\n").is_err());
    }

    #[test]
    fn quoted_ids() {
        assert_eq!(SampleSelection::All.quoted(), None);
        assert_eq!(
            SampleSelection::Listed(vec!["x".into()]).quoted(),
            Some(vec!["'x'".to_string()])
        );
        assert_eq!(
            SampleSelection::Listed(vec!["o'brien".into()]).quoted(),
            Some(vec!["'o''brien'".to_string()])
        );
    }

    #[test]
    fn load_validates() -> anyhow::Result<()> {
        let mut tmp = NamedTempFile::new()?;
        writeln!(tmp, "threads: 0")?;
        let err = RunSettings::load(tmp.path()).unwrap_err();
        assert!(matches!(err, GenError::InvalidSetting { ref key, .. } if key == "threads"));

        let empty = NamedTempFile::new()?;
        assert_eq!(RunSettings::load(empty.path())?, RunSettings::default());
        Ok(())
    }
}
