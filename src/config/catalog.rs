// src/config/catalog.rs

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::{collections::BTreeMap, fs, path::Path};
use tracing::{debug, info};

use crate::error::GenError;

pub const DEFAULT_CHUNK_SIZE: usize = 500;

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

/// One catalog entry: how a result file is named and where its rows land.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTypeConfig {
    /// Catalog key; filled in from the YAML mapping key.
    #[serde(default)]
    pub name: String,
    pub input_path_suffix: String,
    pub table_name: String,
    #[serde(default)]
    pub chunk_samples: bool,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Anything else in the entry (columns, read options, ...) is handed to the
    /// template untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A data type narrowed down to one chunk of its identifiers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkedDataTypeConfig {
    #[serde(flatten)]
    pub config: DataTypeConfig,
    /// Name of the data type this chunk was cut from.
    pub source_name: String,
    pub chunk_index: usize,
    pub identifiers: Vec<String>,
}

impl DataTypeConfig {
    /// Clone this config into chunk `index`, suffixing `name` and `table_name`.
    pub fn specialize(&self, index: usize, identifiers: Vec<String>) -> ChunkedDataTypeConfig {
        let mut config = self.clone();
        config.name = format!("{}_chunk{}", self.name, index);
        config.table_name = format!("{}_chunk{}", self.table_name, index);
        ChunkedDataTypeConfig {
            config,
            source_name: self.name.clone(),
            chunk_index: index,
            identifiers,
        }
    }
}

/// Data-type catalog in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    entries: Vec<DataTypeConfig>,
}

impl Catalog {
    /// Read and parse the catalog at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GenError> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|e| GenError::config(&shown, e))?;
        let catalog = Self::from_yaml(&text).map_err(|e| match e {
            GenError::ConfigLoad { reason, .. } => GenError::config(&shown, reason),
            other => other,
        })?;
        info!(path = %path.display(), data_types = catalog.len(), "loaded catalog");
        Ok(catalog)
    }

    /// Parse a catalog document: a mapping of data-type name → attributes.
    pub fn from_yaml(text: &str) -> Result<Self, GenError> {
        const SOURCE: &str = "<inline>";
        if text.trim().is_empty() {
            return Err(GenError::config(SOURCE, "document is empty"));
        }
        let raw: Mapping = serde_yaml::from_str(text).map_err(|e| GenError::config(SOURCE, e))?;

        let mut entries = Vec::with_capacity(raw.len());
        for (key, value) in raw {
            let name = key
                .as_str()
                .ok_or_else(|| {
                    GenError::config(SOURCE, format!("non-string data type key {:?}", key))
                })?
                .to_string();
            let mut config: DataTypeConfig = serde_yaml::from_value(value)
                .map_err(|e| GenError::config(SOURCE, format!("{}: {}", name, e)))?;
            if config.chunk_size == 0 {
                return Err(GenError::config(
                    SOURCE,
                    format!("{}: chunk_size must be > 0", name),
                ));
            }
            config.name = name;
            debug!(name = %config.name, chunked = config.chunk_samples, "catalog entry");
            entries.push(config);
        }
        Ok(Self { entries })
    }

    pub fn get(&self, name: &str) -> Option<&DataTypeConfig> {
        self.entries.iter().find(|c| c.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataTypeConfig> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<DataTypeConfig> for Catalog {
    fn from_iter<I: IntoIterator<Item = DataTypeConfig>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
