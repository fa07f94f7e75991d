// src/plan/mod.rs

use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::{
    config::{Catalog, ChunkedDataTypeConfig, DataTypeConfig, RunSettings},
    error::GenError,
    storage::{dir_prefix, list_identifiers, ObjectLister, StorageLocation},
};

pub mod chunk;

pub use chunk::partition;

/// Which catalog entries a run renders.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    All,
    Named(BTreeSet<String>),
}

impl Selection {
    /// `*` selects everything; otherwise a comma-separated list of names.
    pub fn parse(s: &str) -> Self {
        let names: BTreeSet<String> = s
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from)
            .collect();
        if names.is_empty() || names.contains("*") {
            Selection::All
        } else {
            Selection::Named(names)
        }
    }
}

/// Catalog entries picked by `selection`, in catalog order.
///
/// Every named entry must exist; all missing names are reported together.
pub fn select<'a>(
    catalog: &'a Catalog,
    selection: &Selection,
) -> Result<Vec<&'a DataTypeConfig>, GenError> {
    match selection {
        Selection::All => Ok(catalog.iter().collect()),
        Selection::Named(names) => {
            let missing: Vec<String> = names
                .iter()
                .filter(|n| catalog.get(n).is_none())
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(GenError::UnknownDataType(missing));
            }
            Ok(catalog.iter().filter(|c| names.contains(&c.name)).collect())
        }
    }
}

/// Run-level template parameters, identical for every unit of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SharedParams {
    pub outfile: String,
    pub key_id: String,
    pub secret: String,
    pub base_prefix: String,
    pub outfile_prefix: String,
    pub temp_directory: String,
    pub memory_limit: String,
    pub threads: u32,
    /// Quoted sample ids, or `None` when every sample is read.
    pub sample_ids: Option<Vec<String>>,
    pub generated_at: String,
}

impl SharedParams {
    pub fn new(settings: &RunSettings, outfile: &str) -> Self {
        Self {
            outfile: outfile.to_string(),
            key_id: settings.key_id.clone(),
            secret: settings.secret.clone(),
            base_prefix: dir_prefix(&settings.base_prefix),
            outfile_prefix: settings.outfile_prefix.clone(),
            temp_directory: settings.temp_directory.clone(),
            memory_limit: settings.memory_limit.clone(),
            threads: settings.threads,
            sample_ids: settings.samples.quoted(),
            generated_at: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UnitDataType {
    Whole(DataTypeConfig),
    Chunk(ChunkedDataTypeConfig),
}

/// Which output file a unit renders into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitTarget {
    /// The single script covering all non-chunked types.
    Combined,
    Chunk { data_type: String, index: usize },
}

/// Everything the template sees for one output file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderUnit {
    #[serde(skip)]
    pub target: UnitTarget,
    #[serde(flatten)]
    pub shared: SharedParams,
    pub chunked: bool,
    pub data_types: Vec<UnitDataType>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderPlan {
    /// One unit per chunk, grouped by data type in catalog order.
    pub chunked: Vec<RenderUnit>,
    pub combined: Option<RenderUnit>,
    /// Chunk-flagged types rendered unchunked because samples were listed explicitly.
    pub demoted: Vec<String>,
    /// Chunk-flagged types whose listing found no identifiers; nothing is rendered for them.
    pub empty: Vec<String>,
}

impl RenderPlan {
    pub fn units(&self) -> impl Iterator<Item = &RenderUnit> {
        self.combined.iter().chain(self.chunked.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.combined.is_none() && self.chunked.is_empty()
    }
}

/// Build every render unit for a run.
///
/// Chunk-flagged types are listed and partitioned only when the run reads all
/// samples. With an explicit sample list they are demoted into the combined
/// script and reported. Any listing failure aborts the whole plan.
pub async fn plan<L: ObjectLister>(
    catalog: &Catalog,
    selection: &Selection,
    settings: &RunSettings,
    outfile: &str,
    lister: &L,
) -> Result<RenderPlan, GenError> {
    let selected = select(catalog, selection)?;
    let shared = SharedParams::new(settings, outfile);

    let mut to_chunk = Vec::new();
    let mut whole = Vec::new();
    let mut demoted = Vec::new();
    for config in selected {
        if !config.chunk_samples {
            whole.push(config.clone());
        } else if settings.samples.is_all() {
            to_chunk.push(config);
        } else {
            warn!(
                data_type = %config.name,
                "chunking requested but samples are listed explicitly; rendering unchunked"
            );
            demoted.push(config.name.clone());
            whole.push(config.clone());
        }
    }

    let mut chunked = Vec::new();
    let mut empty = Vec::new();
    if !to_chunk.is_empty() {
        let location = StorageLocation::parse(&settings.base_prefix)?;
        for config in to_chunk {
            let units = chunk_units(config, &location, &shared, lister).await?;
            if units.is_empty() {
                empty.push(config.name.clone());
            }
            chunked.extend(units);
        }
    }

    let combined = (!whole.is_empty()).then(|| RenderUnit {
        target: UnitTarget::Combined,
        shared: shared.clone(),
        chunked: false,
        data_types: whole.into_iter().map(UnitDataType::Whole).collect(),
    });

    info!(
        chunk_units = chunked.len(),
        combined = combined.is_some(),
        demoted = demoted.len(),
        empty = empty.len(),
        "planned render"
    );
    Ok(RenderPlan {
        chunked,
        combined,
        demoted,
        empty,
    })
}

async fn chunk_units<L: ObjectLister>(
    config: &DataTypeConfig,
    location: &StorageLocation,
    shared: &SharedParams,
    lister: &L,
) -> Result<Vec<RenderUnit>, GenError> {
    let ids: Vec<String> = list_identifiers(
        lister,
        &location.bucket,
        &location.prefix,
        &config.input_path_suffix,
    )
    .await?
    .into_iter()
    .collect();

    if ids.is_empty() {
        warn!(
            data_type = %config.name,
            location = %location,
            "no identifiers found; nothing to chunk"
        );
        return Ok(Vec::new());
    }

    let groups = partition(&ids, config.chunk_size);
    info!(
        "{} will be chunked into size ~{} ({} identifiers, {} chunks)",
        config.name,
        groups[0].len(),
        ids.len(),
        groups.len()
    );

    Ok(groups
        .into_iter()
        .enumerate()
        .map(|(index, identifiers)| RenderUnit {
            target: UnitTarget::Chunk {
                data_type: config.name.clone(),
                index,
            },
            shared: shared.clone(),
            chunked: true,
            data_types: vec![UnitDataType::Chunk(config.specialize(index, identifiers))],
        })
        .collect())
}
