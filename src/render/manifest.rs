// src/render/manifest.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::write::{chunk_dir, unit_path, write_atomic};
use crate::{
    error::GenError,
    plan::{RenderPlan, UnitDataType, UnitTarget},
};

pub const MANIFEST_FILE: &str = "manifest.json";

/// One written chunk script and the identifiers it covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkEntry {
    pub data_type: String,
    pub chunk_index: usize,
    pub table_name: String,
    pub file: String,
    pub identifiers: Vec<String>,
}

/// Index of every chunk script written for one output name, so executors
/// can check that each identifier is covered exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkManifest {
    pub outfile: String,
    pub generated_at: DateTime<Utc>,
    pub chunks: Vec<ChunkEntry>,
}

impl ChunkManifest {
    /// `None` when the plan has no chunked units.
    pub fn from_plan(plan: &RenderPlan, outfile: &str) -> Option<Self> {
        let chunks: Vec<ChunkEntry> = plan
            .chunked
            .iter()
            .flat_map(|unit| {
                let file = match &unit.target {
                    UnitTarget::Chunk { .. } => unit_path(Path::new(""), outfile, &unit.target)
                        .file_name()
                        .map(|f| f.to_string_lossy().into_owned()),
                    UnitTarget::Combined => None,
                };
                unit.data_types.iter().filter_map(move |d| match d {
                    UnitDataType::Chunk(c) => Some(ChunkEntry {
                        data_type: c.source_name.clone(),
                        chunk_index: c.chunk_index,
                        table_name: c.config.table_name.clone(),
                        file: file.clone().unwrap_or_default(),
                        identifiers: c.identifiers.clone(),
                    }),
                    UnitDataType::Whole(_) => None,
                })
            })
            .collect();

        (!chunks.is_empty()).then(|| Self {
            outfile: outfile.to_string(),
            generated_at: Utc::now(),
            chunks,
        })
    }

    /// Write `manifest.json` next to the chunk scripts.
    pub fn write(&self, output_dir: &Path) -> Result<std::path::PathBuf, GenError> {
        let path = chunk_dir(output_dir, &self.outfile).join(MANIFEST_FILE);
        let mut json = serde_json::to_vec_pretty(self)
            .map_err(|e| GenError::io(&path, std::io::Error::other(e)))?;
        json.push(b'\n');
        write_atomic(&path, &json)?;
        Ok(path)
    }
}
