// src/render/mod.rs

use minijinja::{path_loader, Environment, UndefinedBehavior};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

use crate::error::GenError;

pub mod manifest;
pub mod write;

pub use manifest::ChunkManifest;
pub use write::{unit_path, write_atomic};

pub const DEFAULT_TEMPLATE: &str = "metaphlan_humann_template.sql.j2";

/// Jinja renderer with block trimming and strict undefined handling, so a
/// template that references a missing parameter fails instead of emitting
/// empty SQL.
pub struct Renderer {
    env: Environment<'static>,
}

impl Renderer {
    /// Load templates lazily from `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let mut env = Self::base_env();
        env.set_loader(path_loader(dir.as_ref()));
        Self { env }
    }

    /// Register a single in-memory template.
    pub fn from_source(name: &str, source: &str) -> Result<Self, GenError> {
        let mut env = Self::base_env();
        env.add_template_owned(name.to_string(), source.to_string())?;
        Ok(Self { env })
    }

    fn base_env() -> Environment<'static> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.add_filter("sql_escape", sql_escape);
        env
    }

    pub fn render<S: Serialize>(&self, template_id: &str, params: &S) -> Result<String, GenError> {
        let template = self.env.get_template(template_id)?;
        let text = template.render(params)?;
        debug!(template = template_id, bytes = text.len(), "rendered");
        Ok(text)
    }
}

/// Double single quotes so a value can sit inside a SQL string literal.
fn sql_escape(value: String) -> String {
    value.replace('\'', "''")
}
