// src/generate.rs

use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use crate::{
    config::{Catalog, RunSettings},
    error::GenError,
    plan::{plan, RenderPlan, Selection, UnitTarget},
    render::{unit_path, write_atomic, ChunkManifest, Renderer},
    storage::ObjectLister,
};

/// Where and how one run writes its scripts.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub outfile: String,
    pub output_dir: PathBuf,
    pub template: String,
    /// Plan and render, but write nothing.
    pub dry_run: bool,
}

#[derive(Debug, Default)]
pub struct GenerateSummary {
    pub written: Vec<PathBuf>,
    pub chunk_files: usize,
    pub demoted: Vec<String>,
    /// Chunk-flagged types skipped because no identifiers were listed.
    pub empty: Vec<String>,
}

/// Plan, render and write every script for one run.
///
/// All planning (including every storage listing) and rendering finish before
/// the first file is written, so a storage or template failure leaves the
/// output directory untouched.
#[instrument(level = "info", skip_all, fields(outfile = %opts.outfile))]
pub async fn generate<L: ObjectLister>(
    catalog: &Catalog,
    selection: &Selection,
    settings: &RunSettings,
    renderer: &Renderer,
    lister: &L,
    opts: &GenerateOptions,
) -> Result<GenerateSummary, GenError> {
    let plan = plan(catalog, selection, settings, &opts.outfile, lister).await?;
    if plan.is_empty() {
        warn!("nothing selected to render");
    }

    let rendered = render_all(&plan, renderer, &opts.template, &opts.output_dir, &opts.outfile)?;
    let manifest = ChunkManifest::from_plan(&plan, &opts.outfile);

    let mut summary = GenerateSummary {
        demoted: plan.demoted.clone(),
        empty: plan.empty.clone(),
        chunk_files: plan.chunked.len(),
        ..Default::default()
    };

    if opts.dry_run {
        for (path, text) in &rendered {
            info!(path = %path.display(), bytes = text.len(), "dry run; not writing");
        }
        return Ok(summary);
    }

    for (path, text) in rendered {
        write_atomic(&path, text.as_bytes())?;
        info!(path = %path.display(), "wrote script");
        summary.written.push(path);
    }
    if let Some(manifest) = manifest {
        let path = manifest.write(&opts.output_dir)?;
        info!(path = %path.display(), chunks = manifest.chunks.len(), "wrote chunk manifest");
        summary.written.push(path);
    }
    Ok(summary)
}

fn render_all(
    plan: &RenderPlan,
    renderer: &Renderer,
    template: &str,
    output_dir: &Path,
    outfile: &str,
) -> Result<Vec<(PathBuf, String)>, GenError> {
    plan.units()
        .map(|unit| {
            let text = renderer.render(template, unit)?;
            if let UnitTarget::Chunk { data_type, index } = &unit.target {
                info!(data_type = %data_type, index, "rendered chunk");
            }
            Ok((unit_path(output_dir, outfile, &unit.target), text))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testing::FakeLister;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    const CATALOG: &str = r#"
relative_abundance:
  input_path_suffix: /metaphlan_lists/metaphlan_bugs_list.tsv.gz
  table_name: relative_abundance
genefamilies:
  input_path_suffix: /humann/out_genefamilies.tsv.gz
  table_name: genefamilies
  chunk_samples: true
  chunk_size: 2
"#;

    const TEMPLATE: &str = "{% for dt in data_types %}{{ dt.table_name }}\n{% endfor %}";

    fn setup(dir: &Path, dry_run: bool) -> (Catalog, RunSettings, Renderer, GenerateOptions) {
        let catalog = Catalog::from_yaml(CATALOG).unwrap();
        let settings = RunSettings {
            base_prefix: "gs://bucket/results/".into(),
            ..RunSettings::default()
        };
        let renderer = Renderer::from_source("t", TEMPLATE).unwrap();
        let opts = GenerateOptions {
            outfile: "run".into(),
            output_dir: dir.to_path_buf(),
            template: "t".into(),
            dry_run,
        };
        (catalog, settings, renderer, opts)
    }

    fn lister() -> FakeLister {
        FakeLister::default().with(
            "bucket",
            "/humann/out_genefamilies.tsv.gz",
            &[
                "results/u1/humann/out_genefamilies.tsv.gz",
                "results/u2/humann/out_genefamilies.tsv.gz",
                "results/u3/humann/out_genefamilies.tsv.gz",
            ],
        )
    }

    #[tokio::test]
    async fn writes_combined_chunks_and_manifest() -> Result<()> {
        let dir = tempdir()?;
        let (catalog, settings, renderer, opts) = setup(dir.path(), false);

        let summary =
            generate(&catalog, &Selection::All, &settings, &renderer, &lister(), &opts).await?;
        assert_eq!(summary.chunk_files, 2);
        assert_eq!(summary.written.len(), 4);

        let out = dir.path();
        assert_eq!(fs::read_to_string(out.join("run.sql"))?, "relative_abundance\n");
        assert_eq!(
            fs::read_to_string(out.join("run_chunked/genefamilies_chunk0_chunked.sql"))?,
            "genefamilies_chunk0\n"
        );
        assert_eq!(
            fs::read_to_string(out.join("run_chunked/genefamilies_chunk1_chunked.sql"))?,
            "genefamilies_chunk1\n"
        );
        assert!(out.join("run_chunked/manifest.json").is_file());
        Ok(())
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() -> Result<()> {
        let dir = tempdir()?;
        let (catalog, settings, renderer, opts) = setup(dir.path(), true);

        let summary =
            generate(&catalog, &Selection::All, &settings, &renderer, &lister(), &opts).await?;
        assert!(summary.written.is_empty());
        assert_eq!(summary.chunk_files, 2);
        assert_eq!(fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn empty_listing_is_reported() -> Result<()> {
        let dir = tempdir()?;
        let (catalog, settings, renderer, opts) = setup(dir.path(), false);

        let summary = generate(
            &catalog,
            &Selection::All,
            &settings,
            &renderer,
            &FakeLister::default(),
            &opts,
        )
        .await?;
        assert_eq!(summary.empty, ["genefamilies"]);
        assert_eq!(summary.chunk_files, 0);
        assert_eq!(fs::read_to_string(dir.path().join("run.sql"))?, "relative_abundance\n");
        assert!(!dir.path().join("run_chunked").exists());
        Ok(())
    }

    #[tokio::test]
    async fn storage_failure_writes_nothing() -> Result<()> {
        let dir = tempdir()?;
        let (catalog, settings, renderer, opts) = setup(dir.path(), false);

        let err = generate(
            &catalog,
            &Selection::All,
            &settings,
            &renderer,
            &FakeLister::failing(),
            &opts,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GenError::StorageUnavailable { .. }));
        assert_eq!(fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn template_failure_writes_nothing() -> Result<()> {
        let dir = tempdir()?;
        let (catalog, settings, _, opts) = setup(dir.path(), false);
        let renderer = Renderer::from_source("t", "{{ missing }}")?;

        let err = generate(&catalog, &Selection::All, &settings, &renderer, &lister(), &opts)
            .await
            .unwrap_err();
        assert!(matches!(err, GenError::Template(_)));
        assert_eq!(fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }
}
