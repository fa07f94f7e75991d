// Usage:
//   sqlgen [OUTFILE] [--config ...] [--settings ...] [--data-types a,b] [--samples '*']

use anyhow::{Context, Result};
use clap::Parser;
use sqlgen::{
    config::{Catalog, RunSettings, SampleSelection},
    generate::{generate, GenerateOptions},
    plan::Selection,
    render::{Renderer, DEFAULT_TEMPLATE},
    storage::{Backend, StorageLocation},
    GenError,
};
use std::{path::PathBuf, process::ExitCode};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Generate DuckDB SQL scripts that pull result files into parquet.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Base name of the generated script(s).
    #[arg(default_value = "generated_script")]
    outfile: String,

    /// Data-type catalog.
    #[arg(long, default_value = "config/metaphlan_configs.yaml")]
    config: PathBuf,

    /// Run settings (credentials placeholders, prefixes, limits).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Template directory.
    #[arg(long, default_value = "templates")]
    templates: PathBuf,

    /// Template file inside the template directory.
    #[arg(long, default_value = DEFAULT_TEMPLATE)]
    template: String,

    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Comma-separated data types, or `*` for the whole catalog.
    #[arg(long, default_value = "*")]
    data_types: String,

    /// Comma-separated sample ids, or `*`; overrides the settings file.
    #[arg(long)]
    samples: Option<String>,

    /// Plan and render without writing files.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlgen=info"));
    fmt::Subscriber::builder().with_env_filter(env).with_target(false).init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            let code = err.downcast_ref::<GenError>().map_or(1, GenError::exit_code);
            ExitCode::from(code)
        }
    }
}

async fn run(args: Args) -> Result<()> {
    info!(outfile = %args.outfile, "startup");

    // ─── 2) load catalog + settings ──────────────────────────────────
    let catalog = Catalog::load(&args.config)?;
    let mut settings = match &args.settings {
        Some(path) => RunSettings::load(path)?,
        None => RunSettings::default(),
    };
    if let Some(samples) = &args.samples {
        settings.samples = SampleSelection::parse(samples)?;
    }
    settings.validate()?;
    let selection = Selection::parse(&args.data_types);

    // ─── 3) storage backend for identifier listing ───────────────────
    let location = StorageLocation::parse(&settings.base_prefix)?;
    let lister = Backend::for_location(&location);

    // ─── 4) plan, render, write ──────────────────────────────────────
    let renderer = Renderer::from_dir(&args.templates);
    let opts = GenerateOptions {
        outfile: args.outfile.clone(),
        output_dir: args.output_dir.clone(),
        template: args.template.clone(),
        dry_run: args.dry_run,
    };
    let summary = generate(&catalog, &selection, &settings, &renderer, &lister, &opts)
        .await
        .with_context(|| format!("generating {}", args.outfile))?;

    for name in &summary.demoted {
        warn!(data_type = %name, "chunk_samples ignored because samples were listed explicitly");
    }
    for name in &summary.empty {
        warn!(data_type = %name, "no identifiers found; no scripts written for this type");
    }
    info!(
        files = summary.written.len(),
        chunk_files = summary.chunk_files,
        "all done"
    );
    Ok(())
}
