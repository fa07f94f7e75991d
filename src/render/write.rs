use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;

use crate::{error::GenError, plan::UnitTarget};

/// Directory holding the per-chunk scripts for `outfile`.
pub fn chunk_dir(output_dir: &Path, outfile: &str) -> PathBuf {
    output_dir.join(format!("{}_chunked", outfile))
}

/// Output path for a unit:
/// - combined → `<output_dir>/<outfile>.sql`
/// - chunk    → `<output_dir>/<outfile>_chunked/<data_type>_chunk<i>_chunked.sql`
pub fn unit_path(output_dir: &Path, outfile: &str, target: &UnitTarget) -> PathBuf {
    match target {
        UnitTarget::Combined => output_dir.join(format!("{}.sql", outfile)),
        UnitTarget::Chunk { data_type, index } => chunk_dir(output_dir, outfile)
            .join(format!("{}_chunk{}_chunked.sql", data_type, index)),
    }
}

/// Write `contents` to `path`, creating parent directories and replacing any
/// existing file. The bytes go to a temp file in the same directory first
/// and are renamed over `path`, so a reader never sees a half-written file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), GenError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| GenError::io(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| GenError::io(dir, e))?;
    tmp.write_all(contents).map_err(|e| GenError::io(path, e))?;
    tmp.as_file().sync_all().map_err(|e| GenError::io(path, e))?;
    tmp.persist(path).map_err(|e| GenError::io(path, e.error))?;
    Ok(())
}
