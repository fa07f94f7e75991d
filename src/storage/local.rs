// src/storage/local.rs

use glob::{glob, Pattern};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::ObjectLister;
use crate::error::GenError;

/// Treats a local directory as an object store: `root/bucket` is the bucket
/// and keys are `/`-separated paths relative to it.
pub struct LocalLister {
    root: PathBuf,
}

impl LocalLister {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn bucket_dir(&self, bucket: &str) -> PathBuf {
        if bucket.is_empty() {
            self.root.clone()
        } else {
            self.root.join(bucket)
        }
    }
}

impl ObjectLister for LocalLister {
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        suffix: &str,
    ) -> Result<Vec<String>, GenError> {
        let bucket_dir = self.bucket_dir(bucket);
        let location = format!("{}/{}", bucket_dir.display(), prefix);
        if !bucket_dir.is_dir() {
            return Err(GenError::storage(location, "bucket directory does not exist"));
        }

        // `*` in glob does not cross `/`.
        let pattern = format!(
            "{}/{}*{}",
            Pattern::escape(&bucket_dir.display().to_string()).trim_end_matches('/'),
            Pattern::escape(prefix),
            Pattern::escape(suffix)
        );
        let entries = glob(&pattern).map_err(|e| GenError::storage(&location, e))?;

        let mut keys = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| GenError::storage(&location, e))?;
            if !path.is_file() {
                continue;
            }
            if let Some(key) = object_key(&bucket_dir, &path) {
                keys.push(key);
            }
        }
        debug!(pattern = %pattern, keys = keys.len(), "listed local objects");
        Ok(keys)
    }
}

fn object_key(bucket_dir: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(bucket_dir).ok()?;
    let parts: Vec<&str> = rel.iter().map(|p| p.to_str()).collect::<Option<_>>()?;
    Some(parts.join("/"))
}
