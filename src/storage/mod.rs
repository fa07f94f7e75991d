// src/storage/mod.rs

use std::collections::BTreeSet;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::GenError;

pub mod gcs;
pub mod local;

pub use gcs::GcsLister;
pub use local::LocalLister;

/// Read-only object listing. Implementations return every key in `bucket`
/// that starts with `prefix` and ends with `suffix`; they may return extra
/// keys, which [`list_identifiers`] filters out.
#[allow(async_fn_in_trait)]
pub trait ObjectLister {
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        suffix: &str,
    ) -> Result<Vec<String>, GenError>;
}

/// Bare identifiers for every `{prefix}*{suffix}` object in `bucket`.
///
/// The set is sorted so chunk membership is stable between runs over the
/// same listing. A key only yields an identifier when the part between
/// prefix and suffix is non-empty and stays within one path segment.
pub async fn list_identifiers<L: ObjectLister>(
    lister: &L,
    bucket: &str,
    prefix: &str,
    suffix: &str,
) -> Result<BTreeSet<String>, GenError> {
    let keys = lister.list_objects(bucket, prefix, suffix).await?;
    let total = keys.len();

    let ids: BTreeSet<String> = keys
        .iter()
        .filter_map(|key| strip_identifier(key, prefix, suffix))
        .map(str::to_string)
        .collect();

    let skipped = keys
        .iter()
        .filter(|k| strip_identifier(k, prefix, suffix).is_none())
        .count();
    if skipped > 0 {
        warn!(bucket, prefix, suffix, skipped, "ignored keys that do not match pattern");
    }
    debug!(bucket, prefix, suffix, keys = total, identifiers = ids.len(), "listed identifiers");
    Ok(ids)
}

fn strip_identifier<'a>(key: &'a str, prefix: &str, suffix: &str) -> Option<&'a str> {
    let id = key.strip_prefix(prefix)?.strip_suffix(suffix)?;
    if id.is_empty() || id.contains('/') {
        None
    } else {
        Some(id)
    }
}

/// A base prefix split into backend, bucket and key prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLocation {
    pub scheme: Scheme,
    pub bucket: String,
    pub prefix: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Gcs,
    File,
}

impl StorageLocation {
    /// Parse `gs://bucket/some/prefix/` or `file:///abs/dir/`.
    ///
    /// The prefix always ends in `/` (or is empty), so identifiers strip
    /// cleanly whether or not the setting carried the trailing slash. GCS
    /// prefixes are taken verbatim since object names are not URL encoded.
    /// For `file://` locations the bucket is empty and the prefix is the
    /// decoded absolute path without its leading slash, so a [`LocalLister`]
    /// rooted at `/` resolves it.
    pub fn parse(base_prefix: &str) -> Result<Self, GenError> {
        let invalid = |reason: String| GenError::InvalidSetting {
            key: "base_prefix".into(),
            reason: format!("{}: {}", base_prefix, reason),
        };

        if let Some(rest) = base_prefix.strip_prefix("gs://") {
            let (bucket, path) = rest.split_once('/').unwrap_or((rest, ""));
            if bucket.is_empty() {
                return Err(invalid("missing bucket".into()));
            }
            return Ok(Self {
                scheme: Scheme::Gcs,
                bucket: bucket.to_string(),
                prefix: dir_prefix(path),
            });
        }

        let url = Url::parse(base_prefix).map_err(|e| invalid(e.to_string()))?;
        match url.scheme() {
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| invalid("file URL must be absolute with no host".into()))?;
                let path = path
                    .to_str()
                    .ok_or_else(|| invalid("path is not valid UTF-8".into()))?;
                Ok(Self {
                    scheme: Scheme::File,
                    bucket: String::new(),
                    prefix: dir_prefix(path.trim_start_matches('/')),
                })
            }
            other => Err(invalid(format!("unsupported scheme `{}`", other))),
        }
    }
}

/// `path` with exactly one trailing `/`, or empty for the bucket root.
pub(crate) fn dir_prefix(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}

impl std::fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.scheme {
            Scheme::Gcs => write!(f, "gs://{}/{}", self.bucket, self.prefix),
            Scheme::File => write!(f, "file:///{}", self.prefix),
        }
    }
}

/// Lister picked from a location's scheme.
pub enum Backend {
    Gcs(GcsLister),
    Local(LocalLister),
}

impl Backend {
    pub fn for_location(location: &StorageLocation) -> Self {
        info!(location = %location, "using storage backend");
        match location.scheme {
            Scheme::Gcs => Backend::Gcs(GcsLister::new()),
            Scheme::File => Backend::Local(LocalLister::new("/")),
        }
    }
}

impl ObjectLister for Backend {
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        suffix: &str,
    ) -> Result<Vec<String>, GenError> {
        match self {
            Backend::Gcs(l) => l.list_objects(bucket, prefix, suffix).await,
            Backend::Local(l) => l.list_objects(bucket, prefix, suffix).await,
        }
    }
}
