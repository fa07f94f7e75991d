use std::path::PathBuf;

use thiserror::Error;

/// Everything that can stop a generation run.
#[derive(Debug, Error)]
pub enum GenError {
    // ── Config ────────────────────────────────────────────────────────────────
    #[error("failed to load config {path}: {reason}")]
    ConfigLoad { path: String, reason: String },

    #[error("unknown data type(s): {}", .0.join(", "))]
    UnknownDataType(Vec<String>),

    #[error("invalid setting `{key}`: {reason}")]
    InvalidSetting { key: String, reason: String },

    // ── Storage ───────────────────────────────────────────────────────────────
    #[error("storage unavailable at {location}: {reason}")]
    StorageUnavailable { location: String, reason: String },

    // ── Output ────────────────────────────────────────────────────────────────
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GenError {
    /// Process exit code for this class of failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            GenError::ConfigLoad { .. }
            | GenError::UnknownDataType(_)
            | GenError::InvalidSetting { .. } => 2,
            GenError::StorageUnavailable { .. } => 3,
            GenError::Template(_) => 4,
            GenError::Io { .. } => 5,
        }
    }

    pub(crate) fn config(path: impl Into<String>, reason: impl ToString) -> Self {
        GenError::ConfigLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn storage(location: impl Into<String>, reason: impl ToString) -> Self {
        GenError::StorageUnavailable {
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GenError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct_per_category() {
        let codes = [
            GenError::config("c.yaml", "bad").exit_code(),
            GenError::storage("gs://b/p", "denied").exit_code(),
            GenError::Template(minijinja::Error::new(
                minijinja::ErrorKind::UndefinedError,
                "x",
            ))
            .exit_code(),
            GenError::io("out.sql", std::io::Error::other("disk full")).exit_code(),
        ];
        assert_eq!(codes, [2, 3, 4, 5]);
        assert_eq!(GenError::UnknownDataType(vec!["x".into()]).exit_code(), 2);
    }

    #[test]
    fn unknown_types_are_listed_in_message() {
        let err = GenError::UnknownDataType(vec!["foo".into(), "bar".into()]);
        assert_eq!(err.to_string(), "unknown data type(s): foo, bar");
    }
}
