use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failure to extract a metadata record from a file.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid header in {}: {reason}", .path.display())]
    InvalidHeader { path: PathBuf, reason: String },
}

/// Everything that can go wrong while organizing a tree.
///
/// Only `InvalidRoot` aborts a run.
/// The other variants are recorded per file or per directory.
#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error("root path does not exist or is not a directory: {}", .0.display())]
    InvalidRoot(PathBuf),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error("{unknown} critical header fields are unknown (threshold {threshold})")]
    LowQualityMetadata { unknown: usize, threshold: usize },

    #[error("failed to create destination {}: {reason}", .path.display())]
    DestinationCreate { path: PathBuf, reason: String },

    #[error("no free file name for {} after {attempts} attempts", .path.display())]
    CollisionExhausted { path: PathBuf, attempts: usize },

    #[error("failed to move {} to {}: {source}", .path.display(), .target.display())]
    Move {
        path: PathBuf,
        target: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to delete directory {}: {source}", .path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl OrganizeError {
    /// File or directory the error refers to, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::InvalidRoot(path)
            | Self::DestinationCreate { path, .. }
            | Self::CollisionExhausted { path, .. }
            | Self::Move { path, .. }
            | Self::Cleanup { path, .. } => Some(path.as_path()),
            Self::Read(ReadError::Io { path, .. } | ReadError::InvalidHeader { path, .. }) => Some(path.as_path()),
            Self::LowQualityMetadata { .. } => None,
        }
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn read_errors_convert_and_keep_path() {
        let error: OrganizeError = ReadError::InvalidHeader {
            path: PathBuf::from("night/LIGHT/light_0001.fits"),
            reason: "missing END card".to_string(),
        }
        .into();
        assert_eq!(error.path(), Some(Path::new("night/LIGHT/light_0001.fits")));
        assert_eq!(
            error.to_string(),
            "invalid header in night/LIGHT/light_0001.fits: missing END card"
        );
    }

    #[test]
    fn low_quality_has_no_path() {
        let error = OrganizeError::LowQualityMetadata { unknown: 3, threshold: 2 };
        assert!(error.path().is_none());
        assert_eq!(error.to_string(), "3 critical header fields are unknown (threshold 2)");
    }
}
