//! Error types for annex-core.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type covering every operation exposed by this crate.
///
/// Single-item operations surface the first error encountered. Batch
/// operations never abort early on a per-element failure; they collect
/// per-element errors (see [`Error::Aggregate`]) alongside whatever
/// partial results succeeded, and callers must inspect both.
#[derive(Debug, Error)]
pub enum Error {
    /// Engine property/handle setup failed during create or load.
    #[error("failed to create index properties: {0}")]
    CreateProperty(String),

    /// A load was requested but no index file exists at the path.
    #[error("no index found at {}", .0.display())]
    IndexNotFound(PathBuf),

    /// A configuration value could not be applied.
    #[error("invalid option: {0}")]
    OptionApply(String),

    /// The engine rejected a vector on insert.
    #[error("insert failed: {0}")]
    InsertFailed(String),

    /// The engine reported a search failure.
    #[error("search failed: {0}")]
    SearchFailed(String),

    /// The engine could not remove the given object id.
    #[error("remove failed: {0}")]
    RemoveFailed(String),

    /// The index build step failed.
    #[error("index build failed: {0}")]
    CreateIndexFailed(String),

    /// Persisting the index to its configured path failed.
    #[error("index save failed: {0}")]
    SaveIndexFailed(String),

    /// The handle's object encoding is not one of the supported kinds.
    #[error("unsupported object type")]
    UnsupportedObjectType,

    /// The engine holds no vector under the requested object id.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// The uuid is not mapped to any object id.
    #[error("object id not found for uuid {uuid}")]
    ObjectIdNotFound {
        /// The unmapped uuid.
        uuid: String,
    },

    /// An insert was attempted for a uuid that is already mapped.
    #[error("uuid {uuid} already exists as object {oid}")]
    UuidAlreadyExists {
        /// The conflicting uuid.
        uuid: String,
        /// The object id it is currently mapped to.
        oid: u32,
    },

    /// The handle was closed; no further operations are accepted.
    #[error("index handle is closed")]
    IndexClosed,

    /// Another live handle already owns the index path.
    #[error("index path {} is owned by another handle", .0.display())]
    IndexPathBusy(PathBuf),

    /// Bulk input slices differ in length.
    #[error("bulk input length mismatch: {uuids} uuids vs {vectors} vectors")]
    LengthMismatch {
        /// Number of uuids supplied.
        uuids: usize,
        /// Number of vectors supplied.
        vectors: usize,
    },

    /// Combined error value for a batch operation with partial failures.
    #[error("{} operation(s) failed", .0.len())]
    Aggregate(Vec<Error>),

    /// An underlying I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_uuid() {
        let err = Error::ObjectIdNotFound {
            uuid: "doc-42".to_string(),
        };
        assert!(err.to_string().contains("doc-42"));
    }

    #[test]
    fn test_aggregate_counts_failures() {
        let err = Error::Aggregate(vec![
            Error::InsertFailed("dimension mismatch".to_string()),
            Error::RemoveFailed("unknown id".to_string()),
        ]);
        assert!(err.to_string().contains('2'));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Error::from(io);
        assert!(matches!(err, Error::Io(_)));
    }
}
