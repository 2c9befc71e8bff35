//! Index configuration loading and validation.
//!
//! Values can come from code, from a TOML file, or from `ANNEX_`-prefixed
//! environment variables (environment wins). Only the values are consumed
//! here; server/bootstrap wiring lives outside this crate.

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::object::ObjectKind;

/// Configuration for one index instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Filesystem path of the persisted index.
    pub index_path: PathBuf,
    /// Vector dimensionality. Must be set explicitly; there is no
    /// sensible default.
    pub dimension: usize,
    /// Distance metric used to rank results.
    pub distance_metric: DistanceMetric,
    /// Element encoding for stored vectors.
    pub object_kind: ObjectKind,
    /// Number of successful inserts between commit cycles in
    /// `bulk_insert_commit`.
    pub bulk_insert_chunk_size: usize,
    /// Edge count used while building the searchable structure.
    pub creation_edge_size: usize,
    /// Edge count used while traversing the searchable structure.
    pub search_edge_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from("annex.idx"),
            dimension: 0,
            distance_metric: DistanceMetric::L2,
            object_kind: ObjectKind::Float32,
            bulk_insert_chunk_size: 100,
            creation_edge_size: 10,
            search_edge_size: 40,
        }
    }
}

impl IndexConfig {
    /// Creates a configuration with the two values that have no default.
    #[must_use]
    pub fn new<P: Into<PathBuf>>(index_path: P, dimension: usize) -> Self {
        Self {
            index_path: index_path.into(),
            dimension,
            ..Self::default()
        }
    }

    /// Sets the distance metric.
    #[must_use]
    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.distance_metric = metric;
        self
    }

    /// Sets the object encoding.
    #[must_use]
    pub fn with_object_kind(mut self, kind: ObjectKind) -> Self {
        self.object_kind = kind;
        self
    }

    /// Sets the bulk-insert commit chunk size.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.bulk_insert_chunk_size = chunk_size;
        self
    }

    /// Loads configuration from a TOML file merged with `ANNEX_`-prefixed
    /// environment variables, then validates it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OptionApply`] if the sources fail to parse or a
    /// value fails validation.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: Self = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("ANNEX_"))
            .extract()
            .map_err(|e| Error::OptionApply(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OptionApply`] naming the offending value.
    pub fn validate(&self) -> Result<()> {
        if self.index_path.as_os_str().is_empty() {
            return Err(Error::OptionApply("index_path must not be empty".into()));
        }
        if self.dimension == 0 {
            return Err(Error::OptionApply(
                "dimension must be at least 1".into(),
            ));
        }
        if self.bulk_insert_chunk_size == 0 {
            return Err(Error::OptionApply(
                "bulk_insert_chunk_size must be at least 1".into(),
            ));
        }
        if self.creation_edge_size == 0 || self.search_edge_size == 0 {
            return Err(Error::OptionApply(
                "edge sizes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = IndexConfig::default();
        assert_eq!(config.bulk_insert_chunk_size, 100);
        assert_eq!(config.creation_edge_size, 10);
        assert_eq!(config.search_edge_size, 40);
        assert_eq!(config.distance_metric, DistanceMetric::L2);
        assert_eq!(config.object_kind, ObjectKind::Float32);
    }

    #[test]
    fn test_validate_rejects_zero_dimension() {
        let config = IndexConfig::new("idx.bin", 0);
        assert!(matches!(config.validate(), Err(Error::OptionApply(_))));
    }

    #[test]
    fn test_validate_rejects_zero_chunk_size() {
        let config = IndexConfig::new("idx.bin", 4).with_chunk_size(0);
        assert!(matches!(config.validate(), Err(Error::OptionApply(_))));
    }

    #[test]
    fn test_load_from_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("annex.toml");
        std::fs::write(
            &path,
            r#"
index_path = "/tmp/vectors.idx"
dimension = 128
distance_metric = "cosine"
object_kind = "uint8"
bulk_insert_chunk_size = 10
"#,
        )
        .unwrap();

        let config = IndexConfig::load(&path).unwrap();
        assert_eq!(config.dimension, 128);
        assert_eq!(config.distance_metric, DistanceMetric::Cosine);
        assert_eq!(config.object_kind, ObjectKind::Uint8);
        assert_eq!(config.bulk_insert_chunk_size, 10);
        assert_eq!(config.creation_edge_size, 10);
    }

    #[test]
    fn test_load_rejects_bad_metric_name() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("annex.toml");
        std::fs::write(
            &path,
            "index_path = \"x.idx\"\ndimension = 8\ndistance_metric = \"chebyshev\"\n",
        )
        .unwrap();

        assert!(matches!(
            IndexConfig::load(&path),
            Err(Error::OptionApply(_))
        ));
    }
}
