//! Exact-scan reference engine.
//!
//! Keeps every stored vector in memory and evaluates the configured
//! metric against all built entries on each search. Recall is exact and
//! the storage/build split matches a real ANN engine: inserts are staged,
//! and only [`AnnEngine::build_index`] makes them searchable.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use super::{AnnEngine, EngineError, EngineResult, RawHit};
use crate::config::IndexConfig;
use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::object::ObjectKind;

/// First object id handed out by a fresh engine. Id `0` stays reserved.
const FIRST_OID: u32 = 1;

/// Vector payload in its storage encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
enum StoredVector {
    Float32(Vec<f32>),
    Uint8(Vec<u8>),
}

impl StoredVector {
    fn encode(kind: ObjectKind, vector: &[f32]) -> Self {
        match kind {
            ObjectKind::Float32 => Self::Float32(vector.to_vec()),
            // Round-and-clamp quantization; reconstruction error is at
            // most 0.5 per element for in-range inputs.
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            ObjectKind::Uint8 => Self::Uint8(
                vector
                    .iter()
                    .map(|&v| v.round().clamp(0.0, 255.0) as u8)
                    .collect(),
            ),
        }
    }

    fn decode(&self) -> Vec<f32> {
        match self {
            Self::Float32(values) => values.clone(),
            Self::Uint8(values) => values.iter().map(|&v| f32::from(v)).collect(),
        }
    }
}

/// On-disk snapshot. The header fields are plain discriminants so a
/// foreign or corrupted file fails decoding with a typed error instead
/// of producing a handle with an impossible configuration.
#[derive(Serialize, Deserialize)]
struct FlatSnapshot {
    dimension: usize,
    kind: u8,
    metric: u8,
    next_oid: u32,
    entries: BTreeMap<u32, StoredVector>,
    built: BTreeSet<u32>,
}

/// Exact-scan implementation of [`AnnEngine`].
pub struct FlatEngine {
    path: PathBuf,
    dimension: usize,
    kind: ObjectKind,
    metric: DistanceMetric,
    next_oid: u32,
    entries: BTreeMap<u32, StoredVector>,
    built: BTreeSet<u32>,
    closed: bool,
}

impl FlatEngine {
    /// Creates a fresh engine, destroying any existing file at the
    /// configured path, and persists the empty index immediately.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the stale file cannot be removed and
    /// [`Error::CreateProperty`] if the initial save fails.
    pub fn create(config: &IndexConfig) -> Result<Self> {
        if config.index_path.exists() {
            std::fs::remove_file(&config.index_path)?;
        }

        let engine = Self {
            path: config.index_path.clone(),
            dimension: config.dimension,
            kind: config.object_kind,
            metric: config.distance_metric,
            next_oid: FIRST_OID,
            entries: BTreeMap::new(),
            built: BTreeSet::new(),
            closed: false,
        };

        engine
            .persist_index(&engine.path)
            .map_err(|e| Error::CreateProperty(e.to_string()))?;

        Ok(engine)
    }

    /// Opens an existing index file. The persisted header wins over the
    /// configured dimension/metric/encoding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexNotFound`] when no file exists at the path,
    /// [`Error::UnsupportedObjectType`] for an unknown encoding
    /// discriminant, and [`Error::CreateProperty`] for a file that fails
    /// to decode.
    pub fn open(config: &IndexConfig) -> Result<Self> {
        if !config.index_path.exists() {
            return Err(Error::IndexNotFound(config.index_path.clone()));
        }

        let file = File::open(&config.index_path)?;
        let reader = BufReader::new(file);
        let snapshot: FlatSnapshot = bincode::deserialize_from(reader)
            .map_err(|e| Error::CreateProperty(e.to_string()))?;

        let kind = ObjectKind::from_u8(snapshot.kind)?;
        let metric = DistanceMetric::from_u8(snapshot.metric)?;

        Ok(Self {
            path: config.index_path.clone(),
            dimension: snapshot.dimension,
            kind,
            metric,
            next_oid: snapshot.next_oid,
            entries: snapshot.entries,
            built: snapshot.built,
            closed: false,
        })
    }

    /// Number of stored vectors, built or not. Test and diagnostics aid.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no vectors are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn ensure_open(&self) -> EngineResult<()> {
        if self.closed {
            return Err(EngineError::new("engine is closed"));
        }
        Ok(())
    }

    fn check_dimension(&self, vector: &[f32]) -> EngineResult<()> {
        if vector.len() != self.dimension {
            return Err(EngineError::new(format!(
                "dimension mismatch: expected {}, got {}",
                self.dimension,
                vector.len()
            )));
        }
        Ok(())
    }
}

impl AnnEngine for FlatEngine {
    fn search(
        &self,
        query: &[f32],
        k: usize,
        epsilon: f32,
        radius: f32,
    ) -> EngineResult<Vec<EngineResult<RawHit>>> {
        self.ensure_open()?;
        self.check_dimension(query)?;
        // epsilon widens graph exploration; an exact scan already visits
        // every built entry.
        let _ = epsilon;

        let mut hits: Vec<RawHit> = Vec::new();
        for &oid in &self.built {
            let Some(stored) = self.entries.get(&oid) else {
                continue;
            };
            let distance = self.metric.evaluate(query, &stored.decode());
            if radius >= 0.0 && distance > radius {
                continue;
            }
            hits.push(RawHit { oid, distance });
        }

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.oid.cmp(&b.oid))
        });
        hits.truncate(k);

        Ok(hits.into_iter().map(Ok).collect())
    }

    fn insert_vector(&mut self, vector: &[f32]) -> EngineResult<u32> {
        self.ensure_open()?;
        self.check_dimension(vector)?;

        let oid = self.next_oid;
        self.next_oid += 1;
        self.entries
            .insert(oid, StoredVector::encode(self.kind, vector));
        Ok(oid)
    }

    fn remove_by_id(&mut self, oid: u32) -> EngineResult<()> {
        self.ensure_open()?;
        if self.entries.remove(&oid).is_none() {
            return Err(EngineError::new(format!("unknown object id {oid}")));
        }
        self.built.remove(&oid);
        Ok(())
    }

    fn get_vector_by_id(&self, oid: u32) -> EngineResult<Vec<f32>> {
        self.ensure_open()?;
        self.entries
            .get(&oid)
            .map(StoredVector::decode)
            .ok_or_else(|| EngineError::new(format!("unknown object id {oid}")))
    }

    fn build_index(&mut self, pool_size: u32) -> EngineResult<()> {
        self.ensure_open()?;
        // An exact scan has no graph to build in parallel; the pool size
        // is accepted for interface parity.
        tracing::debug!(pool_size, staged = self.entries.len(), "flat build");
        self.built = self.entries.keys().copied().collect();
        Ok(())
    }

    fn persist_index(&self, path: &Path) -> EngineResult<()> {
        self.ensure_open()?;

        let snapshot = FlatSnapshot {
            dimension: self.dimension,
            kind: self.kind.as_u8(),
            metric: self.metric.as_u8(),
            next_oid: self.next_oid,
            entries: self.entries.clone(),
            built: self.built.clone(),
        };

        let file = File::create(path).map_err(|e| EngineError::new(e.to_string()))?;
        let writer = BufWriter::new(file);
        bincode::serialize_into(writer, &snapshot).map_err(|e| EngineError::new(e.to_string()))
    }

    fn close(&mut self) {
        self.entries.clear();
        self.built.clear();
        self.closed = true;
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn object_kind(&self) -> ObjectKind {
        self.kind
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }
}
