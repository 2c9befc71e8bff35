//! Synchronized guard around one native index resource.
//!
//! The engine does not tolerate unsynchronized concurrent mutation, so
//! every operation goes through a reader/writer lock: search, get-vector
//! and save take the lock shared, while insert, bulk-insert, remove,
//! build and close take it exclusively. Concurrent searches proceed in
//! parallel; all structural mutation is serialized.
//!
//! A handle exclusively owns its engine, and at most one live handle
//! exists per index path (enforced through a process-wide registry, not
//! by convention). `close` moves the handle into a terminal state in
//! which every operation returns [`Error::IndexClosed`] instead of
//! touching released resources.

use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::config::IndexConfig;
use crate::distance::DistanceMetric;
use crate::engine::flat::FlatEngine;
use crate::engine::AnnEngine;
use crate::error::{Error, Result};
use crate::object::ObjectKind;

/// A resolved search result slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    /// Engine-assigned object id.
    pub oid: u32,
    /// Distance from the query.
    pub distance: f32,
}

/// One slot of a search response: a hit, or the failure the engine
/// reported for that slot.
pub type SearchSlot = std::result::Result<SearchHit, Error>;

enum HandleState {
    Open(Box<dyn AnnEngine>),
    Closed,
}

fn open_paths() -> &'static Mutex<HashSet<PathBuf>> {
    static PATHS: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();
    PATHS.get_or_init(|| Mutex::new(HashSet::new()))
}

fn register_path(path: &Path) -> Result<PathBuf> {
    let key = std::path::absolute(path)?;
    let mut paths = open_paths().lock();
    if !paths.insert(key.clone()) {
        return Err(Error::IndexPathBusy(path.to_path_buf()));
    }
    Ok(key)
}

fn release_path(key: &Path) {
    open_paths().lock().remove(key);
}

/// Exclusive owner of one native index instance.
pub struct IndexHandle {
    state: RwLock<HandleState>,
    index_path: PathBuf,
    path_key: PathBuf,
    dimension: usize,
    object_kind: ObjectKind,
    metric: DistanceMetric,
    bulk_insert_chunk_size: usize,
}

impl IndexHandle {
    /// Creates a fresh index at the configured path, destroying any
    /// existing file there.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::IndexPathBusy`] if another live handle owns
    /// the path, or with the engine's creation error. No handle is
    /// returned on failure.
    pub fn create(config: &IndexConfig) -> Result<Self> {
        config.validate()?;
        let key = register_path(&config.index_path)?;
        match FlatEngine::create(config) {
            Ok(engine) => Ok(Self::from_engine(Box::new(engine), config, key)),
            Err(err) => {
                release_path(&key);
                Err(err)
            }
        }
    }

    /// Loads an existing index file from the configured path.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::IndexNotFound`] when there is no file at the
    /// path, and with [`Error::IndexPathBusy`] when another live handle
    /// owns it.
    pub fn load(config: &IndexConfig) -> Result<Self> {
        config.validate()?;
        let key = register_path(&config.index_path)?;
        match FlatEngine::open(config) {
            Ok(engine) => Ok(Self::from_engine(Box::new(engine), config, key)),
            Err(err) => {
                release_path(&key);
                Err(err)
            }
        }
    }

    /// Wraps an already constructed engine. This is the seam a real ANN
    /// engine plugs into; dimensionality, encoding and metric are taken
    /// from the engine itself.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::OptionApply`] for an unusable chunk size and
    /// [`Error::IndexPathBusy`] for a path owned by another handle.
    pub fn with_engine(engine: Box<dyn AnnEngine>, config: &IndexConfig) -> Result<Self> {
        if config.bulk_insert_chunk_size == 0 {
            return Err(Error::OptionApply(
                "bulk_insert_chunk_size must be at least 1".into(),
            ));
        }
        let key = register_path(&config.index_path)?;
        Ok(Self::from_engine(engine, config, key))
    }

    fn from_engine(engine: Box<dyn AnnEngine>, config: &IndexConfig, path_key: PathBuf) -> Self {
        let dimension = engine.dimension();
        let object_kind = engine.object_kind();
        let metric = engine.metric();
        tracing::info!(
            path = %config.index_path.display(),
            dimension,
            metric = metric.as_str(),
            kind = object_kind.as_str(),
            "index handle opened"
        );
        Self {
            state: RwLock::new(HandleState::Open(engine)),
            index_path: config.index_path.clone(),
            path_key,
            dimension,
            object_kind,
            metric,
            bulk_insert_chunk_size: config.bulk_insert_chunk_size,
        }
    }

    /// Searches for up to `k` neighbors of `query`, holding the lock
    /// shared so concurrent searches do not serialize.
    ///
    /// Returns the engine's result slots ordered by ascending distance;
    /// per-slot engine failures are surfaced as [`Error::SearchFailed`]
    /// slots rather than silently dropped.
    ///
    /// # Errors
    ///
    /// [`Error::SearchFailed`] when the whole native call errors, and
    /// [`Error::IndexClosed`] after `close`.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        epsilon: f32,
        radius: f32,
    ) -> Result<Vec<SearchSlot>> {
        let state = self.state.read();
        let engine = Self::open_engine(&state)?;
        let slots = engine
            .search(query, k, epsilon, radius)
            .map_err(|e| Error::SearchFailed(e.to_string()))?;
        Ok(slots
            .into_iter()
            .map(|slot| {
                slot.map(|hit| SearchHit {
                    oid: hit.oid,
                    distance: hit.distance,
                })
                .map_err(|e| Error::SearchFailed(e.to_string()))
            })
            .collect())
    }

    /// Stores a vector and returns its engine-assigned object id.
    ///
    /// Storage only: the vector is not searchable until
    /// [`IndexHandle::create_index`] runs.
    ///
    /// # Errors
    ///
    /// [`Error::InsertFailed`] if the engine rejects the vector.
    pub fn insert(&self, vector: &[f32]) -> Result<u32> {
        let mut state = self.state.write();
        let engine = Self::open_engine_mut(&mut state)?;
        engine
            .insert_vector(vector)
            .map_err(|e| Error::InsertFailed(e.to_string()))
    }

    /// Inserts a batch under one exclusive acquisition.
    ///
    /// Each element is attempted independently: a failure is recorded
    /// and the remaining elements still insert. The returned ids and
    /// errors are not index-aligned with the input.
    ///
    /// # Errors
    ///
    /// [`Error::IndexClosed`] after `close`; per-element failures are in
    /// the returned error list.
    pub fn bulk_insert(&self, vectors: &[Vec<f32>]) -> Result<(Vec<u32>, Vec<Error>)> {
        let mut state = self.state.write();
        let engine = Self::open_engine_mut(&mut state)?;

        let mut oids = Vec::with_capacity(vectors.len());
        let mut errors = Vec::new();
        for vector in vectors {
            match engine.insert_vector(vector) {
                Ok(oid) => oids.push(oid),
                Err(err) => errors.push(Error::InsertFailed(err.to_string())),
            }
        }
        Ok((oids, errors))
    }

    /// Builds the searchable structure over all stored vectors.
    ///
    /// # Errors
    ///
    /// [`Error::CreateIndexFailed`] if the engine build fails.
    pub fn create_index(&self, pool_size: u32) -> Result<()> {
        let mut state = self.state.write();
        let engine = Self::open_engine_mut(&mut state)?;
        engine
            .build_index(pool_size)
            .map_err(|e| Error::CreateIndexFailed(e.to_string()))
    }

    /// Persists the index to its configured path. Shared access is
    /// sufficient: no in-memory structure is mutated.
    ///
    /// # Errors
    ///
    /// [`Error::SaveIndexFailed`] if the engine cannot persist.
    pub fn save_index(&self) -> Result<()> {
        let state = self.state.read();
        let engine = Self::open_engine(&state)?;
        engine
            .persist_index(&self.index_path)
            .map_err(|e| Error::SaveIndexFailed(e.to_string()))
    }

    /// Build followed by save, short-circuiting on the first failure.
    ///
    /// # Errors
    ///
    /// Propagates the build or save error unchanged.
    pub fn create_and_save_index(&self, pool_size: u32) -> Result<()> {
        self.create_index(pool_size)?;
        self.save_index()
    }

    /// Removes the vector stored under `oid`.
    ///
    /// # Errors
    ///
    /// [`Error::RemoveFailed`] if the id is unknown to the engine.
    pub fn remove(&self, oid: u32) -> Result<()> {
        let mut state = self.state.write();
        let engine = Self::open_engine_mut(&mut state)?;
        engine
            .remove_by_id(oid)
            .map_err(|e| Error::RemoveFailed(e.to_string()))
    }

    /// Returns the vector stored under `oid`, decoded to `f32`.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedObjectType`] if the handle's encoding is not
    /// one of the supported kinds, [`Error::ObjectNotFound`] if the id
    /// is absent.
    pub fn get_vector(&self, oid: u32) -> Result<Vec<f32>> {
        let state = self.state.read();
        let engine = Self::open_engine(&state)?;
        match self.object_kind {
            ObjectKind::Float32 | ObjectKind::Uint8 => engine
                .get_vector_by_id(oid)
                .map_err(|e| Error::ObjectNotFound(e.to_string())),
        }
    }

    /// Releases the native resource and moves the handle to its terminal
    /// state. Idempotent: a second close is a no-op, and every other
    /// operation afterwards fails with [`Error::IndexClosed`].
    pub fn close(&self) {
        let mut state = self.state.write();
        if let HandleState::Open(engine) = &mut *state {
            engine.close();
            *state = HandleState::Closed;
            release_path(&self.path_key);
            tracing::info!(path = %self.index_path.display(), "index handle closed");
        }
    }

    /// Configured vector dimensionality.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Configured element encoding.
    #[must_use]
    pub fn object_kind(&self) -> ObjectKind {
        self.object_kind
    }

    /// Configured distance metric.
    #[must_use]
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Path of the persisted index.
    #[must_use]
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Number of successful inserts between bulk commit cycles.
    #[must_use]
    pub fn bulk_insert_chunk_size(&self) -> usize {
        self.bulk_insert_chunk_size
    }

    fn open_engine<'a>(state: &'a HandleState) -> Result<&'a dyn AnnEngine> {
        match state {
            HandleState::Open(engine) => Ok(engine.as_ref()),
            HandleState::Closed => Err(Error::IndexClosed),
        }
    }

    fn open_engine_mut<'a>(state: &'a mut HandleState) -> Result<&'a mut (dyn AnnEngine + 'static)> {
        match state {
            HandleState::Open(engine) => Ok(engine.as_mut()),
            HandleState::Closed => Err(Error::IndexClosed),
        }
    }
}

impl Drop for IndexHandle {
    fn drop(&mut self) {
        self.close();
    }
}
