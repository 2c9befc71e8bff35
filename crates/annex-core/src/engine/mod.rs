//! The capability boundary to the ANN engine.
//!
//! The search/index-construction algorithm is an external collaborator;
//! this module fixes the synchronous interface the rest of the crate
//! consumes. Engines assign their own integer object ids at insert time,
//! with id `0` reserved as unset/invalid, and report failures as an
//! engine-specific detail string.
//!
//! [`flat::FlatEngine`] is the in-tree reference implementation, an exact
//! scan that keeps the crate exercisable end to end without a graph ANN
//! build.

pub mod flat;


use std::fmt;
use std::path::Path;

use crate::distance::DistanceMetric;
use crate::object::ObjectKind;

/// Failure detail reported by an engine operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError(String);

impl EngineError {
    /// Wraps an engine-specific detail string.
    pub fn new<D: Into<String>>(detail: D) -> Self {
        Self(detail.into())
    }

    /// Returns the detail string.
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for EngineError {}

/// Result alias for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// One raw search result as produced by the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawHit {
    /// Engine-assigned object id. Never `0`.
    pub oid: u32,
    /// Distance from the query, per the engine's metric.
    pub distance: f32,
}

/// Synchronous interface to one native index instance.
///
/// Implementations are not required to tolerate unsynchronized concurrent
/// mutation; [`crate::handle::IndexHandle`] provides the reader/writer
/// discipline and is the only caller.
pub trait AnnEngine: Send + Sync {
    /// Searches for up to `k` neighbors of `query`.
    ///
    /// The outer result is whole-call failure. Each inner slot is either
    /// a hit or a per-slot failure, so a bad slot is reported rather than
    /// silently dropped. Hits are ordered by ascending distance.
    /// `radius >= 0` bounds the accepted distance; a negative radius
    /// means unbounded. `epsilon` shapes graph exploration in engines
    /// that have one.
    fn search(
        &self,
        query: &[f32],
        k: usize,
        epsilon: f32,
        radius: f32,
    ) -> EngineResult<Vec<EngineResult<RawHit>>>;

    /// Stores a vector and returns its newly assigned object id.
    ///
    /// Storage only; the vector is not searchable until
    /// [`AnnEngine::build_index`] runs.
    fn insert_vector(&mut self, vector: &[f32]) -> EngineResult<u32>;

    /// Removes the vector stored under `oid`.
    fn remove_by_id(&mut self, oid: u32) -> EngineResult<()>;

    /// Returns the vector stored under `oid`, decoded to `f32`.
    fn get_vector_by_id(&self, oid: u32) -> EngineResult<Vec<f32>>;

    /// Builds or refreshes the searchable structure over all stored
    /// vectors, using `pool_size` as the requested build parallelism.
    fn build_index(&mut self, pool_size: u32) -> EngineResult<()>;

    /// Persists the index to `path`. Does not mutate in-memory state.
    fn persist_index(&self, path: &Path) -> EngineResult<()>;

    /// Releases the native resource. Further calls on this engine fail
    /// with a closed-engine detail rather than crashing.
    fn close(&mut self);

    /// Configured vector dimensionality.
    fn dimension(&self) -> usize;

    /// Configured element encoding.
    fn object_kind(&self) -> ObjectKind;

    /// Configured distance metric.
    fn metric(&self) -> DistanceMetric;
}
