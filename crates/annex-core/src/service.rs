//! uuid-addressed CRUD and search over a guarded index.
//!
//! Callers address vectors by an opaque, caller-assigned string key
//! instead of the engine's internal object id. The service keeps the
//! mapping-table pair consistent with the index contents and owns the
//! bulk-indexing lifecycle policy: plain inserts only store, and the
//! (relatively expensive) build/save steps run when the caller commits.
//!
//! `update` is delete-then-insert and `bulk_insert_commit` commits in
//! chunks; neither is atomic. A failed `update` leaves the uuid
//! unmapped, and a failed chunk commit does not roll back the already
//! inserted, already mapped items.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::config::IndexConfig;
use crate::engine::AnnEngine;
use crate::error::{Error, Result};
use crate::handle::IndexHandle;
use crate::idmap::IdMap;

/// Default exploration coefficient passed to the engine.
pub const DEFAULT_EPSILON: f32 = 0.1;

/// Default search radius; negative means unbounded.
pub const DEFAULT_RADIUS: f32 = -1.0;

/// One resolved search result.
#[derive(Debug, Clone, PartialEq)]
pub struct Distance {
    /// Engine-assigned object id.
    pub oid: u32,
    /// Distance from the query.
    pub distance: f32,
    /// The uuid the object id resolves to.
    pub uuid: String,
}

/// Outcome of a search: resolved hits plus per-slot failures.
///
/// Callers must inspect both; a non-empty `failures` list means some
/// result slots were lost while the listed hits are still valid.
#[derive(Debug, Default)]
pub struct SearchResponse {
    /// Hits ordered by ascending distance.
    pub hits: Vec<Distance>,
    /// Per-slot failures reported by the engine.
    pub failures: Vec<Error>,
}

impl SearchResponse {
    /// Folds the per-slot failures into one combined error value, or
    /// `None` when every slot resolved.
    #[must_use]
    pub fn combined_failure(self) -> Option<Error> {
        if self.failures.is_empty() {
            None
        } else {
            Some(Error::Aggregate(self.failures))
        }
    }
}

/// Outcome of a bulk insert. `inserted` and `errors` are not
/// index-aligned with the input.
#[derive(Debug, Default)]
pub struct BulkReport {
    /// uuids that were inserted (and, for commit variants, mapped).
    pub inserted: Vec<String>,
    /// Per-item and per-commit failures, in encounter order.
    pub errors: Vec<Error>,
}

impl BulkReport {
    /// Converts the report into the inserted uuids, or one combined
    /// error value when any item or commit step failed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Aggregate`] carrying every recorded failure.
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.errors.is_empty() {
            Ok(self.inserted)
        } else {
            Err(Error::Aggregate(self.errors))
        }
    }
}

/// uuid-addressed index service over one [`IndexHandle`] and one
/// [`IdMap`]. Share across threads via `Arc`.
pub struct IndexService {
    handle: IndexHandle,
    map: IdMap,
}

fn mappings_path(index_path: &Path) -> PathBuf {
    let mut os = index_path.as_os_str().to_os_string();
    os.push(".map");
    PathBuf::from(os)
}

impl IndexService {
    /// Opens the index at the configured path, loading it when a file
    /// already exists and creating it fresh otherwise. Previously saved
    /// uuid mappings are restored alongside a loaded index.
    ///
    /// # Errors
    ///
    /// Startup failure is fatal: no instance is returned.
    pub fn new(config: &IndexConfig) -> Result<Self> {
        if config.index_path.exists() {
            let handle = IndexHandle::load(config)?;
            let map = Self::restore_mappings(&config.index_path)?;
            Ok(Self { handle, map })
        } else {
            let handle = IndexHandle::create(config)?;
            Ok(Self {
                handle,
                map: IdMap::new(),
            })
        }
    }

    /// Builds a service over an injected engine. Mappings start empty.
    ///
    /// # Errors
    ///
    /// Propagates [`IndexHandle::with_engine`] failures.
    pub fn with_engine(engine: Box<dyn AnnEngine>, config: &IndexConfig) -> Result<Self> {
        Ok(Self {
            handle: IndexHandle::with_engine(engine, config)?,
            map: IdMap::new(),
        })
    }

    fn restore_mappings(index_path: &Path) -> Result<IdMap> {
        let path = mappings_path(index_path);
        if !path.exists() {
            return Ok(IdMap::new());
        }
        let file = File::open(&path)?;
        let reader = BufReader::new(file);
        let pairs: Vec<(String, u32)> = bincode::deserialize_from(reader)
            .map_err(|e| Error::CreateProperty(format!("mapping restore failed: {e}")))?;
        IdMap::from_pairs(pairs)
    }

    fn persist_mappings(&self) -> Result<()> {
        let path = mappings_path(self.handle.index_path());
        let file = File::create(&path).map_err(|e| Error::SaveIndexFailed(e.to_string()))?;
        let writer = BufWriter::new(file);
        bincode::serialize_into(writer, &self.map.pairs())
            .map_err(|e| Error::SaveIndexFailed(e.to_string()))
    }

    /// Searches for up to `k` neighbors of `vector` and resolves each
    /// hit's object id to its uuid.
    ///
    /// A hit whose id has no uuid mapping is dropped with a logged
    /// warning rather than failing the call: the vector exists in the
    /// index but is not currently owned by any known uuid (for example,
    /// a remove raced with this search). Per-slot engine failures land
    /// in [`SearchResponse::failures`].
    ///
    /// # Errors
    ///
    /// Fails only when the whole native call errors or the handle is
    /// closed.
    pub fn search(
        &self,
        vector: &[f32],
        k: usize,
        epsilon: f32,
        radius: f32,
    ) -> Result<SearchResponse> {
        let slots = self.handle.search(vector, k, epsilon, radius)?;

        let mut response = SearchResponse::default();
        for slot in slots {
            match slot {
                Ok(hit) => match self.map.uuid_of(hit.oid) {
                    Some(uuid) => response.hits.push(Distance {
                        oid: hit.oid,
                        distance: hit.distance,
                        uuid,
                    }),
                    None => {
                        warn!(oid = hit.oid, "dropping search hit with no uuid mapping");
                    }
                },
                Err(err) => response.failures.push(err),
            }
        }
        Ok(response)
    }

    /// Searches using the vector already stored under `uuid` as the
    /// query.
    ///
    /// # Errors
    ///
    /// [`Error::ObjectIdNotFound`] when the uuid is unmapped, then the
    /// same failure modes as [`IndexService::search`].
    pub fn search_by_uuid(
        &self,
        uuid: &str,
        k: usize,
        epsilon: f32,
        radius: f32,
    ) -> Result<SearchResponse> {
        let oid = self.oid_of(uuid)?;
        let vector = self.handle.get_vector(oid)?;
        self.search(&vector, k, epsilon, radius)
    }

    /// Stores `vector` under `uuid` without building or saving the
    /// index; call [`IndexService::create_index`] /
    /// [`IndexService::save_index`] (or the commit variants) to make it
    /// searchable and durable. This decouples high-rate ingestion from
    /// the expensive build step.
    ///
    /// # Errors
    ///
    /// [`Error::UuidAlreadyExists`] when the uuid is already mapped
    /// (checked before touching the engine so no orphaned duplicate
    /// entry is created), or the engine's insert failure.
    pub fn insert(&self, uuid: &str, vector: &[f32]) -> Result<()> {
        if let Some(oid) = self.map.oid_of(uuid) {
            return Err(Error::UuidAlreadyExists {
                uuid: uuid.to_string(),
                oid,
            });
        }
        let oid = self.handle.insert(vector)?;
        self.map.bind(uuid, oid)
    }

    /// Insert followed immediately by build and save. For low-throughput
    /// callers that want durability per write at the cost of a rebuild
    /// per write.
    ///
    /// # Errors
    ///
    /// Propagates the first failing step.
    pub fn insert_commit(&self, uuid: &str, vector: &[f32], pool_size: u32) -> Result<()> {
        self.insert(uuid, vector)?;
        self.create_and_save_index(pool_size)
    }

    /// Validated per-uuid insert of a batch, without committing.
    /// Intended for large ingestion runs followed by one
    /// [`IndexService::create_and_save_index`].
    ///
    /// A failure on one item is recorded and does not abort the rest.
    ///
    /// # Errors
    ///
    /// [`Error::LengthMismatch`] when the input slices differ in length;
    /// per-item failures are in the returned report.
    pub fn bulk_insert(&self, uuids: &[String], vectors: &[Vec<f32>]) -> Result<BulkReport> {
        if uuids.len() != vectors.len() {
            return Err(Error::LengthMismatch {
                uuids: uuids.len(),
                vectors: vectors.len(),
            });
        }

        let mut report = BulkReport::default();
        for (uuid, vector) in uuids.iter().zip(vectors) {
            match self.insert(uuid, vector) {
                Ok(()) => report.inserted.push(uuid.clone()),
                Err(err) => report.errors.push(err),
            }
        }
        Ok(report)
    }

    /// Inserts items one at a time and commits (build + save) every
    /// `bulk_insert_chunk_size` successful inserts, plus once more for a
    /// trailing partial chunk. Amortizes the rebuild over batches while
    /// bounding how many unindexed vectors accumulate.
    ///
    /// A failed item is recorded and the batch continues; a failed chunk
    /// commit is recorded and does not roll back the items already
    /// inserted and mapped.
    ///
    /// # Errors
    ///
    /// [`Error::LengthMismatch`] when the input slices differ in length;
    /// everything else is in the returned report.
    pub fn bulk_insert_commit(
        &self,
        uuids: &[String],
        vectors: &[Vec<f32>],
        pool_size: u32,
    ) -> Result<BulkReport> {
        if uuids.len() != vectors.len() {
            return Err(Error::LengthMismatch {
                uuids: uuids.len(),
                vectors: vectors.len(),
            });
        }

        let chunk_size = self.handle.bulk_insert_chunk_size();
        let mut report = BulkReport::default();
        let mut pending = 0usize;

        for (uuid, vector) in uuids.iter().zip(vectors) {
            match self.insert(uuid, vector) {
                Ok(()) => {
                    report.inserted.push(uuid.clone());
                    pending += 1;
                    if pending >= chunk_size {
                        if let Err(err) = self.create_and_save_index(pool_size) {
                            report.errors.push(err);
                        }
                        pending = 0;
                    }
                }
                Err(err) => report.errors.push(err),
            }
        }

        if pending > 0 {
            if let Err(err) = self.create_and_save_index(pool_size) {
                report.errors.push(err);
            }
        }
        Ok(report)
    }

    /// Replaces the vector stored under `uuid` with `vector`.
    ///
    /// Implemented as delete-then-insert and NOT atomic: if the insert
    /// step fails after the delete succeeded, the uuid ends up unmapped.
    /// Treat a failed update as "uuid state undefined, re-insert or
    /// re-check", not as a no-op.
    ///
    /// # Errors
    ///
    /// [`Error::ObjectIdNotFound`] when the uuid is unmapped, then the
    /// failure modes of delete and insert.
    pub fn update(&self, uuid: &str, vector: &[f32]) -> Result<()> {
        self.delete(uuid)?;
        self.insert(uuid, vector)
    }

    /// Removes the vector stored under `uuid` from the index, then from
    /// the mapping tables. If the index removal fails the mapping entry
    /// is left intact, keeping the tables consistent with the index's
    /// view.
    ///
    /// # Errors
    ///
    /// [`Error::ObjectIdNotFound`] when the uuid is unmapped, or the
    /// engine's remove failure.
    pub fn delete(&self, uuid: &str) -> Result<()> {
        let oid = self.oid_of(uuid)?;
        self.handle.remove(oid)?;
        self.map.unbind_uuid(uuid);
        Ok(())
    }

    /// Returns the vector stored under `uuid`.
    ///
    /// # Errors
    ///
    /// [`Error::ObjectIdNotFound`] when the uuid is unmapped, or the
    /// handle's get-vector failure.
    pub fn get_object(&self, uuid: &str) -> Result<Vec<f32>> {
        let oid = self.oid_of(uuid)?;
        self.handle.get_vector(oid)
    }

    /// Builds the searchable structure over all stored vectors.
    ///
    /// # Errors
    ///
    /// Propagates the guard's build failure.
    pub fn create_index(&self, pool_size: u32) -> Result<()> {
        self.handle.create_index(pool_size)
    }

    /// Persists the index and the uuid mapping tables, so a later load
    /// from the same path resolves the same uuids.
    ///
    /// # Errors
    ///
    /// Propagates the guard's save failure or the mapping write failure.
    pub fn save_index(&self) -> Result<()> {
        self.handle.save_index()?;
        self.persist_mappings()
    }

    /// Build then save, short-circuiting on the first failure.
    ///
    /// # Errors
    ///
    /// Propagates the failing step unchanged.
    pub fn create_and_save_index(&self, pool_size: u32) -> Result<()> {
        self.create_index(pool_size)?;
        self.save_index()
    }

    /// Closes the guard and releases both mapping tables. Further
    /// operations fail with [`Error::IndexClosed`].
    pub fn close(&self) {
        self.handle.close();
        self.map.clear();
    }

    /// Number of uuid-mapped vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if no uuid is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn oid_of(&self, uuid: &str) -> Result<u32> {
        self.map.oid_of(uuid).ok_or_else(|| Error::ObjectIdNotFound {
            uuid: uuid.to_string(),
        })
    }
}
