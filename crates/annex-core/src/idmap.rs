//! Bijective uuid ↔ object-id mapping tables.
//!
//! Two concurrent maps form one logical bijection. The only mutators are
//! [`IdMap::bind`], [`IdMap::unbind_uuid`], [`IdMap::unbind_oid`] and
//! [`IdMap::clear`], each of which changes both directions together; the
//! underlying maps are never exposed independently, so for every entry
//! in one direction the inverse entry exists in the other.
//!
//! The pair is safe for concurrent use on its own, but a uuid's mapping
//! mutation and the matching engine call are NOT one atomic step:
//! concurrent insert and delete on the same uuid race, and which one
//! wins the mapping is unspecified. Callers that need per-uuid ordering
//! must provide it above this layer.

use dashmap::DashMap;

use crate::error::{Error, Result};

/// Object id `0` is reserved as unset/invalid and never enters the maps.
pub const UNSET_OID: u32 = 0;

/// The uuid ↔ object-id mapping table pair.
#[derive(Debug, Default)]
pub struct IdMap {
    uuid_to_oid: DashMap<String, u32>,
    oid_to_uuid: DashMap<u32, String>,
}

impl IdMap {
    /// Creates an empty map pair.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `uuid ↔ oid` in both directions, evicting any stale
    /// pairing either key was part of.
    ///
    /// # Errors
    ///
    /// Rejects the reserved id `0` with [`Error::InsertFailed`].
    pub fn bind(&self, uuid: &str, oid: u32) -> Result<()> {
        if oid == UNSET_OID {
            return Err(Error::InsertFailed(
                "object id 0 is reserved as unset".into(),
            ));
        }
        if let Some((_, stale_oid)) = self.uuid_to_oid.remove(uuid) {
            self.oid_to_uuid.remove(&stale_oid);
        }
        if let Some((_, stale_uuid)) = self.oid_to_uuid.remove(&oid) {
            self.uuid_to_oid.remove(&stale_uuid);
        }
        self.uuid_to_oid.insert(uuid.to_string(), oid);
        self.oid_to_uuid.insert(oid, uuid.to_string());
        Ok(())
    }

    /// Removes the pair keyed by `uuid`, returning the object id it was
    /// bound to.
    pub fn unbind_uuid(&self, uuid: &str) -> Option<u32> {
        let (_, oid) = self.uuid_to_oid.remove(uuid)?;
        self.oid_to_uuid.remove(&oid);
        Some(oid)
    }

    /// Removes the pair keyed by `oid`, returning the uuid it was bound
    /// to.
    pub fn unbind_oid(&self, oid: u32) -> Option<String> {
        let (_, uuid) = self.oid_to_uuid.remove(&oid)?;
        self.uuid_to_oid.remove(&uuid);
        Some(uuid)
    }

    /// Looks up the object id bound to `uuid`.
    #[must_use]
    pub fn oid_of(&self, uuid: &str) -> Option<u32> {
        self.uuid_to_oid.get(uuid).map(|entry| *entry)
    }

    /// Looks up the uuid bound to `oid`.
    #[must_use]
    pub fn uuid_of(&self, oid: u32) -> Option<String> {
        self.oid_to_uuid.get(&oid).map(|entry| entry.clone())
    }

    /// Number of live pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.uuid_to_oid.len()
    }

    /// Returns true if no pairs are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.uuid_to_oid.is_empty()
    }

    /// One consistent export of all pairs, uuid-side order unspecified.
    #[must_use]
    pub fn pairs(&self) -> Vec<(String, u32)> {
        self.uuid_to_oid
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    /// Restores pairs from a previous [`IdMap::pairs`] export.
    ///
    /// # Errors
    ///
    /// Propagates [`IdMap::bind`] failures.
    pub fn from_pairs(pairs: Vec<(String, u32)>) -> Result<Self> {
        let map = Self::new();
        for (uuid, oid) in pairs {
            map.bind(&uuid, oid)?;
        }
        Ok(map)
    }

    /// Releases every pair in both directions.
    pub fn clear(&self) {
        self.uuid_to_oid.clear();
        self.oid_to_uuid.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_and_lookup_both_directions() {
        let map = IdMap::new();
        map.bind("doc-1", 7).unwrap();

        assert_eq!(map.oid_of("doc-1"), Some(7));
        assert_eq!(map.uuid_of(7), Some("doc-1".to_string()));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_bind_rejects_unset_oid() {
        let map = IdMap::new();
        assert!(matches!(
            map.bind("doc-1", UNSET_OID),
            Err(Error::InsertFailed(_))
        ));
        assert!(map.is_empty());
    }

    #[test]
    fn test_rebind_uuid_evicts_stale_oid() {
        let map = IdMap::new();
        map.bind("doc-1", 7).unwrap();
        map.bind("doc-1", 9).unwrap();

        assert_eq!(map.oid_of("doc-1"), Some(9));
        assert_eq!(map.uuid_of(7), None);
        assert_eq!(map.uuid_of(9), Some("doc-1".to_string()));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_rebind_oid_evicts_stale_uuid() {
        let map = IdMap::new();
        map.bind("doc-1", 7).unwrap();
        map.bind("doc-2", 7).unwrap();

        assert_eq!(map.oid_of("doc-1"), None);
        assert_eq!(map.oid_of("doc-2"), Some(7));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_unbind_removes_both_directions() {
        let map = IdMap::new();
        map.bind("doc-1", 7).unwrap();

        assert_eq!(map.unbind_uuid("doc-1"), Some(7));
        assert_eq!(map.oid_of("doc-1"), None);
        assert_eq!(map.uuid_of(7), None);
        assert_eq!(map.unbind_uuid("doc-1"), None);
    }

    #[test]
    fn test_unbind_oid_removes_both_directions() {
        let map = IdMap::new();
        map.bind("doc-1", 7).unwrap();

        assert_eq!(map.unbind_oid(7), Some("doc-1".to_string()));
        assert_eq!(map.oid_of("doc-1"), None);
        assert_eq!(map.unbind_oid(7), None);
    }

    #[test]
    fn test_pairs_round_trip() {
        let map = IdMap::new();
        map.bind("a", 1).unwrap();
        map.bind("b", 2).unwrap();

        let restored = IdMap::from_pairs(map.pairs()).unwrap();
        assert_eq!(restored.oid_of("a"), Some(1));
        assert_eq!(restored.uuid_of(2), Some("b".to_string()));
        assert_eq!(restored.len(), 2);
    }
}
