//! Tests for the synchronized index handle.

use tempfile::tempdir;

use crate::config::IndexConfig;
use crate::distance::DistanceMetric;
use crate::error::Error;
use crate::handle::IndexHandle;
use crate::object::ObjectKind;

fn config_at(dir: &std::path::Path, dimension: usize) -> IndexConfig {
    IndexConfig::new(dir.join("guard.idx"), dimension)
}

#[test]
fn test_one_live_handle_per_path() {
    let dir = tempdir().unwrap();
    let config = config_at(dir.path(), 2);

    let first = IndexHandle::create(&config).unwrap();
    assert!(matches!(
        IndexHandle::create(&config),
        Err(Error::IndexPathBusy(_))
    ));

    first.close();
    let again = IndexHandle::load(&config).unwrap();
    again.close();
}

#[test]
fn test_drop_releases_the_path() {
    let dir = tempdir().unwrap();
    let config = config_at(dir.path(), 2);

    {
        let _handle = IndexHandle::create(&config).unwrap();
    }
    let reopened = IndexHandle::load(&config).unwrap();
    reopened.close();
}

#[test]
fn test_load_without_file_fails() {
    let dir = tempdir().unwrap();
    let config = config_at(dir.path(), 2);

    assert!(matches!(
        IndexHandle::load(&config),
        Err(Error::IndexNotFound(_))
    ));
}

#[test]
fn test_create_rejects_invalid_config() {
    let dir = tempdir().unwrap();
    let config = config_at(dir.path(), 0);

    assert!(matches!(
        IndexHandle::create(&config),
        Err(Error::OptionApply(_))
    ));
}

#[test]
fn test_inserted_vector_searchable_after_create_index() {
    let dir = tempdir().unwrap();
    let handle = IndexHandle::create(&config_at(dir.path(), 2)).unwrap();

    let oid = handle.insert(&[1.0, 0.0]).unwrap();
    assert!(handle.search(&[1.0, 0.0], 5, 0.1, -1.0).unwrap().is_empty());

    handle.create_index(4).unwrap();
    let slots = handle.search(&[1.0, 0.0], 5, 0.1, -1.0).unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].as_ref().unwrap().oid, oid);
}

#[test]
fn test_bulk_insert_records_failures_and_continues() {
    let dir = tempdir().unwrap();
    let handle = IndexHandle::create(&config_at(dir.path(), 2)).unwrap();

    let vectors = vec![
        vec![1.0, 0.0],
        vec![1.0, 0.0, 0.0], // wrong dimension
        vec![0.0, 1.0],
    ];
    let (oids, errors) = handle.bulk_insert(&vectors).unwrap();

    assert_eq!(oids.len(), 2);
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], Error::InsertFailed(_)));
}

#[test]
fn test_insert_rejects_dimension_mismatch() {
    let dir = tempdir().unwrap();
    let handle = IndexHandle::create(&config_at(dir.path(), 4)).unwrap();

    assert!(matches!(
        handle.insert(&[1.0, 2.0]),
        Err(Error::InsertFailed(_))
    ));
}

#[test]
fn test_remove_unknown_oid_fails() {
    let dir = tempdir().unwrap();
    let handle = IndexHandle::create(&config_at(dir.path(), 2)).unwrap();

    assert!(matches!(handle.remove(42), Err(Error::RemoveFailed(_))));
}

#[test]
fn test_get_vector_unknown_oid_fails() {
    let dir = tempdir().unwrap();
    let handle = IndexHandle::create(&config_at(dir.path(), 2)).unwrap();

    assert!(matches!(
        handle.get_vector(42),
        Err(Error::ObjectNotFound(_))
    ));
}

#[test]
fn test_close_is_idempotent_and_terminal() {
    let dir = tempdir().unwrap();
    let handle = IndexHandle::create(&config_at(dir.path(), 2)).unwrap();
    handle.insert(&[1.0, 2.0]).unwrap();

    handle.close();
    handle.close(); // second close is a no-op

    assert!(matches!(
        handle.search(&[1.0, 2.0], 1, 0.1, -1.0),
        Err(Error::IndexClosed)
    ));
    assert!(matches!(handle.insert(&[1.0, 2.0]), Err(Error::IndexClosed)));
    assert!(matches!(
        handle.bulk_insert(&[vec![1.0, 2.0]]),
        Err(Error::IndexClosed)
    ));
    assert!(matches!(handle.create_index(1), Err(Error::IndexClosed)));
    assert!(matches!(handle.save_index(), Err(Error::IndexClosed)));
    assert!(matches!(handle.remove(1), Err(Error::IndexClosed)));
    assert!(matches!(handle.get_vector(1), Err(Error::IndexClosed)));
}

#[test]
fn test_properties_are_fixed_at_creation() {
    let dir = tempdir().unwrap();
    let config = config_at(dir.path(), 8)
        .with_metric(DistanceMetric::Cosine)
        .with_object_kind(ObjectKind::Uint8)
        .with_chunk_size(25);
    let handle = IndexHandle::create(&config).unwrap();

    assert_eq!(handle.dimension(), 8);
    assert_eq!(handle.metric(), DistanceMetric::Cosine);
    assert_eq!(handle.object_kind(), ObjectKind::Uint8);
    assert_eq!(handle.bulk_insert_chunk_size(), 25);
    assert_eq!(handle.index_path(), config.index_path.as_path());
    handle.close();
}

#[test]
fn test_save_then_load_round_trip() {
    let dir = tempdir().unwrap();
    let config = config_at(dir.path(), 2);

    let handle = IndexHandle::create(&config).unwrap();
    let oid = handle.insert(&[0.25, 0.75]).unwrap();
    handle.create_and_save_index(2).unwrap();
    handle.close();

    let reloaded = IndexHandle::load(&config).unwrap();
    assert_eq!(reloaded.get_vector(oid).unwrap(), vec![0.25, 0.75]);
    let slots = reloaded.search(&[0.25, 0.75], 1, 0.1, -1.0).unwrap();
    assert_eq!(slots[0].as_ref().unwrap().oid, oid);
    reloaded.close();
}
