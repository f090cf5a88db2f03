//! Notification center persistence against in-memory and file-backed storage.

use console_lib::adapters::{FileLocalStorage, MemoryLocalStorage};
use console_lib::notifications::{seed_notifications, NotificationCenter, NOTIFICATIONS_KEY};
use hr_console_core::domain::{Notification, NotificationFilter};
use hr_console_core::ports::LocalStorage;
use std::sync::Arc;
use tempfile::tempdir;

fn persisted(storage: &dyn LocalStorage) -> Vec<Notification> {
    let raw = storage.get(NOTIFICATIONS_KEY).unwrap().expect("collection is persisted");
    serde_json::from_str(&raw).unwrap()
}

#[test]
fn fresh_profile_is_seeded_and_mark_read_persists_immediately() {
    let storage = Arc::new(MemoryLocalStorage::new());
    let mut center = NotificationCenter::new(storage.clone());
    center.load().unwrap();

    assert_eq!(center.notifications(), seed_notifications().as_slice());
    assert_eq!(center.unread_count(), 2);

    center.mark_read(1).unwrap();
    let stored = persisted(storage.as_ref());
    assert!(stored[0].is_read);
    assert!(!stored[1].is_read);
    assert_eq!(stored, center.notifications());
}

#[test]
fn existing_collection_is_never_overwritten_by_load() {
    let storage = Arc::new(MemoryLocalStorage::new());
    let mut first = NotificationCenter::new(storage.clone());
    first.load().unwrap();
    first.mark_unread(2).unwrap();
    first.delete(1).unwrap();

    let mut second = NotificationCenter::new(storage.clone());
    second.load().unwrap();
    assert_eq!(second.notifications().len(), 1);
    assert_eq!(second.notifications()[0].id, 2);
}

#[test]
fn deleting_the_only_entry_does_not_reseed() {
    let storage = Arc::new(MemoryLocalStorage::new());
    let mut center = NotificationCenter::new(storage.clone());
    center.load().unwrap();
    center.delete(1).unwrap();
    center.delete(2).unwrap();
    assert!(center.notifications().is_empty());

    let mut reloaded = NotificationCenter::new(storage.clone());
    reloaded.load().unwrap();
    assert!(reloaded.notifications().is_empty());
    assert_eq!(storage.get(NOTIFICATIONS_KEY).unwrap().as_deref(), Some("[]"));
}

#[test]
fn mark_all_read_writes_once_and_round_trips() {
    let storage = Arc::new(MemoryLocalStorage::new());
    let mut center = NotificationCenter::new(storage.clone());
    center.load().unwrap();
    let writes = storage.write_count();

    center.mark_all_read().unwrap();
    assert_eq!(storage.write_count(), writes + 1);
    assert!(center.filter(NotificationFilter::Unread).is_empty());
    assert_eq!(center.filter(NotificationFilter::All).len(), 2);

    let mut reloaded = NotificationCenter::new(storage.clone());
    reloaded.load().unwrap();
    assert_eq!(reloaded.notifications(), center.notifications());
}

#[test]
fn unknown_ids_are_not_errors() {
    let storage = Arc::new(MemoryLocalStorage::new());
    let mut center = NotificationCenter::new(storage);
    center.load().unwrap();
    center.mark_read(99).unwrap();
    center.delete(99).unwrap();
    assert_eq!(center.open(99).unwrap(), None);
    assert_eq!(center.notifications(), seed_notifications().as_slice());
}

#[test]
fn open_marks_read_and_returns_the_link() {
    let storage = Arc::new(MemoryLocalStorage::new());
    let mut center = NotificationCenter::new(storage.clone());
    center.load().unwrap();
    assert_eq!(center.open(2).unwrap().as_deref(), Some("/projects"));
    assert!(persisted(storage.as_ref())[1].is_read);
}

#[test]
fn corrupt_or_duplicated_data_is_reseeded() {
    let duplicate_ids = duplicated();
    for raw in ["{not json", r#"[{"id":1}]"#, duplicate_ids.as_str()] {
        let storage = Arc::new(MemoryLocalStorage::new());
        storage.set(NOTIFICATIONS_KEY, raw).unwrap();
        let mut center = NotificationCenter::new(storage.clone());
        center.load().unwrap();
        assert_eq!(center.notifications(), seed_notifications().as_slice());
        assert_eq!(persisted(storage.as_ref()), seed_notifications());
    }
}

fn duplicated() -> String {
    let mut seed = seed_notifications();
    seed[1].id = 1;
    serde_json::to_string(&seed).unwrap()
}

#[test]
fn failed_persist_leaves_memory_unchanged() {
    let storage = Arc::new(MemoryLocalStorage::new());
    let mut center = NotificationCenter::new(storage.clone());
    center.load().unwrap();

    storage.set_fail_writes(true);
    assert!(center.mark_all_read().is_err());
    assert!(center.delete(1).is_err());
    assert_eq!(center.notifications(), seed_notifications().as_slice());

    storage.set_fail_writes(false);
    assert_eq!(persisted(storage.as_ref()), center.notifications());
}

#[test]
fn mutation_before_load_loads_first() {
    let storage = Arc::new(MemoryLocalStorage::new());
    let mut center = NotificationCenter::new(storage.clone());
    center.mark_read(2).unwrap();
    assert!(center.is_loaded());
    assert_eq!(center.unread_count(), 1);
}

#[test]
fn file_storage_survives_a_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("local_storage.json");

    let mut center = NotificationCenter::new(Arc::new(FileLocalStorage::new(&path)));
    center.load().unwrap();
    center.mark_read(1).unwrap();

    let mut restarted = NotificationCenter::new(Arc::new(FileLocalStorage::new(&path)));
    restarted.load().unwrap();
    assert_eq!(restarted.notifications(), center.notifications());
    assert_eq!(restarted.unread_count(), 1);
}
