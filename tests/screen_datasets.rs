#![cfg(feature = "file-store")]

use futures::executor::block_on;
use gm_screen::{
    FileStore, KeyValueStore, MemoryStore, Point, RestoreOutcome, SceneDocument, Screen,
    ScreenConfig, ScreenError, Strict,
};
use std::fs;
use tempfile::TempDir;

fn file_screen(dir: &TempDir) -> Screen<FileStore> {
    let store = FileStore::open(dir.path().join("store")).unwrap();
    Screen::new(store, ScreenConfig::default())
}

#[test]
fn test_saved_datasets_are_listed() {
    let mut screen = Screen::new(MemoryStore::new(), ScreenConfig::default());
    screen.set_dataset("crypt");
    screen.create_block(Point::ORIGIN).unwrap();
    block_on(screen.save()).unwrap();
    screen.set_dataset("arena");
    block_on(screen.save()).unwrap();

    assert_eq!(screen.list_datasets().unwrap(), vec!["arena", "crypt"]);
    assert_eq!(
        screen.store().get("dataset").unwrap().as_deref(),
        Some("arena")
    );
}

#[test]
fn test_file_store_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let saved = {
        let mut screen = file_screen(&dir);
        screen.set_dataset("Salt Marsh");
        screen.create_block(Point::new(12, 34)).unwrap();
        block_on(screen.save()).unwrap()
    };

    let mut reopened = file_screen(&dir);
    assert_eq!(
        reopened.restore_state().unwrap(),
        RestoreOutcome::Restored(1)
    );
    assert_eq!(reopened.dataset(), "Salt Marsh");
    assert_eq!(reopened.title(), "GM Screen(Salt Marsh)");
    assert_eq!(reopened.list_datasets().unwrap(), vec!["Salt Marsh"]);
    let persisted = block_on(reopened.persist_document(&mut Strict)).unwrap();
    assert_eq!(persisted, saved);
}

#[test]
fn test_switching_to_empty_dataset_keeps_scene() {
    let mut screen = Screen::new(MemoryStore::new(), ScreenConfig::default());
    let block = screen.create_block(Point::ORIGIN).unwrap();

    assert_eq!(screen.open_dataset("fresh").unwrap(), RestoreOutcome::Empty);
    assert_eq!(screen.dataset(), "fresh");
    assert_eq!(screen.scene().top_level(), vec![block]);
}

#[test]
fn test_export_requires_a_name() {
    let dir = TempDir::new().unwrap();
    let mut screen = file_screen(&dir);
    screen.create_block(Point::ORIGIN).unwrap();

    let err = block_on(screen.export_to_file(dir.path())).unwrap_err();
    assert!(matches!(err, ScreenError::Unnamed));
    assert_eq!(err.to_string(), "a dataset name is required");
    assert!(screen.list_datasets().unwrap().is_empty());

    let err = block_on(screen.save_as(dir.path(), ".json")).unwrap_err();
    assert!(matches!(err, ScreenError::Unnamed));
}

#[test]
fn test_save_as_strips_extension_and_writes_file() {
    let dir = TempDir::new().unwrap();
    let mut screen = file_screen(&dir);
    screen.create_block(Point::new(5, 6)).unwrap();

    let path = block_on(screen.save_as(dir.path(), "Lighthouse.json")).unwrap();

    assert_eq!(path, dir.path().join("Lighthouse.json"));
    assert_eq!(screen.dataset(), "Lighthouse");
    let written = SceneDocument::from_json(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written.data.len(), 1);
    assert_eq!(written.data[0]["left"], "5px");
    assert_eq!(screen.list_datasets().unwrap(), vec!["Lighthouse"]);

    let again = block_on(screen.export_to_file(dir.path())).unwrap();
    assert_eq!(again, path);
}

#[test]
fn test_exported_file_imports_into_new_screen() {
    let dir = TempDir::new().unwrap();
    let mut source = Screen::new(MemoryStore::new(), ScreenConfig::default());
    source.set_dataset("ruins");
    source.create_block(Point::new(1, 1)).unwrap();
    source.create_block(Point::new(2, 2)).unwrap();
    let path = block_on(source.export_to_file(dir.path())).unwrap();

    let mut target = file_screen(&dir);
    target.create_block(Point::new(9, 9)).unwrap();
    assert_eq!(target.import_file(&path).unwrap(), 2);
    assert_eq!(target.dataset(), "ruins");
    assert_eq!(target.scene().top_level().len(), 2);

    block_on(target.persist_to_local_storage()).unwrap();
    assert_eq!(target.list_datasets().unwrap(), vec!["ruins"]);
}

#[test]
fn test_import_of_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let mut screen = file_screen(&dir);
    let err = screen.import_file(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ScreenError::Io(_)));
}

#[test]
fn test_clear_memory_forgets_everything() {
    let dir = TempDir::new().unwrap();
    let mut screen = file_screen(&dir);
    screen.set_dataset("a");
    block_on(screen.save()).unwrap();
    screen.set_dataset("b");
    block_on(screen.save()).unwrap();

    screen.clear_memory().unwrap();

    assert!(screen.list_datasets().unwrap().is_empty());
    assert!(screen.store().keys().unwrap().is_empty());
    let mut reopened = file_screen(&dir);
    assert_eq!(reopened.restore_state().unwrap(), RestoreOutcome::Empty);
    assert_eq!(reopened.dataset(), "unspecified");
}

#[test]
fn test_corrupted_entry_is_reported() {
    let dir = TempDir::new().unwrap();
    let mut screen = file_screen(&dir);
    screen.set_dataset("moor");
    block_on(screen.save()).unwrap();

    let entry = dir.path().join("store").join("dataset-moor.entry");
    let text = fs::read_to_string(&entry).unwrap();
    fs::write(&entry, text.replace("\\\"data\\\"", "\\\"dada\\\"")).unwrap();

    let mut reopened = file_screen(&dir);
    let err = reopened.restore_state().unwrap_err();
    assert!(matches!(err, ScreenError::Storage(_)));
}
