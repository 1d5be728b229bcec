use serde_json::json;

use super::DocumentStore;
use crate::domain::models::Document;
use crate::domain::models::DocumentId;
use crate::domain::models::DocumentPatch;
use crate::domain::models::SaveStatus;

fn persisted(id: &str, title: &str) -> Document {
    let mut document = Document::new(title, json!({}));
    document.id = Some(DocumentId::new(id));
    return document;
}

fn store_with(ids: &[&str]) -> DocumentStore {
    let mut store = DocumentStore::default();
    store.replace_all(
        ids.iter()
            .map(|id| return persisted(id, &format!("Doc {id}")))
            .collect(),
    );
    return store;
}

#[test]
fn it_replaces_all_without_touching_status() {
    let store = store_with(&["1", "2"]);

    assert_eq!(store.documents().len(), 2);
    assert!(store.active().is_none());
    assert_eq!(store.save_status(), SaveStatus::Saved);
}

#[test]
fn it_sets_active_without_touching_status() {
    let mut store = store_with(&["1", "2"]);
    store.set_save_status(SaveStatus::Error);

    let active = store.set_active(&DocumentId::new("2")).map(|doc| return doc.title.to_string());

    assert_eq!(active, Some("Doc 2".to_string()));
    assert_eq!(store.save_status(), SaveStatus::Error);
}

#[test]
fn it_ignores_unknown_ids_when_activating() {
    let mut store = store_with(&["1"]);

    assert!(store.set_active(&DocumentId::new("9")).is_none());
    assert!(store.active().is_none());
}

#[test]
fn it_mutates_active_and_its_list_entry() {
    let mut store = store_with(&["1", "2"]);
    store.set_active(&DocumentId::new("2"));

    store.mutate_active(&DocumentPatch::title("Hi").with_content(json!({"root": {}})));

    let active = store.active().cloned();
    let entry = store.get(&DocumentId::new("2")).cloned();
    assert_eq!(active, entry);
    assert_eq!(active.map(|doc| return doc.title), Some("Hi".to_string()));
    assert_eq!(store.save_status(), SaveStatus::Unsaved);
}

#[test]
fn it_does_nothing_when_mutating_without_active() {
    let mut store = store_with(&["1"]);

    assert!(store.mutate_active(&DocumentPatch::title("Hi")).is_none());
    assert_eq!(store.save_status(), SaveStatus::Saved);
    assert_eq!(store.documents()[0].title, "Doc 1");
}

#[test]
fn it_inserts_newest_first_and_activates() {
    let mut store = store_with(&["1"]);
    store.insert(persisted("2", "Fresh"));

    assert_eq!(store.documents()[0].title, "Fresh");
    assert_eq!(store.active_id(), Some(&DocumentId::new("2")));
    assert_eq!(store.save_status(), SaveStatus::Saved);
}

#[test]
fn it_adds_fetched_documents_without_activating_them() {
    let mut store = store_with(&["1", "2"]);
    store.set_active(&DocumentId::new("2"));

    store.add(persisted("9", "Fetched"));

    assert_eq!(store.documents()[0].title, "Fetched");
    assert_eq!(store.active_id(), Some(&DocumentId::new("2")));
}

#[test]
fn it_clears_active_when_removing_it() {
    let mut store = store_with(&["1", "2"]);
    store.set_active(&DocumentId::new("1"));
    store.set_save_status(SaveStatus::Unsaved);

    let removed = store.remove(&DocumentId::new("1"));

    assert!(removed.is_some());
    assert!(store.active().is_none());
    assert!(store.get(&DocumentId::new("1")).is_none());
    assert_eq!(store.documents().len(), 1);
    assert_eq!(store.save_status(), SaveStatus::Unsaved);
}

#[test]
fn it_keeps_active_when_removing_an_earlier_entry() {
    let mut store = store_with(&["1", "2", "3"]);
    store.set_active(&DocumentId::new("3"));

    store.remove(&DocumentId::new("1"));

    assert_eq!(store.active_id(), Some(&DocumentId::new("3")));
}

#[test]
fn it_reconciles_active_on_reload() {
    let mut store = store_with(&["1", "2"]);
    store.set_active(&DocumentId::new("2"));

    store.replace_all(vec![persisted("2", "Reloaded"), persisted("3", "New")]);
    assert_eq!(
        store.active().map(|doc| return doc.title.to_string()),
        Some("Reloaded".to_string())
    );

    store.replace_all(vec![persisted("3", "New")]);
    assert!(store.active().is_none());
}
