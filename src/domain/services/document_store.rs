#[cfg(test)]
#[path = "document_store_test.rs"]
mod tests;

use crate::domain::models::Document;
use crate::domain::models::DocumentId;
use crate::domain::models::DocumentPatch;
use crate::domain::models::SaveStatus;

/// Session state: the known documents, which one is active, and the save
/// status. The active document is tracked as a slot in `documents`, so there
/// is only ever one copy of it to update.
#[derive(Default)]
pub struct DocumentStore {
    documents: Vec<Document>,
    active: Option<usize>,
    save_status: SaveStatus,
}

impl DocumentStore {
    pub fn documents(&self) -> &[Document] {
        return &self.documents;
    }

    pub fn active(&self) -> Option<&Document> {
        return self.active.and_then(|idx| return self.documents.get(idx));
    }

    pub fn active_id(&self) -> Option<&DocumentId> {
        return self.active().and_then(|doc| return doc.id.as_ref());
    }

    pub fn get(&self, id: &DocumentId) -> Option<&Document> {
        return self.documents.iter().find(|doc| return doc.has_id(id));
    }

    pub fn save_status(&self) -> SaveStatus {
        return self.save_status;
    }

    pub fn set_save_status(&mut self, status: SaveStatus) {
        if self.save_status != status {
            tracing::debug!(from = %self.save_status, to = %status, "Save status changed");
        }
        self.save_status = status;
    }

    /// Replaces the known documents wholesale. An active document that is
    /// still present stays active and now refers to the new entry.
    pub fn replace_all(&mut self, documents: Vec<Document>) {
        let active_id = self.active_id().cloned();
        self.documents = documents;
        self.active = active_id.and_then(|id| return self.position(&id));
    }

    /// Switching documents is not an edit, save status is left alone.
    pub fn set_active(&mut self, id: &DocumentId) -> Option<&Document> {
        let idx = self.position(id)?;
        self.active = Some(idx);
        return self.documents.get(idx);
    }

    pub fn clear_active(&mut self) {
        self.active = None;
    }

    /// Merges `patch` into the active document and marks the session unsaved.
    /// Without an active document nothing changes.
    pub fn mutate_active(&mut self, patch: &DocumentPatch) -> Option<&Document> {
        let idx = self.active?;
        let document = self.documents.get_mut(idx)?;
        patch.apply_to(document);
        self.save_status = SaveStatus::Unsaved;

        return self.documents.get(idx);
    }

    /// Prepends a document the caller has already persisted and makes it
    /// active.
    pub fn insert(&mut self, document: Document) -> &Document {
        self.documents.insert(0, document);
        self.active = Some(0);
        return &self.documents[0];
    }

    /// Prepends a fetched document, keeping the active one as it was.
    pub fn add(&mut self, document: Document) {
        self.documents.insert(0, document);
        self.active = self.active.map(|idx| return idx + 1);
    }

    pub fn remove(&mut self, id: &DocumentId) -> Option<Document> {
        let idx = self.position(id)?;
        let removed = self.documents.remove(idx);

        self.active = match self.active {
            Some(active) if active == idx => None,
            Some(active) if active > idx => Some(active - 1),
            other => other,
        };

        return Some(removed);
    }

    fn position(&self, id: &DocumentId) -> Option<usize> {
        return self.documents.iter().position(|doc| return doc.has_id(id));
    }
}
