#[cfg(test)]
#[path = "insertion_test.rs"]
mod tests;

use std::collections::VecDeque;

use super::DocumentStore;
use crate::domain::models::DocumentPatch;
use crate::domain::models::EditorSurface;

/// Handoff from the assistant channel to the document. Finalized text is
/// queued by the producer and drained into the active document by `apply`.
#[derive(Default)]
pub struct InsertionBridge {
    queue: VecDeque<String>,
}

impl InsertionBridge {
    pub fn enqueue(&mut self, text: &str) {
        if text.trim().is_empty() {
            tracing::debug!("Skipping empty insertion");
            return;
        }

        self.queue.push_back(text.to_string());
    }

    pub fn len(&self) -> usize {
        return self.queue.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.queue.is_empty();
    }

    /// Appends every queued text as a new paragraph of the active document,
    /// selecting the last one, and records the result as a single mutation.
    ///
    /// Without an active document the queue is left intact and nothing is
    /// inserted. Returns how many texts were inserted.
    pub fn apply(&mut self, store: &mut DocumentStore, editor: &mut EditorSurface) -> usize {
        if self.queue.is_empty() {
            return 0;
        }
        if store.active().is_none() {
            tracing::warn!(queued = self.queue.len(), "No active document to insert into");
            return 0;
        }

        let mut inserted = 0;
        while let Some(text) = self.queue.pop_front() {
            editor.append_paragraph(&text);
            inserted += 1;
        }

        store.mutate_active(&DocumentPatch::content(editor.snapshot()));
        tracing::debug!(inserted, block = ?editor.selection(), "Inserted assistant text");

        return inserted;
    }
}
