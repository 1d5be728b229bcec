#[cfg(test)]
#[path = "workspace_test.rs"]
mod tests;

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::AutosaveScheduler;
use super::Conversation;
use super::DocumentStore;
use super::InsertionBridge;
use super::StreamAggregator;
use crate::domain::models::empty_content;
use crate::domain::models::AssistantPrompt;
use crate::domain::models::Document;
use crate::domain::models::DocumentId;
use crate::domain::models::DocumentPatch;
use crate::domain::models::EditorSurface;
use crate::domain::models::Event;
use crate::domain::models::RemoteBox;
use crate::domain::models::SaveStatus;

pub const UNTITLED_PAGE: &str = "Untitled Page";

/// One editing session. Owns the session state and is the only place events
/// from timers, flushes and assistant streams are applied, so every state
/// transition happens between two awaits and never interleaves with another.
pub struct Workspace {
    store: DocumentStore,
    editor: EditorSurface,
    conversation: Conversation,
    autosave: AutosaveScheduler,
    insertions: InsertionBridge,
    remote: RemoteBox,
    tx: mpsc::UnboundedSender<Event>,
    assistant_worker: Option<JoinHandle<Result<()>>>,
    in_flight: usize,
    flush_sequence: u64,
    latest_flush: BTreeMap<DocumentId, u64>,
    failed: BTreeSet<DocumentId>,
}

impl Workspace {
    pub fn new(remote: RemoteBox, debounce: Duration, tx: mpsc::UnboundedSender<Event>) -> Workspace {
        return Workspace {
            store: DocumentStore::default(),
            editor: EditorSurface::empty(),
            conversation: Conversation::default(),
            autosave: AutosaveScheduler::new(debounce),
            insertions: InsertionBridge::default(),
            remote,
            tx,
            assistant_worker: None,
            in_flight: 0,
            flush_sequence: 0,
            latest_flush: BTreeMap::new(),
            failed: BTreeSet::new(),
        };
    }

    pub fn store(&self) -> &DocumentStore {
        return &self.store;
    }

    pub fn editor(&self) -> &EditorSurface {
        return &self.editor;
    }

    pub fn conversation(&self) -> &Conversation {
        return &self.conversation;
    }

    pub fn remote(&self) -> &RemoteBox {
        return &self.remote;
    }

    pub fn save_status(&self) -> SaveStatus {
        return self.store.save_status();
    }

    pub fn queued_insertions(&self) -> usize {
        return self.insertions.len();
    }

    /// Replaces the known documents with the remote list. On failure the list
    /// is emptied and the error returned.
    pub async fn load(&mut self) -> Result<usize> {
        match self.remote.fetch_all().await {
            Ok(documents) => {
                tracing::debug!(count = documents.len(), "Loaded documents");
                self.store.replace_all(documents);
                self.reload_editor();
                return Ok(self.store.documents().len());
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to load documents");
                self.store.replace_all(vec![]);
                self.reload_editor();
                bail!(err);
            }
        }
    }

    /// Creates a document remotely and, once it has an id, makes it active.
    /// Nothing changes locally when the remote call fails.
    pub async fn create_document(&mut self, title: &str) -> Result<DocumentId> {
        let title = if title.trim().is_empty() {
            UNTITLED_PAGE
        } else {
            title.trim()
        };

        let document = match self.remote.create(title, empty_content()).await {
            Ok(document) => document,
            Err(err) => {
                tracing::error!(error = %err, title, "Failed to create document");
                bail!(err);
            }
        };

        let id = match &document.id {
            Some(id) => id.clone(),
            None => bail!("Remote store returned a document without an id"),
        };

        tracing::info!(id = %id, "Created document");
        self.store.insert(document);
        self.reload_editor();
        self.apply_insertions();

        return Ok(id);
    }

    /// Makes `id` the active document, fetching it when it is not in the
    /// known list. Pending autosaves keep targeting the document they were
    /// armed for.
    pub async fn open(&mut self, id: &DocumentId) -> Result<&Document> {
        self.fetch_unknown(id).await?;

        if self.store.set_active(id).is_none() {
            bail!("Document {id} is not known");
        }
        self.reload_editor();
        self.apply_insertions();

        match self.store.active() {
            Some(document) => return Ok(document),
            None => bail!("Document {id} is not known"),
        }
    }

    /// Adds `id` to the known list from the remote when it is not there.
    async fn fetch_unknown(&mut self, id: &DocumentId) -> Result<()> {
        if self.store.get(id).is_some() {
            return Ok(());
        }

        let document = match self.remote.fetch(id).await {
            Ok(document) => document,
            Err(err) => {
                tracing::error!(error = %err, id = %id, "Failed to fetch document");
                bail!(err);
            }
        };
        self.store.add(document);

        return Ok(());
    }

    pub fn close_document(&mut self) {
        self.store.clear_active();
        self.editor = EditorSurface::empty();
    }

    /// Local edit of the active document. Arms the autosave window.
    pub fn edit(&mut self, patch: DocumentPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        if self.store.active().is_none() {
            bail!("No document is open");
        }

        if let Some(content) = &patch.content {
            self.editor = EditorSurface::load_or_empty(content);
        }
        self.store.mutate_active(&patch);
        self.schedule_autosave();

        return Ok(());
    }

    /// Appends a paragraph to the active document as a manual edit.
    pub fn append_paragraph(&mut self, text: &str) -> Result<usize> {
        if self.store.active().is_none() {
            bail!("No document is open");
        }

        let idx = self.editor.append_paragraph(text);
        self.store
            .mutate_active(&DocumentPatch::content(self.editor.snapshot()));
        self.schedule_autosave();

        return Ok(idx);
    }

    /// Deletes a document remotely first, then locally. A document missing
    /// from the known list is fetched first. A pending autosave for it is
    /// dropped. Save status is left alone.
    pub async fn delete_document(&mut self, id: &DocumentId) -> Result<Document> {
        self.fetch_unknown(id).await?;
        if let Err(err) = self.remote.delete(id).await {
            tracing::error!(error = %err, id = %id, "Failed to delete document");
            bail!(err);
        }

        self.autosave.cancel_for(id);
        let was_active = self.store.active_id() == Some(id);
        let removed = match self.store.remove(id) {
            Some(document) => document,
            None => bail!("Document {id} is not known"),
        };
        if was_active {
            self.editor = EditorSurface::empty();
        }

        tracing::info!(id = %id, "Deleted document");
        return Ok(removed);
    }

    /// Flushes the active document without waiting for the window.
    pub fn save_now(&mut self) -> Result<()> {
        let id = match self.store.active_id() {
            Some(id) => id.clone(),
            None => bail!("No saved document is open"),
        };

        self.autosave.cancel_for(&id);
        self.flush(id);

        return Ok(());
    }

    /// Fires the pending autosave, if any, right away.
    pub fn flush_pending(&mut self) {
        if let Some(id) = self.autosave.cancel() {
            self.flush(id);
        }
    }

    fn schedule_autosave(&mut self) {
        let id = match self.store.active_id() {
            Some(id) => id.clone(),
            None => {
                tracing::debug!("Active document has no id, skipping autosave");
                return;
            }
        };

        if let Some(displaced) = self.autosave.arm(id, &self.tx) {
            tracing::debug!(id = %displaced, "Flushing edits of a document switched away from");
            self.flush(displaced);
        }
    }

    /// Sends the full current fields of `id` as they are in the store now.
    /// Each flush is numbered so only the newest one per document decides
    /// whether that document saved.
    fn flush(&mut self, id: DocumentId) {
        let patch = match self.store.get(&id) {
            Some(document) => DocumentPatch::full(document),
            None => {
                tracing::debug!(id = %id, "Document is gone, nothing to flush");
                return;
            }
        };

        if !self.autosave.is_pending() {
            self.store.set_save_status(SaveStatus::Saving);
        }
        self.in_flight += 1;
        self.flush_sequence += 1;
        let sequence = self.flush_sequence;
        self.latest_flush.insert(id.clone(), sequence);

        let remote = self.remote.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = remote.update(&id, &patch).await;
            tx.send(Event::FlushCompleted {
                id,
                sequence,
                result,
            })?;
            return Ok::<(), anyhow::Error>(());
        });
    }

    /// Starts a generation request. The reply is folded by a background
    /// worker and reported back through events.
    pub fn submit_prompt(&mut self, prompt: AssistantPrompt) -> Result<u64> {
        let stream = self.conversation.begin(&prompt)?;

        let remote = self.remote.clone();
        let tx = self.tx.clone();
        let worker = tokio::spawn(async move {
            match remote.generate(prompt).await {
                Ok(source) => return StreamAggregator::default().run(source, stream, &tx).await,
                Err(error) => {
                    tracing::error!(error = %error, stream, "Generation request failed");
                    tx.send(Event::AssistantFailed { stream, error })?;
                    return Ok(());
                }
            }
        });

        if let Some(previous) = self.assistant_worker.replace(worker) {
            previous.abort();
        }

        return Ok(stream);
    }

    /// Abandons the open stream and closes its connection.
    pub fn close_assistant(&mut self) -> bool {
        if !self.conversation.close() {
            return false;
        }

        if let Some(worker) = self.assistant_worker.take() {
            worker.abort();
        }

        tracing::debug!("Closed assistant stream");
        return true;
    }

    pub fn queue_insertion(&mut self, text: &str) -> usize {
        self.insertions.enqueue(text);
        return self.apply_insertions();
    }

    /// Queues the latest finalized assistant answer for insertion.
    pub fn insert_last_response(&mut self) -> Result<usize> {
        let text = match self.conversation.last_insertable() {
            Some(message) => message.text.to_string(),
            None => bail!("There is no assistant answer to insert yet"),
        };

        return Ok(self.queue_insertion(&text));
    }

    fn apply_insertions(&mut self) -> usize {
        let inserted = self.insertions.apply(&mut self.store, &mut self.editor);
        if inserted > 0 {
            self.schedule_autosave();
        }

        return inserted;
    }

    fn reload_editor(&mut self) {
        self.editor = match self.store.active() {
            Some(document) => EditorSurface::load_or_empty(&document.content),
            None => EditorSurface::empty(),
        };
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::AutosaveElapsed { generation } => {
                if let Some(id) = self.autosave.take_elapsed(generation) {
                    self.flush(id);
                }
            }
            Event::FlushCompleted {
                id,
                sequence,
                result,
            } => {
                self.in_flight = self.in_flight.saturating_sub(1);
                if self.latest_flush.get(&id) != Some(&sequence) {
                    tracing::debug!(id = %id, sequence, ok = result.is_ok(), "Ignoring result of a superseded flush");
                    self.settle_save_status();
                    return;
                }

                match result {
                    Ok(()) => {
                        tracing::debug!(id = %id, "Flush completed");
                        self.failed.remove(&id);
                    }
                    Err(err) => {
                        tracing::error!(error = %err, id = %id, "Flush failed");
                        self.failed.insert(id);
                    }
                }
                self.settle_save_status();
            }
            Event::AssistantProgress { stream, message } => {
                self.conversation.handle_progress(stream, message);
            }
            Event::AssistantFinished { stream, message } => {
                if stream == self.conversation.current_stream() {
                    self.assistant_worker = None;
                }
                self.conversation.handle_finished(stream, message);
            }
            Event::AssistantFailed { stream, error } => {
                if stream == self.conversation.current_stream() {
                    self.assistant_worker = None;
                }
                self.conversation.handle_failed(stream, &error);
            }
        }
    }

    // A pending timer means newer edits exist, those keep the session unsaved.
    // Otherwise the outcome covers every flush since the last quiet point,
    // with the newest flush of each document deciding for that document.
    fn settle_save_status(&mut self) {
        if self.autosave.is_pending() {
            return;
        }
        if self.in_flight > 0 {
            self.store.set_save_status(SaveStatus::Saving);
            return;
        }

        if self.failed.is_empty() {
            self.store.set_save_status(SaveStatus::Saved);
        } else {
            self.store.set_save_status(SaveStatus::Error);
        }
        self.failed.clear();
        self.latest_flush.clear();
    }

    /// Nothing is waiting on a timer, a remote update or a stream.
    pub fn is_settled(&self) -> bool {
        return !self.autosave.is_pending() && self.in_flight == 0 && !self.conversation.is_busy();
    }

    /// Applies events until the session is settled.
    pub async fn settle(&mut self, rx: &mut mpsc::UnboundedReceiver<Event>) -> Result<()> {
        while !self.is_settled() {
            match rx.recv().await {
                Some(event) => self.handle_event(event),
                None => bail!("Event channel closed before the session settled"),
            }
        }

        return Ok(());
    }
}
