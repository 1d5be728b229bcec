#[cfg(test)]
#[path = "autosave_test.rs"]
mod tests;

use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;

use crate::domain::models::DocumentId;
use crate::domain::models::Event;

struct PendingFlush {
    id: DocumentId,
    generation: u64,
    timer: JoinHandle<Result<()>>,
}

/// Single debounce timer per session. The target document id is captured
/// when the timer is armed, not read when it fires.
pub struct AutosaveScheduler {
    debounce: Duration,
    generation: u64,
    pending: Option<PendingFlush>,
}

impl AutosaveScheduler {
    pub fn new(debounce: Duration) -> AutosaveScheduler {
        return AutosaveScheduler {
            debounce,
            generation: 0,
            pending: None,
        };
    }

    pub fn is_pending(&self) -> bool {
        return self.pending.is_some();
    }

    pub fn pending_id(&self) -> Option<&DocumentId> {
        return self.pending.as_ref().map(|pending| return &pending.id);
    }

    /// (Re)starts the debounce window for `id`, clearing any pending timer.
    ///
    /// If the pending timer belonged to a different document, that document
    /// is returned and must be flushed right away so its edits are not lost.
    pub fn arm(&mut self, id: DocumentId, tx: &mpsc::UnboundedSender<Event>) -> Option<DocumentId> {
        let displaced = self.cancel().filter(|pending_id| return *pending_id != id);

        self.generation += 1;
        let generation = self.generation;
        let debounce = self.debounce;
        let timer_tx = tx.clone();
        let timer = tokio::spawn(async move {
            time::sleep(debounce).await;
            timer_tx.send(Event::AutosaveElapsed { generation })?;
            return Ok(());
        });

        tracing::debug!(id = %id, generation, "Autosave armed");
        self.pending = Some(PendingFlush {
            id,
            generation,
            timer,
        });

        return displaced;
    }

    /// Consumes the pending timer if `generation` is the current one. Stale
    /// generations come from timers that were cleared after they had already
    /// fired.
    pub fn take_elapsed(&mut self, generation: u64) -> Option<DocumentId> {
        match &self.pending {
            Some(pending) if pending.generation == generation => {
                return self.pending.take().map(|pending| return pending.id);
            }
            _ => {
                tracing::debug!(generation, "Ignoring stale autosave timer");
                return None;
            }
        }
    }

    /// Clears the pending timer, returning the document it was armed for.
    pub fn cancel(&mut self) -> Option<DocumentId> {
        let pending = self.pending.take()?;
        pending.timer.abort();
        return Some(pending.id);
    }

    /// Clears the pending timer only if it targets `id`.
    pub fn cancel_for(&mut self, id: &DocumentId) -> bool {
        if self.pending_id() != Some(id) {
            return false;
        }

        return self.cancel().is_some();
    }
}

impl Drop for AutosaveScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
