#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time;

use crate::domain::models::AssistantPrompt;
use crate::domain::models::Document;
use crate::domain::models::DocumentId;
use crate::domain::models::DocumentPatch;
use crate::domain::models::RemoteName;
use crate::domain::models::RemoteStore;
use crate::domain::models::SyncError;
use crate::domain::models::SyncResult;
use crate::domain::models::TextSource;

fn now() -> String {
    return chrono::Utc::now().to_rfc3339();
}

fn not_found(id: &DocumentId) -> SyncError {
    return SyncError::remote_status(404, format!("Post {id} not found"));
}

#[derive(Default)]
struct MemoryState {
    next_id: u64,
    documents: Vec<Document>,
    updates: Vec<(DocumentId, DocumentPatch)>,
    prompts: Vec<AssistantPrompt>,
    offline: bool,
    failing_updates: usize,
    update_delays: VecDeque<Duration>,
}

/// Remote store kept in process memory. Backs offline sessions and lets tests
/// script latency, failures and generated replies.
pub struct MemoryRemote {
    state: Mutex<MemoryState>,
    latency: Duration,
    reply: Vec<String>,
    reply_failure: Option<String>,
}

impl Default for MemoryRemote {
    fn default() -> MemoryRemote {
        return MemoryRemote {
            state: Mutex::new(MemoryState::default()),
            latency: Duration::ZERO,
            reply: vec![
                "I'm running without a connection to the writing service, ".to_string(),
                "so this reply is a placeholder.".to_string(),
            ],
            reply_failure: None,
        };
    }
}

/// Scripting hooks for tests.
#[cfg(test)]
impl MemoryRemote {
    /// Delay applied to every call and to every generated chunk.
    pub fn with_latency(mut self, latency: Duration) -> MemoryRemote {
        self.latency = latency;
        return self;
    }

    /// Chunks streamed back by `generate`.
    pub fn with_reply(mut self, chunks: &[&str]) -> MemoryRemote {
        self.reply = chunks.iter().map(|chunk| return chunk.to_string()).collect();
        return self;
    }

    /// Makes the reply stream break off after its last chunk.
    pub fn with_reply_failure(mut self, message: &str) -> MemoryRemote {
        self.reply_failure = Some(message.to_string());
        return self;
    }

    pub async fn set_offline(&self, offline: bool) {
        self.state.lock().await.offline = offline;
    }

    /// The next `count` updates fail.
    pub async fn fail_updates(&self, count: usize) {
        self.state.lock().await.failing_updates = count;
    }

    /// Holds back the next updates by these delays, one per update in the
    /// order they are sent.
    pub async fn delay_updates(&self, delays: &[Duration]) {
        self.state.lock().await.update_delays.extend(delays.iter().copied());
    }

    /// Every update received so far, oldest first.
    pub async fn updates(&self) -> Vec<(DocumentId, DocumentPatch)> {
        return self.state.lock().await.updates.clone();
    }

    pub async fn prompts(&self) -> Vec<AssistantPrompt> {
        return self.state.lock().await.prompts.clone();
    }
}

impl MemoryRemote {
    async fn round_trip(&self) -> SyncResult<()> {
        if !self.latency.is_zero() {
            time::sleep(self.latency).await;
        }

        if self.state.lock().await.offline {
            return Err(SyncError::remote("memory store is offline"));
        }

        return Ok(());
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    fn name(&self) -> RemoteName {
        return RemoteName::Memory;
    }

    #[allow(clippy::implicit_return)]
    async fn health_check(&self) -> SyncResult<()> {
        return self.round_trip().await;
    }

    #[allow(clippy::implicit_return)]
    async fn create(&self, title: &str, content: Value) -> SyncResult<Document> {
        self.round_trip().await?;

        let mut state = self.state.lock().await;
        state.next_id += 1;

        let mut document = Document::new(title, content);
        document.id = Some(DocumentId::new(state.next_id.to_string()));
        document.created_at = Some(now());
        document.updated_at = document.created_at.clone();
        state.documents.insert(0, document.clone());

        tracing::debug!(id = ?document.id, "Memory store created document");
        return Ok(document);
    }

    #[allow(clippy::implicit_return)]
    async fn fetch_all(&self) -> SyncResult<Vec<Document>> {
        self.round_trip().await?;
        return Ok(self.state.lock().await.documents.clone());
    }

    #[allow(clippy::implicit_return)]
    async fn fetch(&self, id: &DocumentId) -> SyncResult<Document> {
        self.round_trip().await?;

        let state = self.state.lock().await;
        return state
            .documents
            .iter()
            .find(|document| return document.has_id(id))
            .cloned()
            .ok_or_else(|| return not_found(id));
    }

    #[allow(clippy::implicit_return)]
    async fn update(&self, id: &DocumentId, patch: &DocumentPatch) -> SyncResult<()> {
        let delay = self.state.lock().await.update_delays.pop_front();
        if let Some(delay) = delay {
            time::sleep(delay).await;
        }
        self.round_trip().await?;

        let mut state = self.state.lock().await;
        state.updates.push((id.clone(), patch.clone()));

        if state.failing_updates > 0 {
            state.failing_updates -= 1;
            return Err(SyncError::remote_status(500, "Internal server error"));
        }

        let document = state
            .documents
            .iter_mut()
            .find(|document| return document.has_id(id))
            .ok_or_else(|| return not_found(id))?;
        patch.apply_to(document);
        document.updated_at = Some(now());

        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn delete(&self, id: &DocumentId) -> SyncResult<()> {
        self.round_trip().await?;

        let mut state = self.state.lock().await;
        let before = state.documents.len();
        state.documents.retain(|document| return !document.has_id(id));
        if state.documents.len() == before {
            return Err(not_found(id));
        }

        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn generate(&self, prompt: AssistantPrompt) -> SyncResult<TextSource> {
        self.round_trip().await?;
        self.state.lock().await.prompts.push(prompt);

        let mut chunks: Vec<SyncResult<Vec<u8>>> = self
            .reply
            .iter()
            .map(|chunk| return Ok(chunk.as_bytes().to_vec()))
            .collect();
        if let Some(message) = &self.reply_failure {
            chunks.push(Err(SyncError::Stream(message.to_string())));
        }

        let latency = self.latency;
        let source = stream::iter(chunks).then(move |chunk| {
            return async move {
                if !latency.is_zero() {
                    time::sleep(latency).await;
                }
                return chunk;
            };
        });

        return Ok(Box::pin(source));
    }
}
